//! # Document Outline
//!
//! Turns long, loosely structured documents into navigable trees of sections.
//!
//! - **Heading Normalization**: promote bold title lines to real headings
//! - **Tree Construction**: structural (heading-driven) or reasoning-driven
//! - **Node Index**: identifier lookup over a finished tree
//! - **Persistence**: canonical nested JSON with backups
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Document Outline                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  extract_text ──► HeadingNormalizer ──► TreeBuilder             │
//! │                                            │                    │
//! │                         ┌──────────────────┴──────────┐         │
//! │                         ▼                             ▼         │
//! │              StructuralTreeBuilder        ReasoningTreeBuilder  │
//! │                         └──────────────┬──────────────┘         │
//! │                                        ▼                        │
//! │                     DocumentTree ──► NodeIndex                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every section owns only its own text: concatenating section texts in
//! pre-order gives back the document.

pub mod builder;
pub mod error;
pub mod extraction;
pub mod index;
mod markdown;
pub mod normalize;
pub mod record;
pub mod storage;
pub mod summary;
pub mod tree;

pub use builder::{
    BuildOptions, BuildStrategy, ReasoningTreeBuilder, StructuralTreeBuilder, TreeBuilder,
    build_tree,
};
pub use error::{Result, TreeError};
pub use extraction::{SourceFormat, doc_name_from_path, extract_text};
pub use index::{NodeIndex, index};
pub use normalize::{HeadingNormalizer, Normalized, NormalizerConfig, normalize_headings};
pub use record::{SectionRecord, TreeRecord};
pub use storage::{TreeStore, read_tree, write_tree};
pub use summary::Summarizer;
pub use tree::{DocumentTree, MAX_DEPTH, NodeRef, SectionNode};
