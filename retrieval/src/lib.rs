//! # Retrieval Engine
//!
//! Answers questions about a document by reasoning over its outline instead
//! of searching embeddings.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Retrieval Engine                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  question + outline (no text)                                   │
//! │          │                                                      │
//! │          ▼                                                      │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Selection   │──►│  Resolution  │──►│  Synthesis   │──► answer│
//! │  │ (provider)   │   │ (NodeIndex)  │   │ (provider)   │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docindex_retrieval::{RetrievalConfig, RetrievalEngine};
//!
//! let engine = RetrievalEngine::new(index, provider, RetrievalConfig::default());
//! let outcome = engine.query("When are invoices due?").await?;
//! println!("{} (from {:?})", outcome.answer, outcome.resolved);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod prompt;
pub mod selection;

pub use config::RetrievalConfig;
pub use engine::{QueryOutcome, Resolution, ResolvedSection, RetrievalEngine, query};
pub use error::{QueryError, QueryPhase, Result, RetrievalError};
pub use selection::Selection;
