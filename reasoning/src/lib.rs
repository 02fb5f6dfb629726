//! # Reasoning
//!
//! The boundary to the language model that builds document trees and
//! answers questions over them.
//!
//! ## Features
//!
//! - **Free-text completion**: ordered chat messages in, text out
//! - **Schema-constrained completion**: a JSON value checked against an [`OutputSchema`]
//! - **Multiple Providers**: any OpenAI-compatible endpoint, or scripted replies
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Reasoning Boundary                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CompletionRequest ──► ReasoningProvider ──► CompletionResponse │
//! │                              │                                  │
//! │                              ▼                                  │
//! │                OpenAIProvider / ScriptedProvider                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod schema;
pub mod scripted;

pub use error::{ReasoningError, Result};
pub use provider::{
    AuthStyle, ChatMessage, CompletionRequest, CompletionResponse, OpenAIProvider,
    ReasoningProvider, Role,
};
pub use schema::{OutputSchema, parse_json_reply, strip_code_fences};
pub use scripted::{ScriptedProvider, ScriptedReply};
