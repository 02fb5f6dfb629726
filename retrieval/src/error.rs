//! Error types for the retrieval engine.

use std::fmt;

use docindex_reasoning::ReasoningError;
use thiserror::Error;

use crate::selection::Selection;

/// Result type alias for a whole query.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors that can occur in a single retrieval phase.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The selection reply was not JSON with a `node_list` of strings.
    #[error("malformed selection response: {reason}")]
    MalformedSelectionResponse { reason: String, reply: String },

    /// A reasoning call failed (network, timeout, quota).
    #[error("reasoning call failed: {0}")]
    ReasoningCall(#[from] ReasoningError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Query phase in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// Phase 1: choosing sections from the outline.
    Selection,
    /// Phase 3: answering from the resolved sections.
    Synthesis,
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPhase::Selection => write!(f, "selection"),
            QueryPhase::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// A failed query, with whatever partial state was reached.
#[derive(Error, Debug)]
#[error("query failed during {phase}: {source}")]
pub struct QueryError {
    pub phase: QueryPhase,

    /// The selection, when the failure came after it.
    pub selection: Option<Selection>,

    #[source]
    pub source: RetrievalError,
}

impl QueryError {
    pub fn selection_failed(source: RetrievalError) -> Self {
        Self {
            phase: QueryPhase::Selection,
            selection: None,
            source,
        }
    }

    pub fn synthesis_failed(selection: Selection, source: RetrievalError) -> Self {
        Self {
            phase: QueryPhase::Synthesis,
            selection: Some(selection),
            source,
        }
    }

    /// True when the failure was a timeout from the reasoning provider.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.source,
            RetrievalError::ReasoningCall(ReasoningError::Timeout)
        )
    }
}
