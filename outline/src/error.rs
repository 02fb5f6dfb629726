//! Error types for document tree construction.

use docindex_reasoning::ReasoningError;
use thiserror::Error;

use crate::builder::BuildStrategy;

/// Result type alias for outline operations.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors that can occur while extracting, building, or loading a tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The structural strategy found no heading markers.
    #[error("{strategy} strategy: no heading markers detected in the document")]
    NoStructureDetected { strategy: BuildStrategy },

    /// The reasoning collaborator returned a tree that does not fit the schema.
    #[error("{strategy} strategy: response violates the tree schema: {reason}")]
    SchemaViolation {
        strategy: BuildStrategy,
        reason: String,
    },

    /// A reasoning call failed (network, timeout, quota).
    #[error("{strategy} strategy: reasoning call failed: {source}")]
    ReasoningCall {
        strategy: BuildStrategy,
        #[source]
        source: ReasoningError,
    },

    /// The strategy needs a reasoning provider and none was supplied.
    #[error("{strategy} strategy requires a reasoning provider")]
    ProviderRequired { strategy: BuildStrategy },

    /// A tree failed structural validation.
    #[error("invalid tree: {0}")]
    InvalidTree(String),

    /// The input file format is not recognized.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The input file could not be decoded.
    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TreeError {
    /// Wrap a reasoning failure for `strategy`, keeping schema violations
    /// distinct from transport failures.
    pub fn from_reasoning(strategy: BuildStrategy, err: ReasoningError) -> Self {
        match err {
            ReasoningError::SchemaViolation { reason, .. } => {
                TreeError::SchemaViolation { strategy, reason }
            }
            source => TreeError::ReasoningCall { strategy, source },
        }
    }
}
