//! Phase-1 selection result.

use docindex_reasoning::strip_code_fences;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// Sections chosen for a question, with the rationale behind the choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Free-text rationale. Logged, never interpreted.
    #[serde(default)]
    pub thinking: String,

    /// Node identifiers in the order they should be consulted.
    pub node_list: Vec<String>,
}

impl Selection {
    /// Parse a selection reply. Code fences around the JSON are tolerated;
    /// anything else that is not `{thinking?, node_list: [string]}` is
    /// rejected.
    pub fn parse(reply: &str) -> Result<Self, RetrievalError> {
        serde_json::from_str(strip_code_fences(reply)).map_err(|e| {
            RetrievalError::MalformedSelectionResponse {
                reason: e.to_string(),
                reply: reply.to_string(),
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.node_list.is_empty()
    }
}
