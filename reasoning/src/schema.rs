//! Output schemas for schema-constrained completions.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ReasoningError, Result};

/// A named JSON schema the collaborator's reply must conform to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name, sent to providers that require one.
    pub name: String,

    /// The JSON schema document.
    pub schema: serde_json::Value,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Derive the schema from a Rust type.
    pub fn for_type<T: JsonSchema>(name: impl Into<String>) -> Result<Self> {
        let schema = serde_json::to_value(schemars::schema_for!(T))?;
        Ok(Self::new(name, schema))
    }

    /// Deserialize a structured reply into `T`, reporting mismatches as
    /// [`ReasoningError::SchemaViolation`].
    pub fn decode<T: DeserializeOwned>(&self, value: serde_json::Value) -> Result<T> {
        serde_json::from_value(value).map_err(|e| ReasoningError::SchemaViolation {
            schema: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

/// Strip a surrounding Markdown code fence (```` ```json ... ``` ````) from a
/// model reply, if present.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) on the opening fence line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model reply as a JSON value, tolerating code fences.
pub fn parse_json_reply(schema_name: &str, reply: &str) -> Result<serde_json::Value> {
    serde_json::from_str(strip_code_fences(reply)).map_err(|e| ReasoningError::SchemaViolation {
        schema: schema_name.to_string(),
        reason: format!("reply is not valid JSON: {e}"),
    })
}
