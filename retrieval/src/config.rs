//! Configuration for the retrieval engine.

use serde::{Deserialize, Serialize};

/// Configuration for question answering over a document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Model override for both phases. `None` uses the provider default.
    pub model: Option<String>,

    /// Sampling temperature for section selection. `None` uses the
    /// provider's default sampling.
    pub selection_temperature: Option<f32>,

    /// Sampling temperature for answer synthesis.
    pub answer_temperature: f32,

    /// How much of the selection rationale to include in log lines.
    pub thinking_log_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            model: None,
            selection_temperature: None,
            answer_temperature: 0.0,
            thinking_log_chars: 200,
        }
    }
}

impl RetrievalConfig {
    /// Set the model for both phases.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the selection temperature.
    pub fn with_selection_temperature(mut self, temperature: f32) -> Self {
        self.selection_temperature = Some(temperature);
        self
    }

    /// Set the answer temperature.
    pub fn with_answer_temperature(mut self, temperature: f32) -> Self {
        self.answer_temperature = temperature;
        self
    }
}
