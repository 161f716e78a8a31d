//! Questions and the generation requests derived from them.

use serde::{Deserialize, Serialize};

/// Row cap used when the caller does not request one
pub const DEFAULT_ROW_CAP: u32 = 10;

/// Largest row cap a caller may request
pub const MAX_ROW_CAP: u32 = 500;

/// A natural-language question about the food catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Free-text question
    pub text: String,

    /// Requested maximum number of rows (clamped to 1..=500)
    #[serde(default)]
    pub requested_row_cap: Option<i64>,
}

impl Question {
    /// Create a question with the default row cap
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            requested_row_cap: None,
        }
    }

    /// Set the requested row cap
    pub fn with_row_cap(mut self, cap: i64) -> Self {
        self.requested_row_cap = Some(cap);
        self
    }

    /// Effective row cap after clamping
    pub fn row_cap(&self) -> u32 {
        clamp_row_cap(self.requested_row_cap)
    }
}

/// Clamp a requested row cap to `1..=MAX_ROW_CAP`, defaulting to `DEFAULT_ROW_CAP`
pub fn clamp_row_cap(requested: Option<i64>) -> u32 {
    match requested {
        None => DEFAULT_ROW_CAP,
        Some(cap) => cap.clamp(1, MAX_ROW_CAP as i64) as u32,
    }
}

/// A fully rendered request for the text generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Prompt text
    pub prompt: String,

    /// Model identifier
    pub model: String,

    /// Row cap embedded in the prompt, if any
    pub row_cap_hint: Option<u32>,
}
