//! Adapter interfaces for external systems.
//!
//! Adapters provide a unified interface for interacting with external
//! text-generation services like Gemini.

pub mod gemini;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::GenerationRequest;

// Re-export the Gemini adapter
pub use gemini::GeminiClient;

/// Output from a generation call
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    /// The text returned by the generator
    pub content: String,

    /// Tokens used (if available)
    pub tokens_used: Option<u64>,
}

impl GenerationOutput {
    /// Create a new output with just content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens_used: None,
        }
    }
}

/// Trait for external text generators
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable generator name
    fn name(&self) -> &str;

    /// Generate text for a request.
    ///
    /// `deadline` must be applied to the underlying network call so the
    /// request is aborted, not just abandoned, when it runs out.
    async fn generate(
        &self,
        request: &GenerationRequest,
        deadline: Duration,
    ) -> Result<GenerationOutput>;
}

/// Whether an adapter error was caused by a transport timeout
pub fn is_timeout(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .map(|e| e.is_timeout())
            .unwrap_or(false)
    })
}
