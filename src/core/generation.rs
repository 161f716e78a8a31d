//! Deadline-bounded text generation.
//!
//! The generator future is raced against the deadline. On expiry it is
//! dropped, which aborts the in-flight HTTP request; the deadline is also
//! handed to the adapter so the request carries its own timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use super::error::AskError;
use crate::adapters::{self, TextGenerator};
use crate::domain::GenerationRequest;

/// Default generation deadline
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Generator wrapped with a hard wall-clock deadline
#[derive(Clone)]
pub struct GenerationClient {
    generator: Arc<dyn TextGenerator>,
    deadline: Duration,
}

impl GenerationClient {
    pub fn new(generator: Arc<dyn TextGenerator>, deadline: Duration) -> Self {
        Self {
            generator,
            deadline,
        }
    }

    /// The configured deadline
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Name of the underlying generator
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Raw generator text, or `Generation` / `Timeout`
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, AskError> {
        let call = self.generator.generate(request, self.deadline);

        match timeout(self.deadline, call).await {
            Ok(Ok(output)) => {
                debug!(
                    generator = self.generator.name(),
                    tokens_used = ?output.tokens_used,
                    raw = %output.content,
                    "Generator answered"
                );
                Ok(output.content)
            }
            Ok(Err(e)) if adapters::is_timeout(&e) => {
                warn!(generator = self.generator.name(), "Generator request timed out");
                Err(AskError::Timeout(self.deadline))
            }
            Ok(Err(e)) => {
                warn!(generator = self.generator.name(), error = %e, "Generator failed");
                Err(AskError::Generation(format!("{:#}", e)))
            }
            Err(_) => {
                warn!(
                    generator = self.generator.name(),
                    deadline = ?self.deadline,
                    "Generation deadline elapsed"
                );
                Err(AskError::Timeout(self.deadline))
            }
        }
    }
}
