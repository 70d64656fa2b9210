//! Fail-soft response generation
//!
//! Provider failures become a speakable apology instead of an error, so the
//! voice and web paths always have text to deliver.

use std::sync::Arc;

use super::{CompletionProvider, CompletionRequest};

/// System instruction sent with every completion
pub const SYSTEM_INSTRUCTION: &str = "You are a friendly and helpful voice assistant. \
Provide clear, accurate and conversational answers suitable for speech. \
Keep responses concise, under 100 words. If you don't know something, say so honestly.";

/// Sampling temperature
pub const TEMPERATURE: f32 = 0.7;

/// Generation length cap
pub const MAX_TOKENS: u32 = 1000;

/// Prefix of every degraded response
pub const DEGRADED_PREFIX: &str = "I apologize, but I encountered an error";

/// Wraps a completion provider with fixed instruction and sampling parameters
#[derive(Clone)]
pub struct ResponseGenerator {
    provider: Arc<dyn CompletionProvider>,
}

impl ResponseGenerator {
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Generate a reply for `prompt`
    ///
    /// Calls the provider exactly once. Never fails: any provider error is
    /// turned into a degraded reply starting with [`DEGRADED_PREFIX`].
    pub async fn generate(&self, prompt: &str) -> String {
        let request = CompletionRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt: prompt.to_string(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        match self.provider.complete(&request).await {
            Ok(text) => {
                tracing::debug!(
                    provider = self.provider.name(),
                    response_len = text.len(),
                    "generated response"
                );
                text
            }
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "completion failed");
                format!("{DEGRADED_PREFIX}: {e}")
            }
        }
    }
}
