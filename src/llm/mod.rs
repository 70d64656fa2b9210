//! LLM completion: provider seam and the fail-soft response generator

mod generator;
mod openai;

use async_trait::async_trait;

pub use generator::{
    DEGRADED_PREFIX, MAX_TOKENS, ResponseGenerator, SYSTEM_INSTRUCTION, TEMPERATURE,
};
pub use openai::OpenAiCompatClient;

use crate::Result;

/// A single completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// External text completion capability
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `request.prompt` under `request.system`
    ///
    /// # Errors
    ///
    /// Returns error on network, auth, quota or malformed-response failures
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}
