pub mod factory;
pub mod openai;

pub use factory::create_provider;
pub use openai::OpenAIProvider;

use async_trait::async_trait;
use serde_json::Value;
use vendabot_core::types::{ChatMessage, LLMResponse};
use vendabot_core::Result;

/// A chat-completions backend. Implementations translate the shared message
/// and tool shapes into their provider's wire format.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<LLMResponse>;
}
