//! Agent-SDK abstraction over two LLM vendors.
//!
//! Models the shape the distilled spec names without making any LLM calls:
//! that would cross into agent reasoning, an explicit non-goal of the
//! messaging core. Nothing in `ai-bus-message-bus` or `ai-bus-api` invokes
//! these clients; they exist so the workspace carries the collaborator the
//! spec describes, not to be exercised by the core.

pub mod anthropic;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AgentClient: Send + Sync {
    fn vendor(&self) -> &'static str;
    async fn send_completion(&self, prompt: &str) -> Result<String>;
}

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
