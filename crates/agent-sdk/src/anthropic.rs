use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AgentClient;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    text: String,
}

pub struct AnthropicClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AgentClient for AnthropicClient {
    fn vendor(&self) -> &'static str {
        "anthropic"
    }

    async fn send_completion(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            max_tokens: 1024,
            messages: vec![RequestMessage { role: "user", content: prompt }],
        };

        let response = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .context("anthropic request failed")?;

        if !response.status().is_success() {
            bail!("anthropic returned status {}", response.status());
        }

        let body: CompletionResponse = response.json().await.context("invalid anthropic response")?;
        Ok(body.content.into_iter().map(|b| b.text).collect::<Vec<_>>().join(""))
    }
}
