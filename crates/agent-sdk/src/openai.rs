use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AgentClient;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct OpenAiClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AgentClient for OpenAiClient {
    fn vendor(&self) -> &'static str {
        "openai"
    }

    async fn send_completion(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![RequestMessage { role: "user", content: prompt }],
        };

        let response = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("openai request failed")?;

        if !response.status().is_success() {
            bail!("openai returned status {}", response.status());
        }

        let mut body: CompletionResponse = response.json().await.context("invalid openai response")?;
        body.choices
            .pop()
            .map(|c| c.message.content)
            .context("openai returned no choices")
    }
}
