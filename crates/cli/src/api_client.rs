use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client for the collaboration bus's HTTP surface. Mirrors the wire shapes
/// in `ai-bus-api::types` without depending on that crate, the same way the
/// original client duplicated its server's request/response shapes.
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SendMessageRequest {
    workspace_id: String,
    to_agent: String,
    content: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    priority: i32,
}

#[derive(Deserialize)]
pub struct SendMessageResponse {
    pub message_id: String,
}

#[derive(Deserialize)]
pub struct ProbeResult {
    pub name: String,
    pub status: String,
    pub latency_ms: u64,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub probes: Vec<ProbeResult>,
    pub sample_count: usize,
}

#[derive(Deserialize)]
pub struct QueueSize {
    pub pending: u64,
    pub processing: u64,
    pub dead_letter: u64,
    pub total: u64,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let response = self.client.get(format!("{}/health", self.base_url)).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn publish(
        &self,
        workspace_id: &str,
        to_agent: &str,
        content: Value,
        kind: Option<String>,
        mode: Option<String>,
        priority: i32,
    ) -> Result<SendMessageResponse> {
        let request = SendMessageRequest {
            workspace_id: workspace_id.to_string(),
            to_agent: to_agent.to_string(),
            content,
            kind,
            mode,
            priority,
        };
        let response = self.client.post(format!("{}/api/v1/messages/send", self.base_url)).json(&request).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("publish failed: {} {}", response.status(), response.text().await.unwrap_or_default());
        }
        Ok(response.json().await?)
    }

    pub async fn queue_stats(&self, agent_id: &str) -> Result<QueueSize> {
        let response = self.client.get(format!("{}/api/v1/queues/{}/stats", self.base_url, agent_id)).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }

    /// Builds the `/ws/connect` URL this client's `base_url` points at, for
    /// `tail` to hand to a WebSocket connector.
    pub fn ws_url(&self, workspace_id: &str, agent_id: &str) -> String {
        let ws_base = self.base_url.replacen("http://", "ws://", 1).replacen("https://", "wss://", 1);
        format!("{ws_base}/ws/connect?workspace_id={workspace_id}&agent_id={agent_id}")
    }
}
