use anyhow::Result;
use serde_json::Value;

use crate::api_client::ApiClient;

/// One-shot publish of a single message, the `ai-bus publish` subcommand.
pub async fn publish(
    server_url: &str,
    workspace_id: &str,
    to_agent: &str,
    content: &str,
    kind: Option<String>,
    mode: Option<String>,
    priority: i32,
) -> Result<()> {
    let content: Value = serde_json::from_str(content).unwrap_or_else(|_| Value::String(content.to_string()));
    let client = ApiClient::new(server_url);
    let response = client.publish(workspace_id, to_agent, content, kind, mode, priority).await?;
    println!("published {}", response.message_id);
    Ok(())
}
