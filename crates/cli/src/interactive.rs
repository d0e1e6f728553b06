use anyhow::{Context, Result};
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::api_client::ApiClient;

/// Connects to `/ws/connect` as `agent_id` and prints every frame the bus
/// delivers, the `ai-bus tail` subcommand. Ctrl-C (or a server-side close)
/// ends the session.
pub async fn tail(server_url: &str, workspace_id: &str, agent_id: &str) -> Result<()> {
    let client = ApiClient::new(server_url);
    let url = client.ws_url(workspace_id, agent_id);

    println!("tailing {agent_id} in workspace {workspace_id} ({url})");
    let (socket, _) = tokio_tungstenite::connect_async(&url).await.context("failed to connect to bus")?;
    let (_write, mut read) = socket.split();

    while let Some(message) = read.next().await {
        match message? {
            WsMessage::Text(text) => println!("{text}"),
            WsMessage::Close(_) => break,
            _ => continue,
        }
    }

    println!("connection closed");
    Ok(())
}
