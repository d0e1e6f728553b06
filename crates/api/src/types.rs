//! Wire-level request/response types for the HTTP and WebSocket surfaces.

use ai_bus_common::types::{DeliveryMode, MessageId, MessageKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Error body returned by every non-2xx HTTP response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: Some(code.to_string()),
            timestamp: Utc::now(),
        }
    }
}

// -- auth --------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
}

// -- workspaces / sandboxes ---------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateWorkspaceRequest {
    pub name: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct WorkspaceResponse {
    pub workspace_id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateSandboxRequest {
    pub agent_id: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SandboxResponse {
    pub sandbox_id: Uuid,
    pub workspace_id: Uuid,
    pub agent_id: String,
}

// -- messages -------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SendMessageRequest {
    pub workspace_id: Uuid,
    pub to_agent: String,
    pub content: Value,
    #[serde(default)]
    pub kind: Option<MessageKind>,
    #[serde(default)]
    pub mode: Option<DeliveryMode>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SendMessageResponse {
    pub message_id: String,
}

/// Query-string params on `GET /ws/connect`.
#[derive(Debug, Deserialize)]
pub struct WsConnectQuery {
    pub user_id: Option<String>,
    pub workspace_id: Option<String>,
    pub agent_id: Option<String>,
}

/// Frame shape sent by a client over the WebSocket connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe {
        topics: Vec<String>,
    },
    Unsubscribe {
        topics: Option<Vec<String>>,
    },
    Send {
        to_agent: String,
        content: Value,
        #[serde(default)]
        message_type: Option<MessageKind>,
        #[serde(default)]
        priority: i32,
    },
    Broadcast {
        workspace_id: Option<String>,
        content: Value,
        #[serde(default)]
        exclude_agent: Option<String>,
    },
    Pong,
}

/// Frame shape the server pushes to a connected client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Connected { connection_id: String, timestamp: f64 },
    Subscribed { topics: Vec<String> },
    Unsubscribed { topics: Vec<String> },
    Sent { message_id: MessageId },
    Broadcast { workspace_id: String, recipient_count: usize },
    Message { data: Value, queued: bool },
    Ping { timestamp: f64 },
    Error { message: String },
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ConnectionSummary {
    pub connection_id: String,
    pub user_id: Option<String>,
    pub workspace_id: Option<String>,
    pub agent_id: Option<String>,
    pub subscriptions: Vec<String>,
    pub connected_at: f64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ConnectionStats {
    pub connection_count: usize,
}
