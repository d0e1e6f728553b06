use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Process-scoped identifier for a live session, assigned at accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique message identifier, server-assigned if the client omits one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> Self {
        Self(format!("msg_{}", Uuid::new_v4().simple()))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session connection state machine: connecting -> connected -> disconnecting -> disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// How a message should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Pubsub,
    Queue,
    Both,
}

/// The purpose of a message, mirrored from the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Request,
    Response,
    Notification,
    Command,
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Notification
    }
}

/// Opaque JSON-shaped bag used for `content` and `metadata`. The core never
/// inspects these beyond copying them through the pipeline.
pub type Payload = Value;

/// The Router's view of a message moving through the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub from_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    pub content: Payload,
    pub kind: MessageKind,
    pub mode: DeliveryMode,
    #[serde(default)]
    pub priority: i32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Message {
    pub fn new(
        from_agent: impl Into<String>,
        content: Payload,
        kind: MessageKind,
        mode: DeliveryMode,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            from_agent: from_agent.into(),
            to_agent: None,
            workspace_id: None,
            content,
            kind,
            mode,
            priority: 0,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

/// A `Message` wrapped with durable-queue bookkeeping. Stored serialized in
/// the broker's priority queue and, while in flight, in its processing hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub queue_name: String,
    pub payload: Message,
    pub message_id: MessageId,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

fn default_max_attempts() -> u32 {
    3
}

impl QueuedMessage {
    pub fn new(queue_name: impl Into<String>, payload: Message, max_attempts: u32) -> Self {
        let message_id = payload.message_id.clone();
        let priority = payload.priority;
        Self {
            queue_name: queue_name.into(),
            payload,
            message_id,
            priority,
            attempts: 0,
            max_attempts,
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

/// Framed envelope published/received over the pub-sub broker channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub payload: Message,
    pub timestamp: f64,
    pub message_id: MessageId,
}

impl Envelope {
    pub fn wrap(topic: impl Into<String>, payload: Message) -> Self {
        let message_id = payload.message_id.clone();
        Self {
            topic: topic.into(),
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
            payload,
            message_id,
        }
    }
}

/// Aggregate size of a named queue, per §4.3 introspection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QueueSize {
    pub pending: u64,
    pub processing: u64,
    pub dead_letter: u64,
    pub total: u64,
}

pub const AGENT_TOPIC_PREFIX: &str = "agent:";
pub const WORKSPACE_TOPIC_PREFIX: &str = "workspace:";

pub fn agent_topic(agent_id: &str) -> String {
    format!("{AGENT_TOPIC_PREFIX}{agent_id}")
}

pub fn agent_inbox_queue(agent_id: &str) -> String {
    format!("{AGENT_TOPIC_PREFIX}{agent_id}:inbox")
}

pub fn workspace_topic(workspace_id: &str) -> String {
    format!("{WORKSPACE_TOPIC_PREFIX}{workspace_id}")
}
