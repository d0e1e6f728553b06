use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workspace {
    pub workspace_id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sandbox {
    pub sandbox_id: Uuid,
    pub workspace_id: Uuid,
    pub agent_id: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit row written after the core accepts a `send`/`broadcast`.
/// Distinct from the in-flight `QueuedMessage` the core itself moves through
/// the broker; this is history, not delivery state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageRecord {
    pub message_id: String,
    pub from_sandbox_id: Uuid,
    pub to_sandbox_id: Option<Uuid>,
    pub workspace_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
