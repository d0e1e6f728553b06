use ai_bus_common::error::{CollaboratorError, CollaboratorResult};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::models::{MessageRecord, Sandbox, User, Workspace};

/// Postgres-backed Persistence Store. The messaging core only ever calls
/// `is_agent_in_workspace`; everything else here serves the HTTP CRUD
/// collaborator that sits in front of the core.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> CollaboratorResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| CollaboratorError::Database(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> CollaboratorResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            CREATE TABLE IF NOT EXISTS workspaces (
                workspace_id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                owner_user_id UUID NOT NULL REFERENCES users(user_id),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            CREATE TABLE IF NOT EXISTS sandboxes (
                sandbox_id UUID PRIMARY KEY,
                workspace_id UUID NOT NULL REFERENCES workspaces(workspace_id),
                agent_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (workspace_id, agent_id)
            );
            CREATE TABLE IF NOT EXISTS message_records (
                message_id TEXT PRIMARY KEY,
                from_sandbox_id UUID NOT NULL REFERENCES sandboxes(sandbox_id),
                to_sandbox_id UUID REFERENCES sandboxes(sandbox_id),
                workspace_id UUID REFERENCES workspaces(workspace_id),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CollaboratorError::Database(e.to_string()))?;
        Ok(())
    }

    // -- users -----------------------------------------------------------

    pub async fn create_user(&self, email: &str, hashed_password: &str) -> CollaboratorResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CollaboratorError::Database(e.to_string()))
    }

    pub async fn get_user_by_email(&self, email: &str) -> CollaboratorResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CollaboratorError::Database(e.to_string()))
    }

    pub async fn get_user(&self, user_id: Uuid) -> CollaboratorResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CollaboratorError::Database(e.to_string()))?
            .ok_or_else(|| CollaboratorError::NotFound(format!("user {user_id}")))
    }

    // -- workspaces --------------------------------------------------------

    pub async fn create_workspace(&self, name: &str, owner_user_id: Uuid) -> CollaboratorResult<Workspace> {
        sqlx::query_as::<_, Workspace>(
            "INSERT INTO workspaces (workspace_id, name, owner_user_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(owner_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CollaboratorError::Database(e.to_string()))
    }

    pub async fn list_workspaces(&self, owner_user_id: Uuid) -> CollaboratorResult<Vec<Workspace>> {
        sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE owner_user_id = $1")
            .bind(owner_user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CollaboratorError::Database(e.to_string()))
    }

    pub async fn get_workspace(&self, workspace_id: Uuid) -> CollaboratorResult<Workspace> {
        sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE workspace_id = $1")
            .bind(workspace_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CollaboratorError::Database(e.to_string()))?
            .ok_or_else(|| CollaboratorError::NotFound(format!("workspace {workspace_id}")))
    }

    // -- sandboxes -----------------------------------------------------------

    pub async fn create_sandbox(&self, workspace_id: Uuid, agent_id: &str) -> CollaboratorResult<Sandbox> {
        sqlx::query_as::<_, Sandbox>(
            "INSERT INTO sandboxes (sandbox_id, workspace_id, agent_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CollaboratorError::Database(e.to_string()))
    }

    pub async fn list_sandboxes(&self, workspace_id: Uuid) -> CollaboratorResult<Vec<Sandbox>> {
        sqlx::query_as::<_, Sandbox>("SELECT * FROM sandboxes WHERE workspace_id = $1")
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CollaboratorError::Database(e.to_string()))
    }

    pub async fn get_sandbox(&self, sandbox_id: Uuid) -> CollaboratorResult<Sandbox> {
        sqlx::query_as::<_, Sandbox>("SELECT * FROM sandboxes WHERE sandbox_id = $1")
            .bind(sandbox_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CollaboratorError::Database(e.to_string()))?
            .ok_or_else(|| CollaboratorError::NotFound(format!("sandbox {sandbox_id}")))
    }

    /// The one contract the messaging core itself consumes (§6): checked by
    /// the HTTP send endpoint before the core accepts a message. The core
    /// never queries this table directly.
    pub async fn is_agent_in_workspace(&self, workspace_id: Uuid, agent_id: &str) -> CollaboratorResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM sandboxes WHERE workspace_id = $1 AND agent_id = $2",
        )
        .bind(workspace_id)
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CollaboratorError::Database(e.to_string()))?;
        Ok(row.is_some())
    }

    // -- audit log -----------------------------------------------------------

    pub async fn record_message(
        &self,
        message_id: &str,
        from_sandbox_id: Uuid,
        to_sandbox_id: Option<Uuid>,
        workspace_id: Option<Uuid>,
    ) -> CollaboratorResult<MessageRecord> {
        sqlx::query_as::<_, MessageRecord>(
            "INSERT INTO message_records (message_id, from_sandbox_id, to_sandbox_id, workspace_id)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(message_id)
        .bind(from_sandbox_id)
        .bind(to_sandbox_id)
        .bind(workspace_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CollaboratorError::Database(e.to_string()))
    }

    pub async fn list_messages_for_sandbox(
        &self,
        sandbox_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> CollaboratorResult<Vec<MessageRecord>> {
        sqlx::query_as::<_, MessageRecord>(
            "SELECT * FROM message_records
             WHERE from_sandbox_id = $1 OR to_sandbox_id = $1
             ORDER BY created_at DESC OFFSET $2 LIMIT $3",
        )
        .bind(sandbox_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CollaboratorError::Database(e.to_string()))
    }
}
