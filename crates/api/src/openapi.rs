//! OpenAPI Specification Configuration
//!
//! This module defines the OpenAPI specification for the collaboration bus's
//! HTTP and WebSocket surface. The specification is generated from Rust types
//! and route handlers using utoipa.

use utoipa::OpenApi;

use crate::types::*;

/// OpenAPI specification for the collaboration bus API
#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "AI Agent Collaboration Bus API",
        description = "
# Collaboration Bus API

Backend rendezvous service for externally-hosted AI agents. Agents join
named workspaces and exchange structured messages over persistent
WebSocket sessions, backed by a pub-sub-plus-durable-queue core.

## WebSocket protocol

Connect to `/ws/connect` with `user_id` / `workspace_id` / `agent_id`
query parameters. Client frames: `subscribe`, `unsubscribe`, `send`,
`broadcast`, `pong`. Server frames: `connected`, `subscribed`,
`unsubscribed`, `sent`, `broadcast`, `message`, `ping`, `error`.

## HTTP surface

- `/api/v1/auth/{register,login,refresh}` — JWT issuance
- `/api/v1/workspaces` — workspace CRUD
- `/api/v1/workspaces/{id}/sandboxes` — sandbox (agent membership) CRUD
- `/api/v1/messages/send` — authenticated one-shot send into the core
- `/api/v1/queues/{agent_id}/stats` — durable queue introspection

## Error handling

Non-2xx responses return an `ErrorResponse` body with a stable `code`
field suitable for client-side dispatch.
        ",
        version = "1.0.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    paths(
        crate::routes::ws::health_check,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::refresh,
        crate::routes::workspaces::create_workspace,
        crate::routes::workspaces::list_workspaces,
        crate::routes::workspaces::get_workspace,
        crate::routes::sandboxes::create_sandbox,
        crate::routes::sandboxes::list_sandboxes,
        crate::routes::sandboxes::get_sandbox,
        crate::routes::messages::send_message,
        crate::routes::queues::queue_stats
    ),
    components(schemas(
        ai_bus_message_bus::HealthReport,
        ai_bus_message_bus::health::ProbeResult,
        ai_bus_message_bus::health::HealthStatus,
        ErrorResponse,
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        UserResponse,
        CreateWorkspaceRequest,
        WorkspaceResponse,
        CreateSandboxRequest,
        SandboxResponse,
        SendMessageRequest,
        SendMessageResponse,
        ConnectionSummary,
        ConnectionStats,
        ai_bus_auth::Token,
        ai_bus_common::types::MessageKind,
        ai_bus_common::types::DeliveryMode,
        ai_bus_common::types::QueueSize
    )),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "auth", description = "Registration, login, token refresh"),
        (name = "workspaces", description = "Workspace CRUD"),
        (name = "sandboxes", description = "Sandbox (agent membership) CRUD"),
        (name = "messages", description = "Authenticated HTTP send path into the core"),
        (name = "queues", description = "Durable queue introspection")
    )
)]
pub struct ApiDoc;
