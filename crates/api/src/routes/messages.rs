use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::instrument;

use ai_bus_common::types::{DeliveryMode, Message};

use crate::server::AppState;
use crate::types::{ErrorResponse, SendMessageRequest, SendMessageResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/send", post(send_message))
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Authenticated HTTP path into the core, mirroring what a WebSocket
/// `send` frame does but gated by the Persistence Store's workspace
/// membership check (the one call the core relies on an external
/// collaborator for, per §6).
#[utoipa::path(
    post,
    path = "/api/v1/messages/send",
    request_body = SendMessageRequest,
    responses((status = 200, body = SendMessageResponse), (status = 403, body = ErrorResponse)),
    tag = "messages"
)]
#[instrument(skip(state, req))]
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let authorized = state
        .store
        .is_agent_in_workspace(req.workspace_id, &req.to_agent)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(e.to_string(), "INTERNAL"))))?;
    if !authorized {
        return Err(forbidden("recipient is not a member of that workspace"));
    }

    let mut message = Message::new("http-client", req.content, req.kind.unwrap_or_default(), req.mode.unwrap_or(DeliveryMode::Both));
    message.priority = req.priority;
    let message_id = state
        .router
        .send_direct(&req.to_agent, message)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(e.to_string(), "INTERNAL"))))?;

    Ok(Json(SendMessageResponse { message_id: message_id.0 }))
}

fn forbidden(message: impl Into<String>) -> ApiError {
    (StatusCode::FORBIDDEN, Json(ErrorResponse::new(message, "FORBIDDEN")))
}
