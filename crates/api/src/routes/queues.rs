//! Read-only introspection over per-agent inbox queues, used by the admin
//! CLI's `queue-stats` subcommand.

use axum::{extract::{Path, State}, http::StatusCode, routing::get, Json, Router};
use tracing::instrument;

use ai_bus_common::types::QueueSize;

use crate::server::AppState;
use crate::types::ErrorResponse;

pub fn router() -> Router<AppState> {
    Router::new().route("/:agent_id/stats", get(queue_stats))
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[utoipa::path(
    get,
    path = "/api/v1/queues/{agent_id}/stats",
    responses((status = 200, body = QueueSize)),
    tag = "queues"
)]
#[instrument(skip(state))]
pub async fn queue_stats(State(state): State<AppState>, Path(agent_id): Path<String>) -> Result<Json<QueueSize>, ApiError> {
    let size = state
        .router
        .queue_size(&agent_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(e.to_string(), "INTERNAL"))))?;
    Ok(Json(size))
}
