use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::server::AppState;
use crate::types::{CreateSandboxRequest, ErrorResponse, SandboxResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:workspace_id/sandboxes", post(create_sandbox).get(list_sandboxes))
        .route("/:workspace_id/sandboxes/:sandbox_id", get(get_sandbox))
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[utoipa::path(
    post,
    path = "/api/v1/workspaces/{workspace_id}/sandboxes",
    request_body = CreateSandboxRequest,
    responses((status = 200, body = SandboxResponse)),
    tag = "sandboxes"
)]
#[instrument(skip(state))]
pub async fn create_sandbox(
    State(state): State<AppState>,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<CreateSandboxRequest>,
) -> Result<Json<SandboxResponse>, ApiError> {
    let sandbox = state
        .store
        .create_sandbox(workspace_id, &req.agent_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(into_response(sandbox)))
}

#[utoipa::path(
    get,
    path = "/api/v1/workspaces/{workspace_id}/sandboxes",
    responses((status = 200, body = [SandboxResponse])),
    tag = "sandboxes"
)]
#[instrument(skip(state))]
pub async fn list_sandboxes(State(state): State<AppState>, Path(workspace_id): Path<Uuid>) -> Result<Json<Vec<SandboxResponse>>, ApiError> {
    let sandboxes = state.store.list_sandboxes(workspace_id).await.map_err(internal_error)?;
    Ok(Json(sandboxes.into_iter().map(into_response).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/workspaces/{workspace_id}/sandboxes/{sandbox_id}",
    responses((status = 200, body = SandboxResponse), (status = 404, body = ErrorResponse)),
    tag = "sandboxes"
)]
#[instrument(skip(state))]
pub async fn get_sandbox(State(state): State<AppState>, Path((_workspace_id, sandbox_id)): Path<(Uuid, Uuid)>) -> Result<Json<SandboxResponse>, ApiError> {
    let sandbox = state
        .store
        .get_sandbox(sandbox_id)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorResponse::new(e.to_string(), "NOT_FOUND"))))?;
    Ok(Json(into_response(sandbox)))
}

fn into_response(sandbox: ai_bus_storage::models::Sandbox) -> SandboxResponse {
    SandboxResponse {
        sandbox_id: sandbox.sandbox_id,
        workspace_id: sandbox.workspace_id,
        agent_id: sandbox.agent_id,
    }
}

fn internal_error(err: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(err.to_string(), "INTERNAL")))
}
