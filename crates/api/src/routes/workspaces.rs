use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthenticatedUser;
use crate::server::AppState;
use crate::types::{CreateWorkspaceRequest, ErrorResponse, WorkspaceResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_workspace).get(list_workspaces))
        .route("/:workspace_id", get(get_workspace))
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[utoipa::path(
    post,
    path = "/api/v1/workspaces",
    request_body = CreateWorkspaceRequest,
    responses((status = 200, body = WorkspaceResponse)),
    tag = "workspaces"
)]
#[instrument(skip(state))]
pub async fn create_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<Json<WorkspaceResponse>, ApiError> {
    let owner_user_id = parse_uuid(&user.0)?;
    let workspace = state
        .store
        .create_workspace(&req.name, owner_user_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(into_response(workspace)))
}

#[utoipa::path(get, path = "/api/v1/workspaces", responses((status = 200, body = [WorkspaceResponse])), tag = "workspaces")]
#[instrument(skip(state))]
pub async fn list_workspaces(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<WorkspaceResponse>>, ApiError> {
    let owner_user_id = parse_uuid(&user.0)?;
    let workspaces = state.store.list_workspaces(owner_user_id).await.map_err(internal_error)?;
    Ok(Json(workspaces.into_iter().map(into_response).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/workspaces/{workspace_id}",
    responses((status = 200, body = WorkspaceResponse), (status = 404, body = ErrorResponse)),
    tag = "workspaces"
)]
#[instrument(skip(state))]
pub async fn get_workspace(State(state): State<AppState>, Path(workspace_id): Path<Uuid>) -> Result<Json<WorkspaceResponse>, ApiError> {
    let workspace = state
        .store
        .get_workspace(workspace_id)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorResponse::new(e.to_string(), "NOT_FOUND"))))?;
    Ok(Json(into_response(workspace)))
}

fn into_response(workspace: ai_bus_storage::models::Workspace) -> WorkspaceResponse {
    WorkspaceResponse {
        workspace_id: workspace.workspace_id,
        name: workspace.name,
        owner_user_id: workspace.owner_user_id,
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new("invalid subject claim", "UNAUTHORIZED"))))
}

fn internal_error(err: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(err.to_string(), "INTERNAL")))
}
