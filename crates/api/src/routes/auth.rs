use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use ai_bus_auth::{hash_password, verify_password, TokenType};

use crate::server::AppState;
use crate::types::{ErrorResponse, LoginRequest, RefreshRequest, RegisterRequest, UserResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses((status = 200, body = UserResponse), (status = 400, body = ErrorResponse)),
    tag = "auth"
)]
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> Result<Json<UserResponse>, ApiError> {
    let hashed = hash_password(&req.password).map_err(|e| bad_request(e.to_string()))?;
    let user = state
        .store
        .create_user(&req.email, &hashed)
        .await
        .map_err(|e| bad_request(e.to_string()))?;
    info!(user_id = %user.user_id, "registered user");
    Ok(Json(UserResponse { user_id: user.user_id, email: user.email }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses((status = 200, body = ai_bus_auth::Token), (status = 401, body = ErrorResponse)),
    tag = "auth"
)]
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Json<ai_bus_auth::Token>, ApiError> {
    let user = state
        .store
        .get_user_by_email(&req.email)
        .await
        .map_err(|e| unauthorized(e.to_string()))?
        .ok_or_else(|| unauthorized("invalid credentials"))?;

    let valid = verify_password(&req.password, &user.hashed_password).map_err(|e| unauthorized(e.to_string()))?;
    if !valid {
        warn!(email = %req.email, "login attempt with wrong password");
        return Err(unauthorized("invalid credentials"));
    }

    let token = state.jwt.issue(&user.user_id.to_string()).map_err(|e| unauthorized(e.to_string()))?;
    Ok(Json(token))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses((status = 200, body = ai_bus_auth::Token), (status = 401, body = ErrorResponse)),
    tag = "auth"
)]
#[instrument(skip(state, req))]
pub async fn refresh(State(state): State<AppState>, Json(req): Json<RefreshRequest>) -> Result<Json<ai_bus_auth::Token>, ApiError> {
    let payload = state
        .jwt
        .verify_token(&req.refresh_token, TokenType::Refresh)
        .map_err(|e| unauthorized(e.to_string()))?;
    let access_token = state.jwt.create_access_token(&payload.sub).map_err(|e| unauthorized(e.to_string()))?;
    Ok(Json(ai_bus_auth::Token {
        access_token,
        refresh_token: None,
        token_type: "bearer",
        expires_in: 0,
    }))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message, "BAD_REQUEST")))
}

fn unauthorized(message: impl Into<String>) -> ApiError {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message, "UNAUTHORIZED")))
}
