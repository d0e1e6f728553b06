use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use ai_bus_auth::TokenType;

use crate::server::AppState;
use crate::types::ErrorResponse;

/// Authenticated user id, inserted into request extensions for handlers to
/// pull out with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

/// Bearer-token middleware. Grounded on the original dependency-injected
/// `get_current_user` check, reimplemented as a tower `from_fn` layer.
pub async fn require_auth(State(state): State<AppState>, mut request: Request<Body>, next: Next) -> Response {
    let Some(token) = extract_bearer(&request) else {
        return unauthorized("missing bearer token");
    };
    match state.jwt.verify_token(token, TokenType::Access) {
        Ok(payload) => {
            request.extensions_mut().insert(AuthenticatedUser(payload.sub));
            next.run(request).await
        }
        Err(err) => unauthorized(&err.to_string()),
    }
}

fn extract_bearer(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message, "UNAUTHORIZED"))).into_response()
}
