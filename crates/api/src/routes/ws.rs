//! The WebSocket endpoint plus a couple of admin read endpoints over the
//! Connection Manager. Grounded on the original `/ws/connect` handler and
//! its `connected`/`subscribed`/`message` frame vocabulary.

use axum::{
    extract::{ws::Message as WsMessage, Query, State, WebSocketUpgrade},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use ai_bus_message_bus::HealthReport;

use crate::server::AppState;
use crate::types::{ClientFrame, ConnectionStats, ServerFrame, WsConnectQuery};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connect", get(ws_connect))
        .route("/connections", get(list_connections))
        .route("/stats", get(connection_stats))
}

#[utoipa::path(get, path = "/health", responses((status = 200, body = HealthReport)), tag = "health")]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.check().await)
}

async fn list_connections(State(state): State<AppState>) -> Json<Vec<crate::types::ConnectionSummary>> {
    Json(state.connections.summaries().await)
}

async fn connection_stats(State(state): State<AppState>) -> Json<ConnectionStats> {
    Json(ConnectionStats {
        connection_count: state.connections.connection_count().await,
    })
}

#[instrument(skip(ws, state))]
async fn ws_connect(
    ws: WebSocketUpgrade,
    Query(query): Query<WsConnectQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

async fn handle_socket(socket: axum::extract::ws::WebSocket, query: WsConnectQuery, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let connection_id = state
        .connections
        .connect(query.user_id.clone(), query.workspace_id.clone(), query.agent_id.clone(), tx.clone())
        .await;

    let outbound = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&frame) else { continue };
            if sink.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let _ = tx.send(ServerFrame::Connected {
        connection_id: connection_id.clone(),
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
    });

    if let Some(agent_id) = &query.agent_id {
        state.session.deliver_pending(&connection_id, agent_id).await;
    }

    info!(connection_id = %connection_id, "websocket message loop started");

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };
        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "failed to parse client frame");
                let _ = tx.send(ServerFrame::Error { message: format!("invalid frame: {err}") });
                continue;
            }
        };
        let response = state
            .session
            .handle_client_frame(&connection_id, query.agent_id.as_deref(), query.workspace_id.as_deref(), frame)
            .await;
        if let Some(response) = response {
            if tx.send(response).is_err() {
                break;
            }
        }
    }

    outbound.abort();
    state.connections.disconnect(&connection_id).await;
    info!(connection_id = %connection_id, "websocket message loop ended");
}
