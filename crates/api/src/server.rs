use std::sync::Arc;
use std::time::Duration;

use ai_bus_auth::JwtManager;
use ai_bus_common::{BusConfig, BusError};
use ai_bus_message_bus::{BrokerClient, HealthChecker, MessageRouter, PubSubManager, QueueManager};
use ai_bus_scheduler::TaskScheduler;
use ai_bus_storage::PostgresStore;
use axum::{routing::get, Router};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::connection::ConnectionManager;
use crate::session::SessionHandler;

/// Everything an axum handler might need, cloned cheaply via `Arc` fields.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<MessageRouter>,
    pub connections: Arc<ConnectionManager>,
    pub session: Arc<SessionHandler>,
    pub store: Arc<PostgresStore>,
    pub jwt: Arc<JwtManager>,
    pub health: Arc<HealthChecker>,
}

/// Assembles and runs the bus: the Supervisor in spec terms. Owns the
/// startup order (broker connect → health loop → pubsub pump → router
/// callback wiring) and the matching graceful-shutdown sequence.
pub struct BusServer {
    state: AppState,
    scheduler: TaskScheduler,
    config: BusConfig,
    broker: Arc<BrokerClient>,
    pubsub: Arc<PubSubManager>,
    broker_health_task: Mutex<Option<JoinHandle<()>>>,
    resync_task: Mutex<Option<JoinHandle<()>>>,
}

impl BusServer {
    pub async fn new(config: BusConfig, database_url: &str, jwt_secret: &str) -> Result<Self, BusError> {
        let broker = Arc::new(
            BrokerClient::connect(
                &config.broker.url,
                config.broker.pool_size,
                config.broker.retry_attempts,
                Duration::from_secs(config.broker.socket_timeout_secs),
            )
            .await?,
        );

        let pubsub = Arc::new(PubSubManager::new(
            Arc::clone(&broker),
            Duration::from_secs(config.pubsub.pump_tick_secs),
        ));
        let queue = Arc::new(QueueManager::new(Arc::clone(&broker), config.queue.default_ttl_secs as i64));
        let router = Arc::new(MessageRouter::new(Arc::clone(&pubsub), Arc::clone(&queue)).with_max_attempts(config.queue.max_attempts));
        let health = Arc::new(HealthChecker::new(Arc::clone(&broker), Arc::clone(&queue)));

        let connections = Arc::new(ConnectionManager::new(
            Duration::from_secs(config.connection.heartbeat_interval_secs),
            Duration::from_secs(config.connection.heartbeat_timeout_secs),
        ));
        let session = Arc::new(SessionHandler::new(Arc::clone(&connections), Arc::clone(&router)));

        let session_for_callback = Arc::clone(&session);
        router
            .on_message(move |envelope| {
                let session = Arc::clone(&session_for_callback);
                tokio::spawn(async move {
                    session.deliver(envelope).await;
                });
            })
            .await;

        let store = Arc::new(
            PostgresStore::connect(database_url)
                .await
                .map_err(|e| BusError::FatalStartup(e.to_string()))?,
        );
        store.run_migrations().await.map_err(|e| BusError::FatalStartup(e.to_string()))?;

        let jwt = Arc::new(JwtManager::new(jwt_secret, 30, 7));

        let state = AppState {
            router,
            connections,
            session,
            store,
            jwt,
            health,
        };

        Ok(Self {
            state,
            scheduler: TaskScheduler::new().await?,
            config,
            broker,
            pubsub,
            broker_health_task: Mutex::new(None),
            resync_task: Mutex::new(None),
        })
    }

    /// Starts the background loops: pubsub pump, broker health loop,
    /// connection heartbeat, and the stale-message reaper.
    pub async fn start(&self) -> Result<(), BusError> {
        self.pubsub.start_listening().await;

        let health_interval = Duration::from_secs(self.config.broker.health_check_interval_secs);
        *self.broker_health_task.lock().await = Some(tokio::spawn(Arc::clone(&self.broker).health_loop(health_interval)));

        let broker = Arc::clone(&self.broker);
        let pubsub = Arc::clone(&self.pubsub);
        *self.resync_task.lock().await = Some(tokio::spawn(async move {
            let mut was_healthy = broker.is_healthy();
            let mut ticker = tokio::time::interval(health_interval);
            loop {
                ticker.tick().await;
                let healthy = broker.is_healthy();
                if healthy && !was_healthy {
                    info!("broker recovered, resyncing pubsub subscriptions");
                    if let Err(err) = pubsub.resync().await {
                        warn!(error = %err, "pubsub resync after broker recovery failed");
                    }
                }
                was_healthy = healthy;
            }
        }));

        self.state.connections.start_heartbeat().await;
        self.scheduler.start().await?;
        info!("AI Agent Collaboration Bus started");
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        self.pubsub.stop_listening().await;
        if let Some(handle) = self.broker_health_task.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.resync_task.lock().await.take() {
            handle.abort();
        }
        self.state.connections.close_all().await;
        let _ = self.scheduler.stop().await;
        info!("AI Agent Collaboration Bus shut down");
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/health", get(crate::routes::ws::health_check))
            .nest("/ws", crate::routes::ws::router())
            .nest("/api/v1/auth", crate::routes::auth::router())
            .nest("/api/v1/workspaces", crate::routes::workspaces::router())
            .nest("/api/v1/workspaces", crate::routes::sandboxes::router())
            .nest("/api/v1/messages", crate::routes::messages::router())
            .nest("/api/v1/queues", crate::routes::queues::router())
            .merge(swagger_router())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }
}

fn swagger_router() -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;
    Router::new().merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", crate::openapi::ApiDoc::openapi()))
}

async fn root() -> &'static str {
    "AI Agent Collaboration Bus"
}
