//! WebSocket Connection Manager: tracks every live socket plus the indices
//! needed to address it by user, workspace, or agent, and runs the
//! heartbeat loop that evicts stale connections.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::types::ServerFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

pub struct Connection {
    pub connection_id: String,
    pub user_id: Option<String>,
    pub workspace_id: Option<String>,
    pub agent_id: Option<String>,
    pub subscriptions: HashSet<String>,
    pub state: ConnectionState,
    pub connected_at: f64,
    pub last_pong: f64,
    sender: mpsc::UnboundedSender<ServerFrame>,
}

impl Connection {
    pub fn send(&self, frame: ServerFrame) -> bool {
        self.sender.send(frame).is_ok()
    }
}

#[derive(Default)]
struct ConnectionTable {
    connections: HashMap<String, Connection>,
    topic_subscribers: HashMap<String, HashSet<String>>,
    user_connections: HashMap<String, HashSet<String>>,
    workspace_connections: HashMap<String, HashSet<String>>,
    agent_connections: HashMap<String, String>,
}

/// Owns every live connection behind one `RwLock`, mirroring the original
/// manager's single `asyncio.Lock`-guarded dictionaries. Readers (broadcast,
/// introspection) take a read lock; only connect/disconnect/subscribe take
/// a write lock.
pub struct ConnectionManager {
    table: RwLock<ConnectionTable>,
    next_id: AtomicU64,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    heartbeat: RwLock<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(heartbeat_interval: Duration, heartbeat_timeout: Duration) -> Self {
        Self {
            table: RwLock::new(ConnectionTable::default()),
            next_id: AtomicU64::new(0),
            heartbeat_interval,
            heartbeat_timeout,
            heartbeat: RwLock::new(None),
        }
    }

    #[instrument(skip(self, sender))]
    pub async fn connect(
        &self,
        user_id: Option<String>,
        workspace_id: Option<String>,
        agent_id: Option<String>,
        sender: mpsc::UnboundedSender<ServerFrame>,
    ) -> String {
        let connection_id = format!("conn_{}_{}", Uuid::new_v4().simple(), self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        let conn = Connection {
            connection_id: connection_id.clone(),
            user_id: user_id.clone(),
            workspace_id: workspace_id.clone(),
            agent_id: agent_id.clone(),
            subscriptions: HashSet::new(),
            state: ConnectionState::Connected,
            connected_at: now,
            // Seeded to the connect time, not 0.0, so a connection that never
            // sends a single pong still ages out via the same staleness check
            // instead of being exempt from it forever.
            last_pong: now,
            sender,
        };

        let mut table = self.table.write().await;
        if let Some(agent_id) = &agent_id {
            if let Some(previous_id) = table.agent_connections.get(agent_id).cloned() {
                warn!(previous_connection_id = %previous_id, %agent_id, "evicting prior session for agent re-connect");
                Self::remove_connection(&mut table, &previous_id);
            }
        }
        table.connections.insert(connection_id.clone(), conn);
        if let Some(user_id) = &user_id {
            table.user_connections.entry(user_id.clone()).or_default().insert(connection_id.clone());
        }
        if let Some(workspace_id) = &workspace_id {
            table.workspace_connections.entry(workspace_id.clone()).or_default().insert(connection_id.clone());
        }
        if let Some(agent_id) = &agent_id {
            table.agent_connections.insert(agent_id.clone(), connection_id.clone());
        }
        drop(table);

        info!(connection_id = %connection_id, ?user_id, ?agent_id, "websocket connected");
        connection_id
    }

    #[instrument(skip(self))]
    pub async fn disconnect(&self, connection_id: &str) {
        let mut table = self.table.write().await;
        let removed = Self::remove_connection(&mut table, connection_id);
        drop(table);
        if removed {
            info!(connection_id = %connection_id, "websocket disconnected");
        }
    }

    /// Drops a connection and every secondary index entry pointing at it.
    /// Shared by `disconnect` and by `connect`'s eviction of a prior session
    /// for the same `agent_id`. Returns whether a connection was removed.
    fn remove_connection(table: &mut ConnectionTable, connection_id: &str) -> bool {
        let Some(conn) = table.connections.remove(connection_id) else {
            return false;
        };
        if let Some(user_id) = &conn.user_id {
            if let Some(set) = table.user_connections.get_mut(user_id) {
                set.remove(connection_id);
                if set.is_empty() {
                    table.user_connections.remove(user_id);
                }
            }
        }
        if let Some(workspace_id) = &conn.workspace_id {
            if let Some(set) = table.workspace_connections.get_mut(workspace_id) {
                set.remove(connection_id);
                if set.is_empty() {
                    table.workspace_connections.remove(workspace_id);
                }
            }
        }
        if let Some(agent_id) = &conn.agent_id {
            table.agent_connections.remove(agent_id);
        }
        for topic in &conn.subscriptions {
            if let Some(set) = table.topic_subscribers.get_mut(topic) {
                set.remove(connection_id);
                if set.is_empty() {
                    table.topic_subscribers.remove(topic);
                }
            }
        }
        true
    }

    pub async fn subscribe(&self, connection_id: &str, topics: &[String]) -> bool {
        let mut table = self.table.write().await;
        if !table.connections.contains_key(connection_id) {
            return false;
        }
        for topic in topics {
            table
                .connections
                .get_mut(connection_id)
                .unwrap()
                .subscriptions
                .insert(topic.clone());
            table.topic_subscribers.entry(topic.clone()).or_default().insert(connection_id.to_string());
        }
        true
    }

    pub async fn unsubscribe(&self, connection_id: &str, topics: Option<&[String]>) -> bool {
        let mut table = self.table.write().await;
        let Some(conn) = table.connections.get(connection_id) else {
            return false;
        };
        let to_remove: Vec<String> = match topics {
            Some(list) if !list.is_empty() => list.to_vec(),
            _ => conn.subscriptions.iter().cloned().collect(),
        };
        for topic in &to_remove {
            table.connections.get_mut(connection_id).unwrap().subscriptions.remove(topic);
            if let Some(set) = table.topic_subscribers.get_mut(topic) {
                set.remove(connection_id);
                if set.is_empty() {
                    table.topic_subscribers.remove(topic);
                }
            }
        }
        true
    }

    pub async fn send_to_connection(&self, connection_id: &str, frame: ServerFrame) -> bool {
        let table = self.table.read().await;
        table.connections.get(connection_id).map(|c| c.send(frame)).unwrap_or(false)
    }

    /// Broadcasts to every connection subscribed to `topic`, skipping any
    /// connection whose `agent_id` matches `exclude_agent`.
    pub async fn broadcast_to_topic(&self, topic: &str, frame: impl Fn() -> ServerFrame, exclude_agent: Option<&str>) -> usize {
        let table = self.table.read().await;
        let Some(subscribers) = table.topic_subscribers.get(topic) else {
            return 0;
        };
        let mut count = 0;
        for connection_id in subscribers {
            let Some(conn) = table.connections.get(connection_id) else { continue };
            if exclude_agent.is_some() && conn.agent_id.as_deref() == exclude_agent {
                continue;
            }
            if conn.send(frame()) {
                count += 1;
            }
        }
        count
    }

    pub async fn get_agent_connection(&self, agent_id: &str) -> Option<String> {
        self.table.read().await.agent_connections.get(agent_id).cloned()
    }

    pub async fn connection_count(&self) -> usize {
        self.table.read().await.connections.len()
    }

    pub async fn summaries(&self) -> Vec<crate::types::ConnectionSummary> {
        self.table
            .read()
            .await
            .connections
            .values()
            .map(|c| crate::types::ConnectionSummary {
                connection_id: c.connection_id.clone(),
                user_id: c.user_id.clone(),
                workspace_id: c.workspace_id.clone(),
                agent_id: c.agent_id.clone(),
                subscriptions: c.subscriptions.iter().cloned().collect(),
                connected_at: c.connected_at,
            })
            .collect()
    }

    pub async fn handle_pong(&self, connection_id: &str) {
        let mut table = self.table.write().await;
        if let Some(conn) = table.connections.get_mut(connection_id) {
            conn.last_pong = Utc::now().timestamp_millis() as f64 / 1000.0;
        }
    }

    /// Starts the ping loop once; a second call is a no-op, matching the
    /// original module's lazily-started singleton task.
    pub async fn start_heartbeat(self: &Arc<Self>) {
        let mut guard = self.heartbeat.write().await;
        if guard.is_some() {
            return;
        }
        let manager = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            manager.heartbeat_loop().await;
        }));
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.heartbeat_interval);
        loop {
            ticker.tick().await;
            let now = Utc::now().timestamp_millis() as f64 / 1000.0;
            let stale: Vec<String> = {
                let table = self.table.read().await;
                table
                    .connections
                    .values()
                    .filter(|c| now - c.last_pong > self.heartbeat_timeout.as_secs_f64())
                    .map(|c| c.connection_id.clone())
                    .collect()
            };
            for connection_id in stale {
                warn!(connection_id = %connection_id, "connection timed out, no pong received");
                self.disconnect(&connection_id).await;
            }
            let table = self.table.read().await;
            for conn in table.connections.values() {
                conn.send(ServerFrame::Ping { timestamp: now });
            }
            debug!(count = table.connections.len(), "sent heartbeat ping");
        }
    }

    pub async fn close_all(&self) {
        if let Some(handle) = self.heartbeat.write().await.take() {
            handle.abort();
        }
        let ids: Vec<String> = self.table.read().await.connections.keys().cloned().collect();
        for id in ids {
            self.disconnect(&id).await;
        }
    }
}
