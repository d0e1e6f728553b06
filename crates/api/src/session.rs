//! Session Handler: translates `ClientFrame`s into Message Router calls and
//! `Envelope`s arriving from the Router back into `ServerFrame`s, including
//! the broadcast-exclusion check the wire protocol needs but the core
//! itself (§4.6) deliberately doesn't know about.

use std::sync::Arc;

use ai_bus_common::types::{agent_topic, workspace_topic, DeliveryMode, Envelope, Message, MessageKind};
use ai_bus_message_bus::MessageRouter;
use tracing::{error, info, instrument, warn};

use crate::connection::ConnectionManager;
use crate::types::{ClientFrame, ServerFrame};

const EXCLUDE_AGENT_METADATA_KEY: &str = "exclude_agent";

pub struct SessionHandler {
    connections: Arc<ConnectionManager>,
    router: Arc<MessageRouter>,
}

impl SessionHandler {
    pub fn new(connections: Arc<ConnectionManager>, router: Arc<MessageRouter>) -> Self {
        Self { connections, router }
    }

    #[instrument(skip(self, frame))]
    pub async fn handle_client_frame(
        &self,
        connection_id: &str,
        agent_id: Option<&str>,
        workspace_id: Option<&str>,
        frame: ClientFrame,
    ) -> Option<ServerFrame> {
        match frame {
            ClientFrame::Subscribe { topics } => self.handle_subscribe(connection_id, agent_id, topics).await,
            ClientFrame::Unsubscribe { topics } => self.handle_unsubscribe(connection_id, agent_id, topics).await,
            ClientFrame::Send { to_agent, content, message_type, priority } => {
                self.handle_send(agent_id, to_agent, content, message_type, priority).await
            }
            ClientFrame::Broadcast { workspace_id: ws, content, exclude_agent } => {
                self.handle_broadcast(agent_id, workspace_id, ws, content, exclude_agent).await
            }
            ClientFrame::Pong => {
                self.connections.handle_pong(connection_id).await;
                None
            }
        }
    }

    /// `topics` here are workspace ids, per `Router::subscribe`'s contract:
    /// each one is joined to the agent's own topic so that both direct
    /// pubsub sends and workspace broadcasts reach this connection. The
    /// Connection Manager's topic index is keyed by the fully-qualified
    /// topic strings the Router actually publishes under, not the raw ids.
    async fn handle_subscribe(&self, connection_id: &str, agent_id: Option<&str>, topics: Vec<String>) -> Option<ServerFrame> {
        if topics.is_empty() {
            return Some(ServerFrame::Error { message: "no topics specified".into() });
        }
        let mut qualified_topics: Vec<String> = topics.iter().map(|w| workspace_topic(w)).collect();
        if let Some(agent_id) = agent_id {
            if let Err(err) = self.router.subscribe(agent_id, &topics).await {
                error!(error = %err, "router subscribe failed");
                return Some(ServerFrame::Error { message: err.to_string() });
            }
            qualified_topics.push(agent_topic(agent_id));
        }
        self.connections.subscribe(connection_id, &qualified_topics).await;
        info!(connection_id, ?topics, "subscribed");
        Some(ServerFrame::Subscribed { topics })
    }

    async fn handle_unsubscribe(&self, connection_id: &str, agent_id: Option<&str>, topics: Option<Vec<String>>) -> Option<ServerFrame> {
        let _ = agent_id;
        match &topics {
            Some(list) if !list.is_empty() => {
                let qualified: Vec<String> = list.iter().map(|w| workspace_topic(w)).collect();
                self.connections.unsubscribe(connection_id, Some(&qualified)).await;
            }
            _ => {
                self.connections.unsubscribe(connection_id, None).await;
            }
        }
        Some(ServerFrame::Unsubscribed { topics: topics.unwrap_or_default() })
    }

    async fn handle_send(
        &self,
        agent_id: Option<&str>,
        to_agent: String,
        content: serde_json::Value,
        message_type: Option<MessageKind>,
        priority: i32,
    ) -> Option<ServerFrame> {
        let Some(from_agent) = agent_id else {
            return Some(ServerFrame::Error { message: "not authenticated as an agent".into() });
        };
        let mut message = Message::new(from_agent, content, message_type.unwrap_or_default(), DeliveryMode::Both);
        message.priority = priority;
        match self.router.send_direct(&to_agent, message).await {
            Ok(message_id) => {
                info!(from_agent, %to_agent, "sent message");
                Some(ServerFrame::Sent { message_id })
            }
            Err(err) => Some(ServerFrame::Error { message: err.to_string() }),
        }
    }

    async fn handle_broadcast(
        &self,
        agent_id: Option<&str>,
        connection_workspace: Option<&str>,
        frame_workspace: Option<String>,
        content: serde_json::Value,
        exclude_agent: Option<String>,
    ) -> Option<ServerFrame> {
        let Some(from_agent) = agent_id else {
            return Some(ServerFrame::Error { message: "not authenticated as an agent".into() });
        };
        let Some(workspace_id) = frame_workspace.or_else(|| connection_workspace.map(str::to_string)) else {
            return Some(ServerFrame::Error { message: "missing workspace_id".into() });
        };
        let mut message = Message::new(from_agent, content, MessageKind::Notification, DeliveryMode::Pubsub);
        if let Some(exclude) = exclude_agent {
            message.metadata.insert(EXCLUDE_AGENT_METADATA_KEY.to_string(), exclude.into());
        }
        match self.router.broadcast(&workspace_id, message).await {
            Ok(recipient_count) => {
                info!(from_agent, %workspace_id, recipient_count, "broadcast");
                Some(ServerFrame::Broadcast { workspace_id, recipient_count })
            }
            Err(err) => Some(ServerFrame::Error { message: err.to_string() }),
        }
    }

    /// Called from the frame pump registered against the Message Router:
    /// forwards to the directly-addressed connection, or to every
    /// topic-subscribed connection, honoring `exclude_agent` either way.
    pub async fn deliver(&self, envelope: Envelope) {
        let exclude_agent = envelope
            .payload
            .metadata
            .get(EXCLUDE_AGENT_METADATA_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        if let Some(to_agent) = &envelope.payload.to_agent {
            if exclude_agent.as_deref() == Some(to_agent.as_str()) {
                return;
            }
            if let Some(connection_id) = self.connections.get_agent_connection(to_agent).await {
                let data = serde_json::to_value(&envelope.payload).unwrap_or_default();
                self.connections
                    .send_to_connection(&connection_id, ServerFrame::Message { data, queued: false })
                    .await;
                return;
            }
        }

        let data = serde_json::to_value(&envelope.payload).unwrap_or_default();
        let delivered = self
            .connections
            .broadcast_to_topic(
                &envelope.topic,
                || ServerFrame::Message { data: data.clone(), queued: false },
                exclude_agent.as_deref(),
            )
            .await;
        if delivered == 0 {
            warn!(topic = %envelope.topic, "envelope had no connected subscribers");
        }
    }

    /// Drains any messages that queued up for `agent_id` while it was
    /// offline, delivered in order and acknowledged as they're sent.
    pub async fn deliver_pending(&self, connection_id: &str, agent_id: &str) -> usize {
        let mut delivered = 0;
        loop {
            match self.router.dequeue(agent_id).await {
                Ok(Some(queued)) => {
                    let data = serde_json::to_value(&queued.payload).unwrap_or_default();
                    if !self
                        .connections
                        .send_to_connection(connection_id, ServerFrame::Message { data, queued: true })
                        .await
                    {
                        break;
                    }
                    if let Err(err) = self.router.acknowledge(agent_id, &queued.message_id).await {
                        error!(error = %err, "failed to acknowledge delivered pending message");
                    }
                    delivered += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, "failed to drain pending queue");
                    break;
                }
            }
        }
        if delivered > 0 {
            info!(connection_id, agent_id, delivered, "delivered pending messages");
        }
        delivered
    }
}
