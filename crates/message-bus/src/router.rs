use std::sync::Arc;

use ai_bus_common::error::Result;
use ai_bus_common::types::{
    agent_inbox_queue, agent_topic, workspace_topic, DeliveryMode, Message, MessageId, QueuedMessage,
};
use tracing::instrument;

use crate::pubsub::{HandlerId, PubSubManager};
use crate::queue::QueueManager;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Thin composition over the PubSub Manager and the Queue Manager: the only
/// piece of the core that knows how a `Message`'s `mode` maps onto topics
/// and queue names.
pub struct MessageRouter {
    pubsub: Arc<PubSubManager>,
    queue: Arc<QueueManager>,
    max_attempts: u32,
}

impl MessageRouter {
    pub fn new(pubsub: Arc<PubSubManager>, queue: Arc<QueueManager>) -> Self {
        Self {
            pubsub,
            queue,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Subscribes `agent_id` to its own topic plus every named workspace,
    /// so pubsub-mode direct messages and workspace broadcasts both land.
    #[instrument(skip(self))]
    pub async fn subscribe(&self, agent_id: &str, workspace_ids: &[String]) -> Result<()> {
        let mut topics = vec![agent_topic(agent_id)];
        topics.extend(workspace_ids.iter().map(|w| workspace_topic(w)));
        self.pubsub.subscribe(agent_id, &topics).await
    }

    pub async fn on_message<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(ai_bus_common::types::Envelope) + Send + Sync + 'static,
    {
        self.pubsub.on_message(handler).await
    }

    /// Routes a message per its `mode`: `Pubsub` publishes only, `Queue`
    /// enqueues only, `Both` does both so a disconnected recipient still
    /// gets durable delivery via the queue.
    #[instrument(skip(self, message))]
    pub async fn send_direct(&self, to_agent: &str, mut message: Message) -> Result<MessageId> {
        message.to_agent = Some(to_agent.to_string());
        let mode = message.mode;
        let message_id = message.message_id.clone();
        let priority = message.priority;

        if matches!(mode, DeliveryMode::Pubsub | DeliveryMode::Both) {
            self.pubsub
                .publish(&agent_topic(to_agent), message.clone(), Some(message_id.clone()))
                .await?;
        }
        if matches!(mode, DeliveryMode::Queue | DeliveryMode::Both) {
            self.queue
                .enqueue(
                    &agent_inbox_queue(to_agent),
                    message,
                    priority,
                    self.max_attempts,
                    None,
                )
                .await?;
        }
        Ok(message_id)
    }

    /// Broadcasts to a workspace topic. Always pubsub-only: a broadcast has
    /// no single recipient inbox to durably queue into.
    #[instrument(skip(self, message))]
    pub async fn broadcast(&self, workspace_id: &str, mut message: Message) -> Result<usize> {
        message.workspace_id = Some(workspace_id.to_string());
        let message_id = message.message_id.clone();
        self.pubsub
            .publish(&workspace_topic(workspace_id), message, Some(message_id))
            .await
    }

    pub async fn get_pending(&self, agent_id: &str) -> Result<Vec<QueuedMessage>> {
        self.queue.pending(&agent_inbox_queue(agent_id)).await
    }

    pub async fn dequeue(&self, agent_id: &str) -> Result<Option<QueuedMessage>> {
        self.queue.dequeue(&agent_inbox_queue(agent_id)).await
    }

    pub async fn acknowledge(&self, agent_id: &str, message_id: &MessageId) -> Result<bool> {
        self.queue.acknowledge(&agent_inbox_queue(agent_id), message_id).await
    }

    pub async fn reject(&self, agent_id: &str, message_id: &MessageId, requeue: bool) -> Result<()> {
        self.queue
            .reject(&agent_inbox_queue(agent_id), message_id, requeue)
            .await
    }

    pub async fn cleanup_stale_messages(&self, agent_id: &str, max_age: chrono::Duration) -> Result<usize> {
        self.queue.cleanup_stale(&agent_inbox_queue(agent_id), max_age).await
    }

    pub async fn queue_size(&self, agent_id: &str) -> Result<ai_bus_common::types::QueueSize> {
        self.queue.size(&agent_inbox_queue(agent_id)).await
    }
}
