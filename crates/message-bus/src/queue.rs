use ai_bus_common::error::{BusError, Result};
use ai_bus_common::types::{Message, MessageId, QueueSize, QueuedMessage};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::broker::BrokerClient;

const QUEUE_SUFFIX: &str = ":queue";
const PROCESSING_SUFFIX: &str = ":processing";
const DEAD_LETTER_SUFFIX: &str = ":dead_letter";

/// Durable per-recipient priority queue with in-flight tracking and a
/// dead-letter list. Every method maps onto the broker's sorted-set/hash/
/// list primitives; there is no additional in-process lock (§5: the broker
/// commands themselves are atomic).
pub struct QueueManager {
    broker: Arc<BrokerClient>,
    default_ttl_secs: i64,
}

impl QueueManager {
    pub fn new(broker: Arc<BrokerClient>, default_ttl_secs: i64) -> Self {
        Self { broker, default_ttl_secs }
    }

    fn queue_key(name: &str) -> String {
        format!("{name}{QUEUE_SUFFIX}")
    }
    fn processing_key(name: &str) -> String {
        format!("{name}{PROCESSING_SUFFIX}")
    }
    fn dead_letter_key(name: &str) -> String {
        format!("{name}{DEAD_LETTER_SUFFIX}")
    }

    #[instrument(skip(self, payload))]
    pub async fn enqueue(
        &self,
        name: &str,
        payload: Message,
        priority: i32,
        max_attempts: u32,
        ttl_secs: Option<i64>,
    ) -> Result<MessageId> {
        let mut queued = QueuedMessage::new(name, payload, max_attempts);
        queued.priority = priority;
        self.push_queued(name, &queued, ttl_secs).await?;
        Ok(queued.message_id)
    }

    /// Used both for first-time enqueue and for re-enqueue on reject with
    /// `requeue=true`, preserving `message_id` and `priority`.
    async fn push_queued(&self, name: &str, queued: &QueuedMessage, ttl_secs: Option<i64>) -> Result<()> {
        let bytes = serde_json::to_vec(queued)?;
        let score = -(queued.priority as f64);
        let key = Self::queue_key(name);
        self.broker.queue_push(&key, bytes, score).await?;
        self.broker
            .expire(&key, ttl_secs.unwrap_or(self.default_ttl_secs))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn dequeue(&self, name: &str) -> Result<Option<QueuedMessage>> {
        let key = Self::queue_key(name);
        let Some(bytes) = self.broker.queue_pop_min(&key).await? else {
            return Ok(None);
        };
        let mut queued: QueuedMessage = serde_json::from_slice(&bytes)?;
        queued.attempts += 1;
        let serialized = serde_json::to_vec(&queued)?;
        self.broker
            .hash_set(&Self::processing_key(name), &queued.message_id.0, serialized)
            .await?;
        Ok(Some(queued))
    }

    #[instrument(skip(self))]
    pub async fn acknowledge(&self, name: &str, message_id: &MessageId) -> Result<bool> {
        self.broker
            .hash_del(&Self::processing_key(name), &message_id.0)
            .await
    }

    #[instrument(skip(self))]
    pub async fn reject(&self, name: &str, message_id: &MessageId, requeue: bool) -> Result<()> {
        let key = Self::processing_key(name);
        let Some(bytes) = self.broker.hash_get(&key, &message_id.0).await? else {
            return Ok(());
        };
        self.broker.hash_del(&key, &message_id.0).await?;
        let queued: QueuedMessage = serde_json::from_slice(&bytes)?;

        if requeue && queued.attempts < queued.max_attempts {
            self.push_queued(name, &queued, None).await?;
        } else {
            warn!(message_id = %message_id, queue = name, "moving message to dead letter");
            self.broker
                .list_push_left(&Self::dead_letter_key(name), bytes)
                .await?;
        }
        Ok(())
    }

    /// Scans the processing hash and rejects anything older than `max_age`,
    /// requeueing unless the retry budget is exhausted.
    #[instrument(skip(self))]
    pub async fn cleanup_stale(&self, name: &str, max_age: chrono::Duration) -> Result<usize> {
        let entries = self.broker.hash_get_all(&Self::processing_key(name)).await?;
        let now = Utc::now();
        let mut cleaned = 0;
        for (_field, bytes) in entries {
            let queued: QueuedMessage = match serde_json::from_slice(&bytes) {
                Ok(q) => q,
                Err(_) => continue,
            };
            if now - queued.created_at > max_age {
                let requeue = queued.attempts < queued.max_attempts;
                self.reject(name, &queued.message_id, requeue).await?;
                cleaned += 1;
            }
        }
        if cleaned > 0 {
            info!(queue = name, cleaned, "reaped stale in-flight messages");
        }
        Ok(cleaned)
    }

    pub async fn pending(&self, name: &str) -> Result<Vec<QueuedMessage>> {
        let raw = self.broker.zrange(&Self::queue_key(name), 0, -1).await?;
        decode_all(raw)
    }

    pub async fn processing(&self, name: &str) -> Result<Vec<QueuedMessage>> {
        let raw = self.broker.hash_get_all(&Self::processing_key(name)).await?;
        decode_all(raw.into_iter().map(|(_, v)| v).collect())
    }

    pub async fn dead_letter(&self, name: &str, count: isize) -> Result<Vec<QueuedMessage>> {
        let raw = self
            .broker
            .list_range(&Self::dead_letter_key(name), 0, count.saturating_sub(1))
            .await?;
        decode_all(raw)
    }

    pub async fn size(&self, name: &str) -> Result<QueueSize> {
        let pending = self.broker.zcard(&Self::queue_key(name)).await?;
        let processing = self.broker.hash_len(&Self::processing_key(name)).await?;
        let dead_letter = self.broker.list_len(&Self::dead_letter_key(name)).await?;
        Ok(QueueSize {
            pending,
            processing,
            dead_letter,
            total: pending + processing + dead_letter,
        })
    }
}

fn decode_all(raw: Vec<Vec<u8>>) -> Result<Vec<QueuedMessage>> {
    raw.into_iter()
        .map(|bytes| serde_json::from_slice(&bytes).map_err(BusError::from))
        .collect()
}
