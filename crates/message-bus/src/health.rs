use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ai_bus_common::types::{DeliveryMode, Message, MessageKind};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::broker::BrokerClient;
use crate::queue::QueueManager;

const WARNING_THRESHOLD_MS: u128 = 50;
const CRITICAL_THRESHOLD_MS: u128 = 200;
const HISTORY_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Down,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ProbeResult {
    #[schema(value_type = String)]
    pub name: &'static str,
    pub status: HealthStatus,
    #[schema(value_type = u64)]
    pub latency_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub probes: Vec<ProbeResult>,
    pub sample_count: usize,
}

/// Runs four round-trip probes against the broker and keeps a bounded
/// rolling history of their latencies, mirroring the original health
/// module's ping/set-get/pubsub-echo/queue-roundtrip battery.
pub struct HealthChecker {
    broker: Arc<BrokerClient>,
    queue: Arc<QueueManager>,
    history: Mutex<VecDeque<ProbeResult>>,
}

impl HealthChecker {
    pub fn new(broker: Arc<BrokerClient>, queue: Arc<QueueManager>) -> Self {
        Self {
            broker,
            queue,
            history: Mutex::new(VecDeque::with_capacity(HISTORY_LEN)),
        }
    }

    #[instrument(skip(self))]
    pub async fn check(&self) -> HealthReport {
        let probes = vec![
            self.probe("ping", self.ping_probe()).await,
            self.probe("set_get", self.set_get_probe()).await,
            self.probe("pubsub_echo", self.pubsub_echo_probe()).await,
            self.probe("queue_roundtrip", self.queue_roundtrip_probe()).await,
        ];

        let mut history = self.history.lock().await;
        for probe in &probes {
            if history.len() == HISTORY_LEN {
                history.pop_front();
            }
            history.push_back(probe.clone());
        }

        let status = probes
            .iter()
            .map(|p| p.status)
            .max_by_key(|s| severity_rank(*s))
            .unwrap_or(HealthStatus::Healthy);

        HealthReport {
            status,
            probes,
            sample_count: history.len(),
        }
    }

    async fn probe<F>(&self, name: &'static str, fut: F) -> ProbeResult
    where
        F: std::future::Future<Output = ai_bus_common::error::Result<()>>,
    {
        let start = Instant::now();
        let outcome = fut.await;
        let latency_ms = start.elapsed().as_millis();
        match outcome {
            Ok(()) => ProbeResult {
                name,
                status: status_for_latency(latency_ms),
                latency_ms,
                error: None,
            },
            Err(err) => {
                warn!(probe = name, error = %err, "health probe failed");
                ProbeResult {
                    name,
                    status: HealthStatus::Down,
                    latency_ms,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    async fn ping_probe(&self) -> ai_bus_common::error::Result<()> {
        self.broker.ping().await
    }

    async fn set_get_probe(&self) -> ai_bus_common::error::Result<()> {
        let key = format!("health:check:{}", Uuid::new_v4());
        let value = Uuid::new_v4().to_string();
        let got = self.broker.set_get(&key, &value).await?;
        if got.as_deref() != Some(value.as_str()) {
            return Err(ai_bus_common::error::BusError::TransientBroker(
                "set/get round-trip mismatch".into(),
            ));
        }
        Ok(())
    }

    async fn pubsub_echo_probe(&self) -> ai_bus_common::error::Result<()> {
        let channel = format!("health:pubsub:{}", Uuid::new_v4());
        self.broker.subscribe(&channel).await?;
        self.broker.publish(&channel, b"ping".to_vec()).await?;
        match self.broker.next_frame(Duration::from_millis(500)).await? {
            Some(_frame) => Ok(()),
            None => Err(ai_bus_common::error::BusError::TransientBroker(
                "pubsub echo timed out".into(),
            )),
        }
    }

    async fn queue_roundtrip_probe(&self) -> ai_bus_common::error::Result<()> {
        let queue_name = "health:probe";
        let message = Message::new(
            "health-prober",
            serde_json::json!({"probe": "roundtrip"}),
            MessageKind::Notification,
            DeliveryMode::Queue,
        );
        let message_id = self.queue.enqueue(queue_name, message, 0, 1, Some(60)).await?;
        match self.queue.dequeue(queue_name).await? {
            Some(queued) if queued.message_id == message_id => {
                self.queue.acknowledge(queue_name, &message_id).await?;
                Ok(())
            }
            _ => Err(ai_bus_common::error::BusError::TransientBroker(
                "queue roundtrip returned an unexpected message".into(),
            )),
        }
    }
}

fn status_for_latency(latency_ms: u128) -> HealthStatus {
    if latency_ms >= CRITICAL_THRESHOLD_MS {
        HealthStatus::Critical
    } else if latency_ms >= WARNING_THRESHOLD_MS {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

fn severity_rank(status: HealthStatus) -> u8 {
    match status {
        HealthStatus::Healthy => 0,
        HealthStatus::Warning => 1,
        HealthStatus::Critical => 2,
        HealthStatus::Down => 3,
    }
}
