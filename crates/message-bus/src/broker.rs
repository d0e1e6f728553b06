use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ai_bus_common::error::{BusError, Result};
use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// A single frame received off a broker subscription.
#[derive(Debug, Clone)]
pub struct BrokerFrame {
    pub channel: String,
    pub bytes: Vec<u8>,
    pub pattern: Option<String>,
}

/// Typed, retrying façade over Redis. Owns a small round-robin pool of
/// command connections plus one dedicated pub-sub connection. Grounded on
/// the pool/retry/health-loop shape of the original `RedisClient`.
pub struct BrokerClient {
    client: redis::Client,
    pool: Vec<ConnectionManager>,
    next: AtomicUsize,
    pubsub: Mutex<Option<PubSub>>,
    healthy: AtomicBool,
    retry_attempts: u32,
    command_timeout: Duration,
}

impl BrokerClient {
    pub async fn connect(url: &str, pool_size: usize, retry_attempts: u32, command_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url).map_err(BusError::from)?;
        let mut pool = Vec::with_capacity(pool_size.max(1));
        for _ in 0..pool_size.max(1) {
            let conn = client
                .get_connection_manager()
                .await
                .map_err(|e| BusError::FatalStartup(e.to_string()))?;
            pool.push(conn);
        }
        Ok(Self {
            client,
            pool,
            next: AtomicUsize::new(0),
            pubsub: Mutex::new(None),
            healthy: AtomicBool::new(true),
            retry_attempts,
            command_timeout,
        })
    }

    fn conn(&self) -> ConnectionManager {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        self.pool[idx].clone()
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Runs `op` with linear backoff on transient errors, up to
    /// `retry_attempts` tries. After exhaustion the client is marked
    /// unhealthy and the last error is surfaced.
    async fn with_retry<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut(ConnectionManager) -> Fut,
        Fut: std::future::Future<Output = redis::RedisResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let conn = self.conn();
            match timeout(self.command_timeout, op(conn)).await {
                Ok(Ok(value)) => {
                    self.healthy.store(true, Ordering::Relaxed);
                    return Ok(value);
                }
                Ok(Err(err)) if attempt + 1 < self.retry_attempts => {
                    attempt += 1;
                    warn!(op = op_name, attempt, error = %err, "transient broker error, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Ok(Err(err)) => {
                    self.healthy.store(false, Ordering::Relaxed);
                    return Err(BusError::TransientBroker(format!("{op_name}: {err}")));
                }
                Err(_elapsed) if attempt + 1 < self.retry_attempts => {
                    attempt += 1;
                    warn!(op = op_name, attempt, "broker command timed out, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(_elapsed) => {
                    self.healthy.store(false, Ordering::Relaxed);
                    return Err(BusError::TransientBroker(format!("{op_name}: command timed out")));
                }
            }
        }
    }

    #[instrument(skip(self, bytes))]
    pub async fn publish(&self, channel: &str, bytes: Vec<u8>) -> Result<u64> {
        self.with_retry("publish", |mut conn| {
            let channel = channel.to_string();
            let bytes = bytes.clone();
            async move { conn.publish(channel, bytes).await }
        })
        .await
    }

    /// Joins the shared pub-sub subscription. `next_frame` is then used to
    /// pull frames off of it; callers never see the underlying stream type.
    pub async fn subscribe(&self, channel: &str) -> Result<()> {
        self.ensure_pubsub().await?;
        let mut guard = self.pubsub.lock().await;
        guard.as_mut().unwrap().subscribe(channel).await.map_err(BusError::from)
    }

    pub async fn psubscribe(&self, pattern: &str) -> Result<()> {
        self.ensure_pubsub().await?;
        let mut guard = self.pubsub.lock().await;
        guard.as_mut().unwrap().psubscribe(pattern).await.map_err(BusError::from)
    }

    async fn ensure_pubsub(&self) -> Result<()> {
        let mut guard = self.pubsub.lock().await;
        if guard.is_none() {
            let conn = self.client.get_async_pubsub().await.map_err(BusError::from)?;
            *guard = Some(conn);
        }
        Ok(())
    }

    /// Returns the next frame or `None` on timeout. The PubSub Manager
    /// loops this in its pump.
    pub async fn next_frame(&self, wait: Duration) -> Result<Option<BrokerFrame>> {
        let mut guard = self.pubsub.lock().await;
        let pubsub = match guard.as_mut() {
            Some(p) => p,
            None => return Ok(None),
        };
        let mut stream = pubsub.on_message();
        match timeout(wait, futures::StreamExt::next(&mut stream)).await {
            Ok(Some(msg)) => Ok(Some(BrokerFrame {
                channel: msg.get_channel_name().to_string(),
                bytes: msg.get_payload_bytes().to_vec(),
                pattern: msg.get_pattern().ok(),
            })),
            Ok(None) => Ok(None),
            Err(_elapsed) => Ok(None),
        }
    }

    #[instrument(skip(self, bytes))]
    pub async fn queue_push(&self, key: &str, bytes: Vec<u8>, score: f64) -> Result<()> {
        self.with_retry("queue_push", |mut conn| {
            let key = key.to_string();
            let bytes = bytes.clone();
            async move { conn.zadd::<_, _, _, ()>(key, bytes, score).await }
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn queue_pop_min(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result: Vec<(Vec<u8>, f64)> = self
            .with_retry("queue_pop_min", |mut conn| {
                let key = key.to_string();
                async move { conn.zpopmin(key, 1).await }
            })
            .await?;
        Ok(result.into_iter().next().map(|(member, _score)| member))
    }

    #[instrument(skip(self, bytes))]
    pub async fn hash_set(&self, key: &str, field: &str, bytes: Vec<u8>) -> Result<()> {
        self.with_retry("hash_set", |mut conn| {
            let key = key.to_string();
            let field = field.to_string();
            let bytes = bytes.clone();
            async move { conn.hset::<_, _, _, ()>(key, field, bytes).await }
        })
        .await
    }

    pub async fn hash_del(&self, key: &str, field: &str) -> Result<bool> {
        let removed: u64 = self
            .with_retry("hash_del", |mut conn| {
                let key = key.to_string();
                let field = field.to_string();
                async move { conn.hdel(key, field).await }
            })
            .await?;
        Ok(removed > 0)
    }

    pub async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.with_retry("hash_get", |mut conn| {
            let key = key.to_string();
            let field = field.to_string();
            async move { conn.hget(key, field).await }
        })
        .await
    }

    pub async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, Vec<u8>)>> {
        self.with_retry("hash_get_all", |mut conn| {
            let key = key.to_string();
            async move { conn.hgetall(key).await }
        })
        .await
    }

    pub async fn hash_len(&self, key: &str) -> Result<u64> {
        self.with_retry("hash_len", |mut conn| {
            let key = key.to_string();
            async move { conn.hlen(key).await }
        })
        .await
    }

    pub async fn list_push_left(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.with_retry("list_push_left", |mut conn| {
            let key = key.to_string();
            let bytes = bytes.clone();
            async move { conn.lpush::<_, _, ()>(key, bytes).await }
        })
        .await
    }

    pub async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>> {
        self.with_retry("list_range", |mut conn| {
            let key = key.to_string();
            async move { conn.lrange(key, start, stop).await }
        })
        .await
    }

    pub async fn list_len(&self, key: &str) -> Result<u64> {
        self.with_retry("list_len", |mut conn| {
            let key = key.to_string();
            async move { conn.llen(key).await }
        })
        .await
    }

    pub async fn zcard(&self, key: &str) -> Result<u64> {
        self.with_retry("zcard", |mut conn| {
            let key = key.to_string();
            async move { conn.zcard(key).await }
        })
        .await
    }

    pub async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Vec<u8>>> {
        self.with_retry("zrange", |mut conn| {
            let key = key.to_string();
            async move { conn.zrange(key, start, stop).await }
        })
        .await
    }

    pub async fn set_get(&self, key: &str, value: &str) -> Result<Option<String>> {
        self.with_retry("set", |mut conn| {
            let key = key.to_string();
            let value = value.to_string();
            async move {
                let _: () = conn.set(&key, &value).await?;
                conn.get(&key).await
            }
        })
        .await
    }

    pub async fn expire(&self, key: &str, ttl_secs: i64) -> Result<()> {
        self.with_retry("expire", |mut conn| {
            let key = key.to_string();
            async move { conn.expire::<_, ()>(key, ttl_secs).await }
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<()> {
        self.with_retry("ping", |mut conn| async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    /// Runs forever, pinging every `interval` and flipping `healthy` on
    /// failure/success. Used by the Supervisor at startup.
    pub async fn health_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match self.ping().await {
                Ok(()) => debug!("broker health check ok"),
                Err(err) => warn!(error = %err, "broker health check failed"),
            }
        }
    }
}
