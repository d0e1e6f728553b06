use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the bus. Loaded from a YAML file and then
/// overridden by a handful of `BUS_*` environment variables so the same
/// config file can be reused across environments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub pubsub: PubSubConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_socket_timeout_secs")]
    pub socket_timeout_secs: u64,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            pool_size: default_pool_size(),
            socket_timeout_secs: default_socket_timeout_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_stale_max_age_secs")]
    pub stale_max_age_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_queue_ttl_secs(),
            max_attempts: default_max_attempts(),
            stale_max_age_secs: default_stale_max_age_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
    #[serde(default = "default_pump_tick_secs")]
    pub pump_tick_secs: u64,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            pump_tick_secs: default_pump_tick_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_broker_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_pool_size() -> usize {
    10
}
fn default_socket_timeout_secs() -> u64 {
    5
}
fn default_health_check_interval_secs() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_heartbeat_interval_secs() -> u64 {
    30
}
fn default_heartbeat_timeout_secs() -> u64 {
    60
}
fn default_queue_ttl_secs() -> u64 {
    86_400
}
fn default_max_attempts() -> u32 {
    3
}
fn default_stale_max_age_secs() -> u64 {
    3_600
}
fn default_pump_tick_secs() -> u64 {
    1
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            connection: ConnectionConfig::default(),
            queue: QueueConfig::default(),
            pubsub: PubSubConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl BusConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("failed to read config file")?;
        let mut config: Self =
            serde_yaml::from_str(&content).context("failed to parse YAML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// A handful of environment variables take precedence over the file,
    /// mirroring how the collaborator services are deployed.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("BUS_BROKER_URL") {
            self.broker.url = url;
        }
        if let Ok(port) = std::env::var("BUS_HTTP_PORT") {
            if let Ok(port) = port.parse() {
                self.http.port = port;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = BusConfig::default();
        assert_eq!(config.broker.pool_size, 10);
        assert_eq!(config.connection.heartbeat_interval_secs, 30);
        assert_eq!(config.connection.heartbeat_timeout_secs, 60);
        assert_eq!(config.queue.default_ttl_secs, 86_400);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.stale_max_age_secs, 3_600);
        assert_eq!(config.pubsub.pump_tick_secs, 1);
    }

    #[test]
    fn parses_partial_yaml_with_defaults() {
        let yaml = "broker:\n  url: redis://broker:6379\n";
        let config: BusConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.broker.url, "redis://broker:6379");
        assert_eq!(config.broker.pool_size, 10);
    }
}
