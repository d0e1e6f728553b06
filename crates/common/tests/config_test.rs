use ai_bus_common::config::BusConfig;
use std::fs;
use tempfile::TempDir;

#[test]
fn config_load_from_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bus.yaml");

    let config_content = r#"
broker:
  url: redis://localhost:6379
  pool_size: 20
connection:
  heartbeat_interval_secs: 15
queue:
  max_attempts: 5
http:
  port: 9000
  cors_origins:
    - https://example.com
"#;

    fs::write(&config_path, config_content).unwrap();

    let config = BusConfig::from_file(&config_path).unwrap();

    assert_eq!(config.broker.url, "redis://localhost:6379");
    assert_eq!(config.broker.pool_size, 20);
    assert_eq!(config.connection.heartbeat_interval_secs, 15);
    assert_eq!(config.queue.max_attempts, 5);
    assert_eq!(config.http.port, 9000);
    assert_eq!(config.http.cors_origins, vec!["https://example.com"]);

    // Fields left out of the file still take their documented defaults.
    assert_eq!(config.connection.heartbeat_timeout_secs, 60);
    assert_eq!(config.queue.default_ttl_secs, 86_400);
}

#[test]
fn config_load_missing_file_errors() {
    let result = BusConfig::from_file("/nonexistent/bus.yaml");
    assert!(result.is_err());
}

#[test]
fn env_override_takes_precedence_over_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bus.yaml");
    fs::write(&config_path, "broker:\n  url: redis://file:6379\n").unwrap();

    std::env::set_var("BUS_BROKER_URL", "redis://override:6379");
    let config = BusConfig::from_file(&config_path).unwrap();
    std::env::remove_var("BUS_BROKER_URL");

    assert_eq!(config.broker.url, "redis://override:6379");
}
