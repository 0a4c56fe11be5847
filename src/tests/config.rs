use crate::supervisor::{CONFIG_VERSION, SupervisorConfig, SupervisorError};

use std::time::Duration;

#[test]
fn test_defaults() {
    let config = SupervisorConfig::default();

    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 51731);
    assert_eq!(config.resilience.max_restart_attempts, 3);
    assert_eq!(config.resilience.restart_delay_ms, 2000);
    assert_eq!(config.resilience.startup_timeout_secs, 30);
    assert_eq!(config.resilience.health_check_interval_secs, 30);
    assert_eq!(config.resilience.health_check_timeout_secs, 5);
    assert_eq!(config.resilience.shutdown_grace_secs, 5);
    assert_eq!(config.logging.capacity, 500);
    assert!(!config.worker.packaged);

    assert!(config.validate().is_ok());
}

#[test]
fn test_duration_accessors() {
    let config = SupervisorConfig::default();

    assert_eq!(config.resilience.restart_delay(), Duration::from_secs(2));
    assert_eq!(config.resilience.startup_timeout(), Duration::from_secs(30));
    assert_eq!(
        config.resilience.health_check_interval(),
        Duration::from_secs(30)
    );
    assert_eq!(
        config.resilience.health_check_timeout(),
        Duration::from_secs(5)
    );
    assert_eq!(config.resilience.shutdown_grace(), Duration::from_secs(5));
}

#[test]
fn test_validate_rejects_privileged_port() {
    let mut config = SupervisorConfig::default();
    config.server.port = 80;

    assert!(matches!(
        config.validate(),
        Err(SupervisorError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_validate_rejects_non_local_host() {
    let mut config = SupervisorConfig::default();
    config.server.host = "0.0.0.0".into();

    assert!(matches!(
        config.validate(),
        Err(SupervisorError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_validate_accepts_localhost_alias() {
    let mut config = SupervisorConfig::default();
    config.server.host = "localhost".into();

    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_zero_startup_timeout() {
    let mut config = SupervisorConfig::default();
    config.resilience.startup_timeout_secs = 0;

    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_log_capacity() {
    let mut config = SupervisorConfig::default();
    config.logging.capacity = 0;

    assert!(config.validate().is_err());
}

#[test]
fn test_load_or_create_writes_default_file() {
    let dir = tempfile::tempdir().unwrap();

    let config = SupervisorConfig::load_or_create(dir.path()).unwrap();

    assert!(dir.path().join("config.toml").exists());
    assert_eq!(config.server.port, 51731);

    // Second load reads the file back unchanged.
    let reloaded = SupervisorConfig::load_or_create(dir.path()).unwrap();
    assert_eq!(reloaded.version, config.version);
    assert_eq!(reloaded.server.port, config.server.port);
}

#[test]
fn test_save_and_reload_roundtrip() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = SupervisorConfig::default();
    config.server.port = 52000;
    config.resilience.max_restart_attempts = 7;
    config.save(dir.path()).unwrap();

    let reloaded = SupervisorConfig::load_or_create(dir.path()).unwrap();
    assert_eq!(reloaded.server.port, 52000);
    assert_eq!(reloaded.resilience.max_restart_attempts, 7);
}

#[test]
fn test_migration_from_version_zero() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "version = 0\n").unwrap();

    let config = SupervisorConfig::load_or_create(dir.path()).unwrap();

    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.resilience.max_restart_attempts, 3);

    // Migrated config is persisted back to disk.
    let content = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(content.contains("version = 1"));
}

#[test]
fn test_load_rejects_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "not valid toml [[[").unwrap();

    assert!(matches!(
        SupervisorConfig::load_or_create(dir.path()),
        Err(SupervisorError::ConfigInvalid { .. })
    ));
}
