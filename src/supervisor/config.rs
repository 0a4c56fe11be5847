//! Supervisor configuration with validation and versioning.

use crate::supervisor::{Result, SupervisorError};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Configuration version for migration support.
/// Increment when adding new fields or changing structure.
pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 51731;
const DEFAULT_MAX_RESTART_ATTEMPTS: u32 = 3;
const DEFAULT_RESTART_DELAY_MS: u64 = 2000;
const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;
const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
const DEFAULT_LOG_CAPACITY: usize = 500;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_INTERPRETER: &str = "python3";
const DEFAULT_DEV_SOURCE_DIR: &str = "backend";
const DATA_DIR_NAME: &str = "LifeFlow";

const MIN_PORT: u16 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Config file format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Worker endpoint settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Worker launch settings
    #[serde(default)]
    pub worker: WorkerSettings,

    /// Crash recovery and timeout settings
    #[serde(default)]
    pub resilience: ResilienceSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host the worker binds to (always 127.0.0.1 for security)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the worker listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Whether the worker runs from a packaged executable.
    /// When false, the worker is launched through the source interpreter.
    #[serde(default)]
    pub packaged: bool,

    /// Directory holding the worker database and logs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Worker source checkout used in dev mode
    #[serde(default = "default_dev_source_dir")]
    pub dev_source_dir: PathBuf,

    /// Interpreter used to launch the worker in dev mode
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceSettings {
    /// Maximum automatic restart attempts before giving up
    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: u32,

    /// Delay between a crash and the automatic restart (milliseconds).
    /// Deliberately fixed rather than exponential: a local sidecar either
    /// comes back immediately or keeps failing for the same reason.
    #[serde(default = "default_restart_delay")]
    pub restart_delay_ms: u64,

    /// Startup timeout (seconds)
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,

    /// Health check interval while running (seconds)
    #[serde(default = "default_health_interval")]
    pub health_check_interval_secs: u64,

    /// Per-probe health check timeout (seconds)
    #[serde(default = "default_health_timeout")]
    pub health_check_timeout_secs: u64,

    /// Grace period before a graceful shutdown escalates to a kill (seconds)
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory (relative to data directory)
    #[serde(default = "default_log_dir")]
    pub directory: String,

    /// Capacity of the in-memory worker output ring buffer
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

// === Default Value Functions ===

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> String {
    DEFAULT_HOST.into()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}
fn default_dev_source_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DEV_SOURCE_DIR)
}
fn default_interpreter() -> PathBuf {
    PathBuf::from(DEFAULT_INTERPRETER)
}
fn default_max_restart_attempts() -> u32 {
    DEFAULT_MAX_RESTART_ATTEMPTS
}
fn default_restart_delay() -> u64 {
    DEFAULT_RESTART_DELAY_MS
}
fn default_startup_timeout() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_SECS
}
fn default_health_interval() -> u64 {
    DEFAULT_HEALTH_INTERVAL_SECS
}
fn default_health_timeout() -> u64 {
    DEFAULT_HEALTH_TIMEOUT_SECS
}
fn default_shutdown_grace() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}
fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.into()
}
fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

// === Default Implementations ===

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerSettings::default(),
            worker: WorkerSettings::default(),
            resilience: ResilienceSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            packaged: false,
            data_dir: default_data_dir(),
            dev_source_dir: default_dev_source_dir(),
            interpreter: default_interpreter(),
        }
    }
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            max_restart_attempts: default_max_restart_attempts(),
            restart_delay_ms: default_restart_delay(),
            startup_timeout_secs: default_startup_timeout(),
            health_check_interval_secs: default_health_interval(),
            health_check_timeout_secs: default_health_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_dir(),
            capacity: default_log_capacity(),
        }
    }
}

impl ResilienceSettings {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

// === Configuration Operations ===

impl SupervisorConfig {
    /// Load config from file, creating default if not exists.
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Self =
                toml::from_str(&content).map_err(|e| SupervisorError::ConfigInvalid {
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            // Migrate if needed
            if config.version < CONFIG_VERSION {
                config = Self::migrate(config)?;
                config.save(data_dir)?;
            }

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(data_dir)?;
            Ok(config)
        }
    }

    /// Save config to file atomically.
    ///
    /// Uses write-to-temp-then-rename pattern to prevent
    /// partial writes if the process is interrupted.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let config_path = data_dir.join("config.toml");
        let content = toml::to_string_pretty(self).map_err(|e| SupervisorError::ConfigInvalid {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Migrate config from older version.
    fn migrate(mut config: Self) -> Result<Self> {
        // Version 0 -> 1: Add resilience settings
        if config.version == 0 {
            config.resilience = ResilienceSettings::default();
            config.version = 1;
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        // Port must be unprivileged
        if self.server.port < MIN_PORT {
            return Err(SupervisorError::ConfigInvalid {
                message: format!("Port must be >= {} (unprivileged)", MIN_PORT),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Host must be localhost for security
        if self.server.host != DEFAULT_HOST && self.server.host != "localhost" {
            return Err(SupervisorError::ConfigInvalid {
                message: format!("Host must be {DEFAULT_HOST} or localhost for security"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Startup timeout must be positive
        if self.resilience.startup_timeout_secs == 0 {
            return Err(SupervisorError::ConfigInvalid {
                message: "Startup timeout must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // An empty ring buffer would silently drop all worker output
        if self.logging.capacity == 0 {
            return Err(SupervisorError::ConfigInvalid {
                message: "Log buffer capacity must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }
}
