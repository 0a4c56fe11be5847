use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to create data directory at {path}: {source} {location}")]
    DataDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Configuration invalid: {message} {location}")]
    ConfigInvalid {
        message: String,
        location: ErrorLocation,
    },

    #[error("Worker executable not found ({searched}) {location}")]
    WorkerNotFound {
        searched: String,
        location: ErrorLocation,
    },

    #[error("Failed to spawn worker process: {source} {location}")]
    ProcessSpawn {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("A worker process is already being tracked (pid {pid}) {location}")]
    AlreadySpawned { pid: u32, location: ErrorLocation },

    #[error("Worker failed to become ready within {timeout_secs}s {location}")]
    ReadinessTimeout {
        timeout_secs: u64,
        location: ErrorLocation,
    },

    #[error("Health probe failed: {message} {location}")]
    HealthProbe {
        message: String,
        location: ErrorLocation,
    },

    #[error("Worker exited unexpectedly with code {code:?} {location}")]
    ProcessCrashed {
        code: Option<i32>,
        location: ErrorLocation,
    },

    #[error("Graceful shutdown timed out after {timeout_secs}s {location}")]
    ShutdownTimeout {
        timeout_secs: u64,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("HTTP error: {source} {location}")]
    Http {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

impl SupervisorError {
    /// Whether this error is recoverable via retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::HealthProbe { .. } | Self::Http { .. } | Self::ReadinessTimeout { .. }
        )
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::WorkerNotFound { .. } => {
                "The application installation appears incomplete. \
                   Please reinstall LifeFlow."
            }
            Self::ReadinessTimeout { .. } => {
                "The backend is taking too long to start. \
                   Try restarting the application or check the logs."
            }
            Self::ProcessCrashed { .. } => {
                "The backend keeps crashing. \
                   Please report this issue with the diagnostic logs."
            }
            Self::ConfigInvalid { .. } => {
                "Configuration file has invalid settings. \
                   Check the logs for details or delete the config file to use defaults."
            }
            Self::DataDirCreation { .. } => {
                "Unable to create application data directory. \
                   Check file permissions or available disk space."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for SupervisorError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
