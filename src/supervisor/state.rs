use serde::Serialize;

/// Current state of the supervised worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    /// Worker is not running
    Stopped,
    /// Worker is starting up
    Starting,
    /// Worker is running and passed its readiness probe
    Running { port: u16 },
    /// Worker exited unexpectedly; automatic recovery may follow
    Crashed,
    /// Worker won't restart automatically; requires an explicit restart
    Failed { error: String },
    /// Worker is shutting down gracefully
    Stopping,
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running { .. } => "running",
            Self::Crashed => "crashed",
            Self::Failed { .. } => "failed",
            Self::Stopping => "stopping",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Point-in-time view of the supervisor, safe to hand to the UI layer.
///
/// Computed on demand from live state; never cached.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: String,
    pub pid: Option<u32>,
    pub uptime_secs: Option<u64>,
    pub restart_count: u32,
    pub last_error: Option<String>,
    pub port: u16,
}
