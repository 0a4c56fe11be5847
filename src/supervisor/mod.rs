mod config;
mod diagnostics;
mod error;
mod events;
mod launch;
mod lifecycle;
mod logs;
mod monitor;
mod probe;
mod process;
mod shutdown;
mod state;

pub use config::{
    CONFIG_VERSION, LoggingSettings, ResilienceSettings, ServerSettings, SupervisorConfig,
    WorkerSettings,
};
pub use diagnostics::{
    Diagnostics, DiagnosticsOutcome, DiagnosticsReport, Finding, PreflightDiagnostics,
};
pub use error::{Result, SupervisorError};
pub use events::{EventBus, EventKind, SubscriptionId, SupervisorEvent};
pub use launch::LaunchPlan;
pub use lifecycle::Supervisor;
pub use logs::{LogBuffer, LogLine, LogStream};
pub use monitor::HealthMonitor;
pub use probe::{HealthProber, HealthResponse, ProbeStatus, STARTUP_POLL_INTERVAL};
pub use process::{ExitNotice, ProcessHandle};
pub use shutdown::ShutdownCoordinator;
pub use state::{StatusSnapshot, SupervisorState};
