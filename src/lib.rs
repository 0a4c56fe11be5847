//! Sidecar process supervisor for the LifeFlow desktop application.
//!
//! The desktop shell spawns a local backend worker (the sidecar) that
//! owns the database and serves the UI over HTTP. This crate owns that
//! worker's lifecycle: starting it, confirming readiness via its health
//! endpoint, monitoring it while alive, recovering from crashes within
//! a bounded restart budget, and shutting it down deterministically.
//!
//! Construct one [`Supervisor`] at application startup and inject it
//! into the layers that consume the lifecycle (IPC commands, tray,
//! teardown hooks).

pub mod logging;
mod supervisor;

#[cfg(test)]
mod tests;

pub use supervisor::{
    CONFIG_VERSION, Diagnostics, DiagnosticsOutcome, DiagnosticsReport, EventKind, ExitNotice,
    Finding, LaunchPlan, LogBuffer, LogLine, LogStream, LoggingSettings, PreflightDiagnostics,
    ProbeStatus, Result, ResilienceSettings, ServerSettings, StatusSnapshot, SubscriptionId,
    Supervisor, SupervisorConfig, SupervisorError, SupervisorEvent, SupervisorState,
    WorkerSettings,
};
