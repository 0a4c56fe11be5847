//! Advisory pre-start diagnostics.
//!
//! Run before each start attempt. A failing report is logged and
//! surfaced to observers through the log, but never blocks a start.

use crate::supervisor::SupervisorConfig;

use std::net::TcpListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticsOutcome {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct Finding {
    pub name: String,
    pub outcome: DiagnosticsOutcome,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct DiagnosticsReport {
    pub findings: Vec<Finding>,
}

impl DiagnosticsReport {
    pub fn overall(&self) -> DiagnosticsOutcome {
        let mut overall = DiagnosticsOutcome::Pass;
        for finding in &self.findings {
            match finding.outcome {
                DiagnosticsOutcome::Fail => return DiagnosticsOutcome::Fail,
                DiagnosticsOutcome::Warn => overall = DiagnosticsOutcome::Warn,
                DiagnosticsOutcome::Pass => {}
            }
        }
        overall
    }

    pub fn summary(&self) -> String {
        self.findings
            .iter()
            .map(|f| format!("{} [{:?}]: {}", f.name, f.outcome, f.detail))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Environment inspection collaborator invoked before each start attempt.
pub trait Diagnostics: Send + Sync {
    fn run(&self) -> DiagnosticsReport;
}

/// Default diagnostics: port availability and data directory writability.
pub struct PreflightDiagnostics {
    host: String,
    port: u16,
    data_dir: std::path::PathBuf,
}

impl PreflightDiagnostics {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            data_dir: config.worker.data_dir.clone(),
        }
    }
}

impl Diagnostics for PreflightDiagnostics {
    fn run(&self) -> DiagnosticsReport {
        let mut findings = Vec::new();

        // Binding briefly tells us whether the worker's port is free.
        match TcpListener::bind((self.host.as_str(), self.port)) {
            Ok(_) => findings.push(Finding {
                name: "port".into(),
                outcome: DiagnosticsOutcome::Pass,
                detail: format!("Port {} is available", self.port),
            }),
            Err(e) => findings.push(Finding {
                name: "port".into(),
                outcome: DiagnosticsOutcome::Fail,
                detail: format!("Port {} is not bindable: {e}", self.port),
            }),
        }

        match std::fs::create_dir_all(&self.data_dir) {
            Ok(()) => findings.push(Finding {
                name: "data-dir".into(),
                outcome: DiagnosticsOutcome::Pass,
                detail: format!("Data directory {} is writable", self.data_dir.display()),
            }),
            Err(e) => findings.push(Finding {
                name: "data-dir".into(),
                outcome: DiagnosticsOutcome::Fail,
                detail: format!(
                    "Cannot create data directory {}: {e}",
                    self.data_dir.display()
                ),
            }),
        }

        DiagnosticsReport { findings }
    }
}
