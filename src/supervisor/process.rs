//! Spawning and tracking of the single worker OS process.

use crate::supervisor::{LaunchPlan, LogBuffer, LogStream, Result, SupervisorError};

use std::panic::Location;
use std::process::Stdio;
use std::sync::Arc;

use error_location::ErrorLocation;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info};

/// How a worker process exited, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitNotice {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitNotice {
    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".into(),
        }
    }
}

/// Exclusive tracking of one live worker process.
///
/// The OS child is owned by a background wait task; exit is observed
/// through a watch channel so multiple parties (shutdown coordinator,
/// crash watcher, readiness polling) can await the same notification.
#[derive(Clone)]
pub struct ProcessHandle {
    pid: u32,
    exit_rx: watch::Receiver<Option<ExitNotice>>,
}

impl ProcessHandle {
    /// Spawn the worker and wire its output into the log buffer.
    pub async fn spawn(plan: &LaunchPlan, logs: Arc<LogBuffer>) -> Result<Self> {
        let mut cmd = tokio::process::Command::new(&plan.program);
        cmd.args(&plan.args)
            .envs(plan.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        if let Some(cwd) = &plan.cwd {
            cmd.current_dir(cwd);
        }

        // New session so terminal signals aimed at the desktop shell
        // don't reach the worker directly.
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|source| SupervisorError::ProcessSpawn {
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let pid = child.id().ok_or_else(|| SupervisorError::ProcessSpawn {
            source: std::io::Error::other("worker exited before its pid could be read"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!("Spawned worker process with PID {pid}");

        if let Some(stdout) = child.stdout.take() {
            let logs = logs.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    logs.push(LogStream::Stdout, line);
                }
            });
        }

        if let Some(stderr) = child.stderr.take() {
            let logs = logs.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    logs.push(LogStream::Stderr, line);
                }
            });
        }

        let (exit_tx, exit_rx) = watch::channel(None);

        tokio::spawn(async move {
            let notice = match child.wait().await {
                Ok(status) => ExitNotice {
                    code: status.code(),
                },
                Err(e) => {
                    debug!("Failed to wait on worker process: {e}");
                    ExitNotice { code: None }
                }
            };
            debug!("Worker PID {pid} exited ({})", notice.describe());
            let _ = exit_tx.send(Some(notice));
        });

        Ok(Self { pid, exit_rx })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    /// Resolve once the OS confirms the process exited.
    pub async fn wait_exit(&self) -> ExitNotice {
        let mut rx = self.exit_rx.clone();
        loop {
            if let Some(notice) = *rx.borrow() {
                return notice;
            }
            if rx.changed().await.is_err() {
                // Sender always reports the exit before dropping; a closed
                // channel without a notice means the wait task was torn
                // down with the runtime.
                std::future::pending::<()>().await;
            }
        }
    }
}
