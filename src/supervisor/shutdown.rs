//! Graceful-then-forceful worker termination.

use crate::supervisor::{ExitNotice, ProcessHandle};

use std::time::Duration;

use tracing::{info, warn};

pub struct ShutdownCoordinator;

impl ShutdownCoordinator {
    /// Terminate the worker and resolve once the OS confirms exit.
    ///
    /// Sends a catchable termination request first; if the process is
    /// still alive after `grace`, escalates to a non-catchable kill.
    pub async fn shutdown(handle: &ProcessHandle, grace: Duration) -> ExitNotice {
        let pid = handle.pid();

        if handle.has_exited() {
            return handle.wait_exit().await;
        }

        Self::signal_graceful(pid);

        match tokio::time::timeout(grace, handle.wait_exit()).await {
            Ok(notice) => {
                info!("Worker exited gracefully ({})", notice.describe());
                notice
            }
            Err(_) => {
                warn!(
                    "Worker ignored graceful shutdown for {}s, force killing PID {pid}",
                    grace.as_secs()
                );
                Self::kill_forceful(pid);
                handle.wait_exit().await
            }
        }
    }

    fn signal_graceful(pid: u32) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            info!("Sending SIGTERM to pid {pid}");
            kill(Pid::from_raw(pid as i32), Signal::SIGTERM).ok();
        }

        #[cfg(windows)]
        {
            use windows_sys::Win32::System::Console::{
                CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent,
            };

            info!("Sending CTRL_BREAK to pid {pid}");
            unsafe {
                GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid);
            }
        }
    }

    fn kill_forceful(pid: u32) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            kill(Pid::from_raw(pid as i32), Signal::SIGKILL).ok();
        }

        #[cfg(windows)]
        {
            std::process::Command::new("taskkill")
                .args(["/F", "/PID", &pid.to_string()])
                .output()
                .ok();
        }
    }
}
