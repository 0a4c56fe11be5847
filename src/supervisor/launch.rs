//! Worker executable resolution and launch command construction.

use crate::supervisor::{Result, SupervisorConfig, SupervisorError};

use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use tracing::info;

const DB_FILENAME: &str = "lifeflow.db";
const DEV_ENTRYPOINT: &str = "run_server.py";

#[cfg(windows)]
const WORKER_BINARY: &str = "lifeflow-backend.exe";
#[cfg(not(windows))]
const WORKER_BINARY: &str = "lifeflow-backend";

/// Fully resolved worker launch command.
///
/// Program, arguments, environment, and working directory, computed
/// once per start attempt from the immutable configuration.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl LaunchPlan {
    /// Build the launch plan for the configured mode.
    ///
    /// Packaged mode resolves the bundled worker executable; dev mode
    /// falls back to running the worker source through the configured
    /// interpreter.
    pub fn resolve(config: &SupervisorConfig) -> Result<Self> {
        let db_path = config.worker.data_dir.join(DB_FILENAME);

        let mut args = vec![
            "--host".into(),
            config.server.host.clone(),
            "--port".into(),
            config.server.port.to_string(),
            "--db-path".into(),
            db_path.to_string_lossy().into_owned(),
        ];

        let envs = vec![
            ("PYTHONUNBUFFERED".into(), "1".into()),
            (
                "LIFEFLOW_DATABASE_PATH".into(),
                db_path.to_string_lossy().into_owned(),
            ),
        ];

        if config.worker.packaged {
            let program = find_worker_binary(config)?;
            args.push("--packaged".into());

            Ok(Self {
                program,
                args,
                envs,
                cwd: None,
            })
        } else {
            let entrypoint = config.worker.dev_source_dir.join(DEV_ENTRYPOINT);
            info!(
                "Dev mode: launching worker via {} {}",
                config.worker.interpreter.display(),
                entrypoint.display()
            );

            let mut dev_args = vec![entrypoint.to_string_lossy().into_owned()];
            dev_args.append(&mut args);

            Ok(Self {
                program: config.worker.interpreter.clone(),
                args: dev_args,
                envs,
                cwd: Some(config.worker.dev_source_dir.clone()),
            })
        }
    }
}

/// Find the packaged worker executable.
///
/// Search order:
/// 1. Sibling to current exe (bundled production builds)
/// 2. resources/backend/ next to the current exe
/// 3. Installed at <data_dir>/bin/
fn find_worker_binary(config: &SupervisorConfig) -> Result<PathBuf> {
    let mut searched = Vec::new();

    if let Ok(exe) = std::env::current_exe()
        && let Some(exe_dir) = exe.parent()
    {
        let sibling = exe_dir.join(WORKER_BINARY);
        if sibling.exists() {
            info!("Using worker (sibling): {}", sibling.display());
            return Ok(sibling);
        }
        searched.push(sibling);

        let bundled = exe_dir.join("resources").join("backend").join(WORKER_BINARY);
        if bundled.exists() {
            info!("Using worker (bundled): {}", bundled.display());
            return Ok(bundled);
        }
        searched.push(bundled);
    }

    let installed = config.worker.data_dir.join("bin").join(WORKER_BINARY);
    if installed.exists() {
        info!("Using worker (installed): {}", installed.display());
        return Ok(installed);
    }
    searched.push(installed);

    Err(SupervisorError::WorkerNotFound {
        searched: searched
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        location: ErrorLocation::from(Location::caller()),
    })
}
