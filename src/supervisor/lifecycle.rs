//! Worker process lifecycle with crash recovery.

use crate::supervisor::{
    Diagnostics, DiagnosticsOutcome, EventBus, EventKind, ExitNotice, HealthMonitor, HealthProber,
    LaunchPlan, LogBuffer, LogLine, PreflightDiagnostics, ProcessHandle, ShutdownCoordinator,
    StatusSnapshot, SubscriptionId, SupervisorConfig, SupervisorError, SupervisorEvent,
    SupervisorState,
};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

/// How the worker launch command is obtained.
enum Launcher {
    /// Resolve from configuration on every start attempt.
    Auto,
    /// Always use this explicit plan (embedding and tests).
    Fixed(LaunchPlan),
}

/// Why a start attempt did not reach the running state.
enum StartFailure {
    /// The worker exited while we were still waiting for readiness.
    Exited(ExitNotice),
    /// Spawn error, readiness timeout, or another non-crash failure.
    Fatal(SupervisorError),
}

/// Supervises the single LifeFlow backend worker process.
///
/// Responsibilities:
/// - Start the worker and confirm readiness over HTTP
/// - Monitor health while running
/// - Recover from crashes within a bounded restart budget
/// - Shut the worker down deterministically
///
/// One instance exists per application run; construct it once at
/// startup and inject it wherever the lifecycle is consumed. Cloning
/// shares the same underlying supervisor.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

struct Inner {
    config: SupervisorConfig,
    launcher: Launcher,
    diagnostics: StdMutex<Option<Box<dyn Diagnostics>>>,
    /// Serializes every state-mutating operation (start, stop, restart,
    /// crash handling). Status reads never take this lock.
    lifecycle: Mutex<()>,
    state_tx: watch::Sender<SupervisorState>,
    state_rx: watch::Receiver<SupervisorState>,
    process: StdMutex<Option<ProcessHandle>>,
    monitor: StdMutex<Option<HealthMonitor>>,
    logs: Arc<LogBuffer>,
    events: Arc<EventBus>,
    restart_count: AtomicU32,
    last_error: StdMutex<Option<String>>,
    started_at: StdMutex<Option<Instant>>,
}

impl Supervisor {
    /// Create a supervisor that resolves the worker launch command from
    /// the configuration.
    pub fn new(config: SupervisorConfig) -> Self {
        let diagnostics: Box<dyn Diagnostics> = Box::new(PreflightDiagnostics::new(&config));
        Self::build(config, Launcher::Auto, Some(diagnostics))
    }

    /// Create a supervisor that always launches the given command.
    pub fn with_launch_plan(config: SupervisorConfig, plan: LaunchPlan) -> Self {
        let diagnostics: Box<dyn Diagnostics> = Box::new(PreflightDiagnostics::new(&config));
        Self::build(config, Launcher::Fixed(plan), Some(diagnostics))
    }

    fn build(
        config: SupervisorConfig,
        launcher: Launcher,
        diagnostics: Option<Box<dyn Diagnostics>>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SupervisorState::Stopped);
        let logs = Arc::new(LogBuffer::new(config.logging.capacity));

        Self {
            inner: Arc::new(Inner {
                config,
                launcher,
                diagnostics: StdMutex::new(diagnostics),
                lifecycle: Mutex::new(()),
                state_tx,
                state_rx,
                process: StdMutex::new(None),
                monitor: StdMutex::new(None),
                logs,
                events: Arc::new(EventBus::new()),
                restart_count: AtomicU32::new(0),
                last_error: StdMutex::new(None),
                started_at: StdMutex::new(None),
            }),
        }
    }

    /// Replace the advisory diagnostics collaborator (`None` disables it).
    pub fn set_diagnostics(&self, diagnostics: Option<Box<dyn Diagnostics>>) {
        *self
            .inner
            .diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = diagnostics;
    }

    // === Public lifecycle API ===

    /// Start the worker and wait for it to become ready.
    ///
    /// Returns true if the worker is running when the call completes
    /// (including when it already was); false on spawn failure or
    /// readiness timeout, with the error recorded in the status. Safe
    /// to call concurrently; a second caller observes the first
    /// caller's outcome instead of spawning twice.
    pub async fn start(&self) -> bool {
        let _guard = self.inner.lifecycle.lock().await;

        if self.state().is_running() {
            debug!("start() called while already running, nothing to do");
            return true;
        }

        self.start_locked().await
    }

    /// Stop the worker and resolve once the OS confirms exit.
    ///
    /// Idempotent; a no-op when nothing is running.
    pub async fn stop(&self) {
        let _guard = self.inner.lifecycle.lock().await;
        self.stop_locked().await;
    }

    /// Stop, reset the automatic-restart budget, then start again.
    ///
    /// This is the manual recovery path out of the failed state; unlike
    /// automatic crash recovery it resets the restart counter.
    pub async fn restart(&self) -> bool {
        let _guard = self.inner.lifecycle.lock().await;

        info!("Manual restart requested");
        self.stop_locked().await;
        self.inner.restart_count.store(0, Ordering::SeqCst);
        self.set_last_error(None);
        self.start_locked().await
    }

    /// Application-wide teardown: stop the worker and drop captured logs.
    pub async fn shutdown(&self) {
        self.stop().await;
        self.inner.logs.clear();
    }

    // === Public observation API ===

    /// Current state. Never blocks.
    pub fn state(&self) -> SupervisorState {
        self.inner.state_rx.borrow().clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.inner.state_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Point-in-time status view. Never blocks, never fails.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state().as_str().into(),
            pid: self.pid(),
            uptime_secs: self
                .inner
                .started_at
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .map(|t| t.elapsed().as_secs()),
            restart_count: self.inner.restart_count.load(Ordering::SeqCst),
            last_error: self
                .inner
                .last_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
            port: self.inner.config.server.port,
        }
    }

    pub fn port(&self) -> u16 {
        self.inner.config.server.port
    }

    pub fn pid(&self) -> Option<u32> {
        self.inner
            .process
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| h.pid())
    }

    /// Last `limit` captured worker output lines (`None` = full buffer).
    pub fn logs(&self, limit: Option<usize>) -> Vec<LogLine> {
        self.inner.logs.tail(limit)
    }

    /// Register an event observer.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&SupervisorEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, callback)
    }

    /// Deregister an event observer.
    pub fn off(&self, id: SubscriptionId) {
        self.inner.events.off(id);
    }

    // === Internals (lifecycle lock held) ===

    async fn start_locked(&self) -> bool {
        match self.attempt_start().await {
            Ok(()) => {
                self.inner.events.publish(&SupervisorEvent::Started);
                true
            }
            Err(StartFailure::Exited(notice)) => {
                self.note_crash(notice);
                self.recover().await
            }
            Err(StartFailure::Fatal(e)) => {
                self.fail(e);
                false
            }
        }
    }

    /// One spawn-and-wait-for-readiness cycle.
    async fn attempt_start(&self) -> Result<(), StartFailure> {
        self.set_state(SupervisorState::Starting);
        self.run_diagnostics();

        let plan = match &self.inner.launcher {
            Launcher::Fixed(plan) => plan.clone(),
            Launcher::Auto => LaunchPlan::resolve(&self.inner.config).map_err(StartFailure::Fatal)?,
        };

        let resilience = &self.inner.config.resilience;
        let prober = Arc::new(
            HealthProber::new(
                &self.inner.config.server.host,
                self.inner.config.server.port,
                resilience.health_check_timeout(),
            )
            .map_err(StartFailure::Fatal)?,
        );

        if let Some(existing) = self.tracked_handle() {
            return Err(StartFailure::Fatal(SupervisorError::AlreadySpawned {
                pid: existing.pid(),
                location: error_location::ErrorLocation::from(std::panic::Location::caller()),
            }));
        }

        let handle = ProcessHandle::spawn(&plan, self.inner.logs.clone())
            .await
            .map_err(StartFailure::Fatal)?;
        self.track_handle(handle.clone());

        // Crash watcher: routes an unexpected exit through the crash
        // handler once the lifecycle lock is free again.
        {
            let supervisor = self.clone();
            let watched = handle.clone();
            tokio::spawn(async move {
                let notice = watched.wait_exit().await;
                supervisor.handle_worker_exit(watched.pid(), notice).await;
            });
        }

        let ready = tokio::select! {
            ready = prober.wait_ready(resilience.startup_timeout()) => ready,
            notice = handle.wait_exit() => {
                self.clear_process();
                return Err(StartFailure::Exited(notice));
            }
        };

        match ready {
            Ok(()) => {
                *self
                    .inner
                    .started_at
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
                self.set_state(SupervisorState::Running {
                    port: self.inner.config.server.port,
                });
                self.arm_monitor(prober).await;
                info!(
                    "Worker ready on port {} (pid {})",
                    self.inner.config.server.port,
                    handle.pid()
                );
                Ok(())
            }
            Err(e) => {
                // Alive but never became healthy; don't leave it orphaned.
                // Same termination policy as a regular stop.
                warn!("Worker never became ready, shutting down pid {}", handle.pid());
                ShutdownCoordinator::shutdown(
                    &handle,
                    self.inner.config.resilience.shutdown_grace(),
                )
                .await;
                self.clear_process();
                Err(StartFailure::Fatal(e))
            }
        }
    }

    async fn stop_locked(&self) {
        let state = self.state();
        if matches!(state, SupervisorState::Stopped) {
            debug!("stop() called while already stopped, nothing to do");
            return;
        }

        self.cancel_monitor().await;

        let Some(handle) = self.take_handle() else {
            // Nothing alive to stop. A failed state stays visible until
            // an explicit restart clears it.
            if !matches!(state, SupervisorState::Failed { .. }) {
                self.set_state(SupervisorState::Stopped);
            }
            return;
        };

        self.set_state(SupervisorState::Stopping);

        let notice =
            ShutdownCoordinator::shutdown(&handle, self.inner.config.resilience.shutdown_grace())
                .await;

        self.clear_started_at();
        self.set_state(SupervisorState::Stopped);
        self.inner.events.publish(&SupervisorEvent::Stopped);
        info!("Worker stopped ({})", notice.describe());
    }

    /// Entry point of the crash watcher task.
    ///
    /// Returns a boxed future to break the async `Send`-inference cycle
    /// (`attempt_start` spawns a task awaiting this, which awaits
    /// `recover`, which awaits `attempt_start`).
    fn handle_worker_exit(
        &self,
        pid: u32,
        notice: ExitNotice,
    ) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            // Cheap pre-check without the lock: an exit observed during a
            // coordinated shutdown is the expected path, not a crash.
            if matches!(
                self.state(),
                SupervisorState::Stopping | SupervisorState::Stopped
            ) {
                return;
            }

            let _guard = self.inner.lifecycle.lock().await;

            // The exit may already have been consumed by the start path, or
            // belong to a process generation that has since been replaced.
            if self.tracked_handle().map(|h| h.pid()) != Some(pid) {
                return;
            }
            if !matches!(
                self.state(),
                SupervisorState::Running { .. } | SupervisorState::Starting
            ) {
                return;
            }

            self.cancel_monitor().await;
            self.clear_process();
            self.note_crash(notice);
            self.recover().await;
        })
    }

    /// Bounded automatic restart loop. Runs with the lifecycle lock held;
    /// the triggering crash has already been recorded via `note_crash`.
    async fn recover(&self) -> bool {
        let max = self.inner.config.resilience.max_restart_attempts;
        let delay = self.inner.config.resilience.restart_delay();

        loop {
            let count = self.inner.restart_count.load(Ordering::SeqCst);
            if count >= max {
                self.fail_with_message(format!(
                    "Worker crashed {count} times; automatic restarts exhausted"
                ));
                return false;
            }

            info!("Restarting worker after crash (attempt {count}/{max}), waiting {delay:?}");
            tokio::time::sleep(delay).await;

            match self.attempt_start().await {
                Ok(()) => {
                    self.inner
                        .events
                        .publish(&SupervisorEvent::Restarted { attempt: count });
                    info!("Worker recovered after {count} restart attempt(s)");
                    return true;
                }
                Err(StartFailure::Exited(notice)) => {
                    self.note_crash(notice);
                }
                Err(StartFailure::Fatal(e)) => {
                    self.fail(e);
                    return false;
                }
            }
        }
    }

    /// Record an unexpected exit: last error, crashed state, event, and
    /// the capped automatic restart counter.
    fn note_crash(&self, notice: ExitNotice) {
        let message = format!("Worker exited unexpectedly ({})", notice.describe());
        error!("{message}");

        self.clear_started_at();
        self.set_last_error(Some(message));
        self.set_state(SupervisorState::Crashed);

        let max = self.inner.config.resilience.max_restart_attempts;
        let _ = self
            .inner
            .restart_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                (c < max).then_some(c + 1)
            });

        self.inner.events.publish(&SupervisorEvent::Crashed {
            exit_code: notice.code,
        });
    }

    fn fail(&self, e: SupervisorError) {
        error!("{e} ({})", e.recovery_hint());
        self.fail_with_message(e.to_string());
    }

    fn fail_with_message(&self, message: String) {
        self.clear_started_at();
        self.set_last_error(Some(message.clone()));
        self.set_state(SupervisorState::Failed { error: message });
    }

    fn run_diagnostics(&self) {
        let report = {
            let diagnostics = self
                .inner
                .diagnostics
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            diagnostics.as_ref().map(|d| d.run())
        };

        if let Some(report) = report {
            match report.overall() {
                DiagnosticsOutcome::Pass => debug!("Pre-start diagnostics: {}", report.summary()),
                DiagnosticsOutcome::Warn => {
                    warn!("Pre-start diagnostics warned: {}", report.summary())
                }
                // Advisory only: a failing report never blocks a start.
                DiagnosticsOutcome::Fail => {
                    warn!("Pre-start diagnostics failed: {}", report.summary())
                }
            }
        }
    }

    async fn arm_monitor(&self, prober: Arc<HealthProber>) {
        let monitor = HealthMonitor::spawn(
            prober,
            self.inner.config.resilience.health_check_interval(),
            self.inner.events.clone(),
        );
        let previous = self
            .inner
            .monitor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(monitor);
        if let Some(previous) = previous {
            previous.cancel().await;
        }
    }

    async fn cancel_monitor(&self) {
        let monitor = self
            .inner
            .monitor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(monitor) = monitor {
            monitor.cancel().await;
        }
    }

    fn set_state(&self, state: SupervisorState) {
        let _ = self.inner.state_tx.send(state);
    }

    fn set_last_error(&self, message: Option<String>) {
        *self
            .inner
            .last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = message;
    }

    fn tracked_handle(&self) -> Option<ProcessHandle> {
        self.inner
            .process
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn track_handle(&self, handle: ProcessHandle) {
        *self.inner.process.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    fn take_handle(&self) -> Option<ProcessHandle> {
        self.inner
            .process
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    fn clear_process(&self) {
        self.take_handle();
        self.clear_started_at();
    }

    fn clear_started_at(&self) {
        *self
            .inner
            .started_at
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }
}
