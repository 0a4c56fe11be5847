//! Periodic health monitoring while the worker is running.

use crate::supervisor::{EventBus, HealthProber, ProbeStatus, SupervisorEvent};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

/// Handle to the background health-check task.
///
/// The task probes the worker on a fixed cadence and publishes the
/// outcome; it never forces a state transition by itself. Liveness is
/// governed by OS exit notification, not by probe failures.
pub struct HealthMonitor {
    cancel_tx: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl HealthMonitor {
    /// Arm the monitor.
    pub fn spawn(
        prober: Arc<HealthProber>,
        interval: Duration,
        events: Arc<EventBus>,
    ) -> Self {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_rx.changed() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let status = tokio::select! {
                    _ = cancel_rx.changed() => break,
                    status = prober.check() => status,
                };

                // Cancellation may have raced the probe; never publish late.
                if *cancel_rx.borrow() {
                    break;
                }

                match status {
                    ProbeStatus::Healthy { latency_ms } => {
                        debug!("Health check passed ({latency_ms}ms)");
                        events.publish(&SupervisorEvent::HealthCheckPassed);
                    }
                    ProbeStatus::Unhealthy { reason } => {
                        warn!("Health check failed: {reason}");
                        events.publish(&SupervisorEvent::HealthCheckFailed { reason });
                    }
                }
            }
        });

        Self { cancel_tx, handle }
    }

    /// Cancel the monitor and wait for its task to finish. No probe
    /// callback runs after this returns.
    pub async fn cancel(self) {
        let _ = self.cancel_tx.send(true);
        self.handle.abort();
        let _ = self.handle.await;
    }
}
