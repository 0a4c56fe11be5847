//! Readiness probing against the worker health endpoint.

use crate::supervisor::{Result, SupervisorError};

use std::panic::Location;
use std::time::{Duration, Instant};

use error_location::ErrorLocation;
use serde::Deserialize;

const HEALTH_ENDPOINT: &str = "api/health";
const HEALTHY_SENTINEL: &str = "healthy";

/// Interval between readiness probes during startup polling.
pub const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Response from the worker's /api/health endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Outcome of a single readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Healthy { latency_ms: u64 },
    Unhealthy { reason: String },
}

impl ProbeStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

/// Single-probe health checker for the worker process.
///
/// A probe succeeds only on a 2xx response whose JSON body reports the
/// healthy sentinel; anything else (non-2xx, malformed body, timeout,
/// connection refused) is a probe failure.
pub struct HealthProber {
    client: reqwest::Client,
    url: String,
}

impl HealthProber {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self {
            client,
            url: format!("http://{host}:{port}/{HEALTH_ENDPOINT}"),
        })
    }

    /// Perform one bounded-timeout probe.
    pub async fn check(&self) -> ProbeStatus {
        let start = Instant::now();

        match self.client.get(&self.url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<HealthResponse>().await {
                Ok(health) if health.status == HEALTHY_SENTINEL => ProbeStatus::Healthy {
                    latency_ms: start.elapsed().as_millis() as u64,
                },
                Ok(health) => ProbeStatus::Unhealthy {
                    reason: format!("Worker reported status {:?}", health.status),
                },
                Err(e) => ProbeStatus::Unhealthy {
                    reason: format!("Invalid health response: {e}"),
                },
            },
            Ok(resp) => ProbeStatus::Unhealthy {
                reason: format!("HTTP {}", resp.status()),
            },
            Err(e) => ProbeStatus::Unhealthy {
                reason: e.to_string(),
            },
        }
    }

    /// Poll until the worker reports healthy or `timeout` elapses.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();

        loop {
            if self.check().await.is_healthy() {
                return Ok(());
            }

            if start.elapsed() >= timeout {
                return Err(SupervisorError::ReadinessTimeout {
                    timeout_secs: timeout.as_secs(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            tokio::time::sleep(STARTUP_POLL_INTERVAL).await;
        }
    }
}
