//! Health Prober: one bounded liveness check per (re)launch.
//!
//! The prober is purely observational: its outcome feeds the readiness flag
//! and the restart counter, never request routing.  It is cancelled through a
//! per-launch [`CancellationToken`], so a probe scheduled for a process that
//! has already exited never touches the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::HealthConfig;

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Endpoint answered 2xx.
    Ready,
    /// Endpoint answered, but not with a success status.
    StillStarting { status: u16 },
    /// Service has no liveness endpoint; the process is still alive.
    NoEndpoint,
    /// Request failed or timed out.
    Unreachable(String),
    /// The process went away (or the service stopped) before the probe ran.
    Aborted,
}

/// Seam for the liveness request itself.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, url: &str) -> ProbeOutcome;
}

/// `GET <url>` with a bounded timeout.
pub struct HttpHealthCheck {
    client: reqwest::Client,
}

impl HttpHealthCheck {
    pub fn from_config(config: &HealthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, url: &str) -> ProbeOutcome {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => ProbeOutcome::Ready,
            Ok(response) => ProbeOutcome::StillStarting {
                status: response.status().as_u16(),
            },
            Err(e) => ProbeOutcome::Unreachable(e.to_string()),
        }
    }
}

/// Wait `delay`, then probe `url` once.
///
/// Returns [`ProbeOutcome::Aborted`] without any network call if `alive` is
/// cancelled first.
pub async fn probe_after(
    label: &str,
    delay: Duration,
    url: Option<&str>,
    checker: Arc<dyn HealthCheck>,
    alive: CancellationToken,
) -> ProbeOutcome {
    tokio::select! {
        _ = alive.cancelled() => return ProbeOutcome::Aborted,
        _ = tokio::time::sleep(delay) => {}
    }
    if alive.is_cancelled() {
        return ProbeOutcome::Aborted;
    }

    let Some(url) = url else {
        log::info!("health[{label}]: no liveness endpoint; process alive, still starting");
        return ProbeOutcome::NoEndpoint;
    };

    let outcome = tokio::select! {
        _ = alive.cancelled() => ProbeOutcome::Aborted,
        outcome = checker.check(url) => outcome,
    };

    match &outcome {
        ProbeOutcome::Ready => log::info!("health[{label}]: ready ({url})"),
        ProbeOutcome::StillStarting { status } => {
            log::info!("health[{label}]: still starting (HTTP {status})")
        }
        ProbeOutcome::Unreachable(e) => {
            log::warn!("health[{label}]: probe failed, requests will still be attempted: {e}")
        }
        ProbeOutcome::Aborted => log::debug!("health[{label}]: probe aborted"),
        ProbeOutcome::NoEndpoint => {}
    }
    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
