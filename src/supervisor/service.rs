//! Per-service actor: wires Launcher → Prober → Restart Policy.
//!
//! One [`ServiceSupervisor`] owns everything mutable about one supervised
//! service (process handle, restart counter, ready flag).  It publishes a
//! [`ServiceStatus`] snapshot after every transition; nothing else writes to
//! it.
//!
//! ```text
//! loop {
//!   launch ──err──────────────────────────────▶ policy.on_launch_failure()
//!     │ ok
//!     ▼
//!   select! { shutdown │ process exit │ probe outcome }
//!     │ shutdown → kill, Stopped, return
//!     │ exit     → cancel probe, policy.on_exit()
//!     │ Ready    → ready = true, policy.on_healthy()
//!   decision: Stop → return │ GiveUp → return │ Restart → sleep(backoff)
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::{RestartConfig, ServiceConfig, ServiceKind};
use crate::process::{LaunchSpec, Launcher, ProcessExit, ProcessHandle};

use super::health::{probe_after, HealthCheck, ProbeOutcome};
use super::restart::{RestartDecision, RestartPolicy};
use super::state::{ServiceState, ServiceStatus};

/// How long shutdown waits for a killed child to be reaped.
const KILL_GRACE: Duration = Duration::from_secs(5);

pub struct ServiceSupervisor {
    kind: ServiceKind,
    spec: LaunchSpec,
    health_url: Option<String>,
    warmup: Duration,
    policy: RestartPolicy,
    launcher: Arc<dyn Launcher>,
    health: Arc<dyn HealthCheck>,
    shutdown: CancellationToken,
    status_tx: watch::Sender<ServiceStatus>,
}

impl ServiceSupervisor {
    /// Build the actor and the receiver observers use to follow it.
    ///
    /// Nothing is launched until [`run`](Self::run) is awaited.
    pub fn new(
        kind: ServiceKind,
        config: &ServiceConfig,
        restart: &RestartConfig,
        launcher: Arc<dyn Launcher>,
        health: Arc<dyn HealthCheck>,
        shutdown: CancellationToken,
    ) -> (Self, watch::Receiver<ServiceStatus>) {
        let (status_tx, status_rx) = watch::channel(ServiceStatus::new(kind));
        let actor = Self {
            kind,
            spec: LaunchSpec::for_service(kind, config),
            health_url: config.health_url(),
            warmup: config.warmup(),
            policy: RestartPolicy::new(config.max_restarts, restart),
            launcher,
            health,
            shutdown,
            status_tx,
        };
        (actor, status_rx)
    }

    /// Supervise until a clean exit, the restart cap, or shutdown.
    pub async fn run(mut self) {
        let name = self.kind.name();
        loop {
            if self.shutdown.is_cancelled() {
                self.finish(ServiceState::Stopped);
                return;
            }

            self.publish(|s| {
                s.state = ServiceState::Launching;
                s.pid = None;
                s.ready = false;
            });

            let decision = match self.launcher.launch(&self.spec) {
                Err(e) => {
                    log::error!("supervisor[{name}]: launch failed: {e}");
                    self.publish(|s| {
                        s.state = ServiceState::Crashed;
                        s.last_exit_code = None;
                    });
                    self.policy.on_launch_failure()
                }
                Ok(handle) => match self.supervise(handle).await {
                    None => {
                        self.finish(ServiceState::Stopped);
                        return;
                    }
                    Some(exit) => {
                        self.publish(|s| {
                            s.state = ServiceState::Crashed;
                            s.pid = None;
                            s.ready = false;
                            s.last_exit_code = exit.code;
                        });
                        self.policy.on_exit(exit)
                    }
                },
            };

            match decision {
                RestartDecision::Stop => {
                    log::info!("supervisor[{name}]: exited cleanly, not restarting");
                    self.finish(ServiceState::Stopped);
                    return;
                }
                RestartDecision::GiveUp { attempts } => {
                    log::error!(
                        "supervisor[{name}]: giving up after {attempts} restart attempts; \
                         requests will use the fallback path only"
                    );
                    self.finish(ServiceState::StoppedPermanently);
                    return;
                }
                RestartDecision::Restart(attempt) => {
                    log::warn!(
                        "supervisor[{name}]: restarting in {}ms (attempt {}/{})",
                        attempt.delay.as_millis(),
                        attempt.index,
                        self.policy.max_restarts()
                    );
                    self.publish(|s| s.restart_attempts = attempt.index);

                    tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            self.finish(ServiceState::Stopped);
                            return;
                        }
                        _ = tokio::time::sleep(attempt.delay) => {}
                    }
                }
            }
        }
    }

    /// Follow one launch generation until its process exits.
    ///
    /// Returns `None` when shutdown was requested; the child has been killed.
    async fn supervise(&mut self, mut handle: ProcessHandle) -> Option<ProcessExit> {
        let name = self.kind.name();
        let pid = handle.pid();
        self.publish(|s| {
            s.state = ServiceState::Running;
            s.pid = pid;
        });

        // Scoped to this process: cancelled on exit or shutdown.
        let alive = self.shutdown.child_token();
        let mut probe = tokio::spawn({
            let label = name.to_string();
            let url = self.health_url.clone();
            let checker = Arc::clone(&self.health);
            let alive = alive.clone();
            let warmup = self.warmup;
            async move { probe_after(&label, warmup, url.as_deref(), checker, alive).await }
        });
        let mut probe_pending = true;

        let exit = loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    alive.cancel();
                    log::info!("supervisor[{name}]: stopping");
                    handle.kill();
                    if tokio::time::timeout(KILL_GRACE, handle.wait()).await.is_err() {
                        log::warn!("supervisor[{name}]: child did not exit within {KILL_GRACE:?}");
                    }
                    return None;
                }
                exit = handle.wait() => break exit,
                outcome = &mut probe, if probe_pending => {
                    probe_pending = false;
                    if let Ok(ProbeOutcome::Ready) = outcome {
                        self.policy.on_healthy();
                        self.publish(|s| {
                            s.ready = true;
                            s.restart_attempts = 0;
                        });
                    }
                }
            }
        };

        alive.cancel();
        log::warn!("supervisor[{name}]: process ended ({exit})");
        Some(exit)
    }

    fn finish(&self, state: ServiceState) {
        let attempts = self.policy.attempts();
        self.publish(|s| {
            s.state = state;
            s.pid = None;
            s.ready = false;
            s.restart_attempts = attempts;
        });
    }

    fn publish(&self, update: impl FnOnce(&mut ServiceStatus)) {
        self.status_tx.send_modify(update);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
