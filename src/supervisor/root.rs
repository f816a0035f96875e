//! Supervisor Root: owns both service actors and the host lifecycle hooks.
//!
//! The host calls [`SupervisorRoot::start`] at boot and
//! [`SupervisorRoot::stop`] on a termination signal.  Request handling gets
//! its [`DualPathInvoker`] from [`SupervisorRoot::invoker`], so the root is
//! passed around explicitly rather than living in a global.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ServiceKind, SupervisorConfig};
use crate::invoke::DualPathInvoker;
use crate::process::{Launcher, ProcessLauncher};

use super::health::{HealthCheck, HttpHealthCheck};
use super::service::ServiceSupervisor;
use super::state::ServiceStatus;

/// Upper bound on how long `stop()` waits for each actor to wind down.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

struct ServiceSlot {
    kind: ServiceKind,
    status_rx: watch::Receiver<ServiceStatus>,
    task: Option<JoinHandle<()>>,
}

pub struct SupervisorRoot {
    config: SupervisorConfig,
    launcher: Arc<dyn Launcher>,
    health: Arc<dyn HealthCheck>,
    slots: Vec<ServiceSlot>,
    shutdown: CancellationToken,
}

impl SupervisorRoot {
    /// Root backed by real processes and HTTP health checks.
    pub fn new(config: SupervisorConfig) -> Self {
        let health = Arc::new(HttpHealthCheck::from_config(&config.health));
        Self::with_parts(config, Arc::new(ProcessLauncher), health)
    }

    /// Root with injected seams.
    pub fn with_parts(
        config: SupervisorConfig,
        launcher: Arc<dyn Launcher>,
        health: Arc<dyn HealthCheck>,
    ) -> Self {
        Self {
            config,
            launcher,
            health,
            slots: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Spawn one actor per enabled service.
    ///
    /// Services whose actor is still running are left alone; services that
    /// stopped (cleanly or permanently) get a fresh actor with a fresh restart
    /// budget.  Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        for kind in ServiceKind::ALL {
            let service = self.config.service(kind);
            if !service.enabled {
                log::info!("supervisor[{kind}]: disabled, requests will use the fallback path");
                continue;
            }

            let active = self
                .slots
                .iter()
                .any(|slot| slot.kind == kind && slot.task.as_ref().is_some_and(|t| !t.is_finished()));
            if active {
                log::debug!("supervisor[{kind}]: already running");
                continue;
            }

            log::info!(
                "supervisor[{kind}]: starting on {} (warm-up {}ms, max {} restarts)",
                service.base_url(),
                service.warmup_ms,
                service.max_restarts
            );
            let (actor, status_rx) = ServiceSupervisor::new(
                kind,
                service,
                &self.config.restart,
                Arc::clone(&self.launcher),
                Arc::clone(&self.health),
                self.shutdown.clone(),
            );
            let slot = ServiceSlot {
                kind,
                status_rx,
                task: Some(tokio::spawn(actor.run())),
            };

            self.slots.retain(|s| s.kind != kind);
            self.slots.push(slot);
        }
    }

    /// Kill every supervised process and cancel pending restarts and probes.
    ///
    /// The last status of each service stays readable afterwards.  The root
    /// can be started again.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();

        for slot in &mut self.slots {
            let Some(task) = slot.task.take() else {
                continue;
            };
            match tokio::time::timeout(STOP_TIMEOUT, task).await {
                Ok(Ok(())) => log::info!("supervisor[{}]: stopped", slot.kind),
                Ok(Err(e)) => log::error!("supervisor[{}]: actor task failed: {e}", slot.kind),
                Err(_) => log::warn!(
                    "supervisor[{}]: did not stop within {STOP_TIMEOUT:?}",
                    slot.kind
                ),
            }
        }

        self.shutdown = CancellationToken::new();
    }

    /// Latest snapshot for `kind`, or `None` if it was never started.
    pub fn status(&self, kind: ServiceKind) -> Option<ServiceStatus> {
        self.slots
            .iter()
            .find(|slot| slot.kind == kind)
            .map(|slot| slot.status_rx.borrow().clone())
    }

    /// Snapshot of both services; never-started services read as stopped.
    pub fn statuses(&self) -> Vec<ServiceStatus> {
        ServiceKind::ALL
            .into_iter()
            .map(|kind| self.status(kind).unwrap_or_else(|| ServiceStatus::new(kind)))
            .collect()
    }

    /// Change notifications for `kind`.
    pub fn subscribe(&self, kind: ServiceKind) -> Option<watch::Receiver<ServiceStatus>> {
        self.slots
            .iter()
            .find(|slot| slot.kind == kind)
            .map(|slot| slot.status_rx.clone())
    }

    /// Request entry point wired to the same addresses the services use.
    pub fn invoker(&self) -> DualPathInvoker {
        DualPathInvoker::from_config(&self.config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::health::ProbeOutcome;
    use crate::supervisor::service::tests::{FakeHealth, ScriptedLauncher, Step};
    use crate::supervisor::ServiceState;

    fn test_config() -> SupervisorConfig {
        let mut config = SupervisorConfig::default();
        config.restart.base_delay_ms = 1;
        config.restart.max_delay_ms = 5;
        config.synthesis.warmup_ms = 60_000;
        config.recognition.warmup_ms = 60_000;
        config
    }

    async fn wait_running(root: &SupervisorRoot, kind: ServiceKind) {
        let mut rx = root.subscribe(kind).expect("service started");
        tokio::time::timeout(
            Duration::from_secs(10),
            rx.wait_for(|s| s.state == ServiceState::Running),
        )
        .await
        .expect("service should reach Running")
        .expect("actor alive");
    }

    #[tokio::test]
    async fn start_launches_both_services_and_stop_kills_them() {
        let launcher = ScriptedLauncher::new(Vec::new());
        let health = FakeHealth::new(ProbeOutcome::Ready);
        let mut root = SupervisorRoot::with_parts(test_config(), launcher.clone(), health);

        root.start();
        wait_running(&root, ServiceKind::Synthesis).await;
        wait_running(&root, ServiceKind::Recognition).await;
        assert_eq!(launcher.launches(), 2);

        // A second start is a no-op while both actors are alive.
        root.start();
        assert_eq!(launcher.launches(), 2);

        root.stop().await;
        for status in root.statuses() {
            assert_eq!(status.state, ServiceState::Stopped);
            assert!(status.pid.is_none());
        }
    }

    #[tokio::test]
    async fn disabled_service_is_never_launched() {
        let mut config = test_config();
        config.recognition.enabled = false;
        let launcher = ScriptedLauncher::new(Vec::new());
        let health = FakeHealth::new(ProbeOutcome::Ready);
        let mut root = SupervisorRoot::with_parts(config, launcher.clone(), health);

        root.start();
        wait_running(&root, ServiceKind::Synthesis).await;

        assert_eq!(launcher.launches(), 1);
        assert!(root.status(ServiceKind::Recognition).is_none());
        let statuses = root.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[1].kind, ServiceKind::Recognition);
        assert_eq!(statuses[1].state, ServiceState::Stopped);

        root.stop().await;
    }

    #[tokio::test]
    async fn restart_after_stop_uses_fresh_actors() {
        let launcher = ScriptedLauncher::new(Vec::new());
        let health = FakeHealth::new(ProbeOutcome::Ready);
        let mut root = SupervisorRoot::with_parts(test_config(), launcher.clone(), health);

        root.start();
        wait_running(&root, ServiceKind::Synthesis).await;
        wait_running(&root, ServiceKind::Recognition).await;
        root.stop().await;

        root.start();
        wait_running(&root, ServiceKind::Synthesis).await;
        wait_running(&root, ServiceKind::Recognition).await;
        assert_eq!(launcher.launches(), 4);

        root.stop().await;
    }

    #[tokio::test]
    async fn permanently_stopped_service_leaves_the_other_running() {
        let mut config = test_config();
        config.synthesis.max_restarts = 1;
        config.recognition.enabled = false;
        let crash = || Step::Exit {
            code: 1,
            after: Duration::from_millis(1),
        };
        let launcher = ScriptedLauncher::new(vec![crash(), crash()]);
        let health = FakeHealth::new(ProbeOutcome::Ready);
        let mut root = SupervisorRoot::with_parts(config, launcher.clone(), health);

        root.start();
        let mut rx = root.subscribe(ServiceKind::Synthesis).expect("started");
        tokio::time::timeout(
            Duration::from_secs(10),
            rx.wait_for(|s| s.state == ServiceState::StoppedPermanently),
        )
        .await
        .expect("service should give up")
        .expect("actor alive");

        assert_eq!(launcher.launches(), 2);
        root.stop().await;
        assert_eq!(
            root.status(ServiceKind::Synthesis).map(|s| s.state),
            Some(ServiceState::StoppedPermanently)
        );
    }

    #[test]
    fn invoker_is_built_from_root_config() {
        let root = SupervisorRoot::new(SupervisorConfig::default());
        let invoker = root.invoker();
        assert_eq!(invoker.config().fallback.program, "python3");
    }
}
