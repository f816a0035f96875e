//! Supervisor module: keeps the local inference servers alive.
//!
//! | Piece | Role |
//! |---|---|
//! | [`RestartPolicy`] | backoff and restart cap |
//! | [`probe_after`] / [`HealthCheck`] | one liveness probe per launch |
//! | [`ServiceSupervisor`] | per-service actor owning all mutable state |
//! | [`SupervisorRoot`] | both actors plus start/stop hooks for the host |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use inference_supervisor::config::{ServiceKind, SupervisorConfig};
//! use inference_supervisor::supervisor::SupervisorRoot;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut root = SupervisorRoot::new(SupervisorConfig::default());
//!     root.start();
//!
//!     if let Some(status) = root.status(ServiceKind::Synthesis) {
//!         println!("synthesis: {} ready={}", status.state.label(), status.ready);
//!     }
//!
//!     root.stop().await;
//! }
//! ```

pub mod health;
pub mod restart;
pub mod root;
pub mod service;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use health::{probe_after, HealthCheck, HttpHealthCheck, ProbeOutcome};
pub use restart::{RestartAttempt, RestartDecision, RestartPolicy};
pub use root::SupervisorRoot;
pub use service::ServiceSupervisor;
pub use state::{ServiceState, ServiceStatus};
