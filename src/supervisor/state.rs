//! Service state machine and the status snapshot observers read.
//!
//! [`ServiceState`] is driven by the service actor only.  Everyone else sees
//! a [`ServiceStatus`] through a `tokio::sync::watch` receiver, so there is
//! no shared mutable state to lock.

use crate::config::ServiceKind;

// ---------------------------------------------------------------------------
// ServiceState
// ---------------------------------------------------------------------------

/// Lifecycle states of one supervised service.
///
/// ```text
/// Stopped ──start──▶ Launching ──spawned──▶ Running
///                        │                     │
///                        │ spawn failed        │ non-zero exit / killed
///                        ▼                     ▼
///                     Crashed ◀────────────────┘
///                        │
///                        ├─ attempts remain ─▶ Launching
///                        └─ cap reached ─────▶ StoppedPermanently
///
/// Running ──clean exit / host shutdown──▶ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    /// Not running and not scheduled to run.
    #[default]
    Stopped,
    /// `spawn()` is in progress.
    Launching,
    /// A process handle is live.
    Running,
    /// The last process died unexpectedly; a relaunch may be pending.
    Crashed,
    /// Restart cap exceeded.  Requests are served by the fallback only.
    StoppedPermanently,
}

impl ServiceState {
    /// `true` while a process handle exists or is being created.
    ///
    /// ```
    /// use inference_supervisor::supervisor::ServiceState;
    ///
    /// assert!(ServiceState::Running.is_live());
    /// assert!(ServiceState::Launching.is_live());
    /// assert!(!ServiceState::Crashed.is_live());
    /// assert!(!ServiceState::StoppedPermanently.is_live());
    /// ```
    pub fn is_live(&self) -> bool {
        matches!(self, ServiceState::Launching | ServiceState::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceState::Stopped => "stopped",
            ServiceState::Launching => "launching",
            ServiceState::Running => "running",
            ServiceState::Crashed => "crashed",
            ServiceState::StoppedPermanently => "stopped-permanently",
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceStatus
// ---------------------------------------------------------------------------

/// Point-in-time view of one supervised service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub kind: ServiceKind,
    pub state: ServiceState,
    /// OS pid of the live process, if any.
    pub pid: Option<u32>,
    /// Restart attempts since the last reset.
    pub restart_attempts: u32,
    /// Exit code of the previous process (`None` if killed or never exited).
    pub last_exit_code: Option<i32>,
    /// Advisory: the current process has passed a liveness probe.
    pub ready: bool,
}

impl ServiceStatus {
    pub fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            state: ServiceState::Stopped,
            pid: None,
            restart_attempts: 0,
            last_exit_code: None,
            ready: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
