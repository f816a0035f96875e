//! Restart Policy: decides what happens after a supervised process exits.
//!
//! | Exit                           | Counter          | Decision                 |
//! |--------------------------------|------------------|--------------------------|
//! | code `0`                       | reset to 0       | [`RestartDecision::Stop`] |
//! | non-zero / killed / launch err | `< max` → +1     | [`RestartDecision::Restart`] after backoff |
//! | non-zero / killed / launch err | `>= max`         | [`RestartDecision::GiveUp`] |
//!
//! Backoff for attempt `n` is `min(n * base_delay, max_delay)`, so delays are
//! non-decreasing and capped.  A successful health probe resets the counter
//! independently of exit handling.

use std::time::Duration;

use crate::config::RestartConfig;
use crate::process::ProcessExit;

/// One scheduled relaunch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartAttempt {
    /// 1-based attempt index since the last reset.
    pub index: u32,
    /// Delay before relaunching.
    pub delay: Duration,
}

/// Outcome of [`RestartPolicy::on_exit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Clean shutdown; do not relaunch.
    Stop,
    /// Relaunch after `attempt.delay`.
    Restart(RestartAttempt),
    /// Cap reached; the service stays down and requests use the fallback.
    GiveUp { attempts: u32 },
}

/// Per-service restart bookkeeping.  Owned by the service actor only.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    max_restarts: u32,
    base_delay: Duration,
    max_delay: Duration,
    attempts: u32,
}

impl RestartPolicy {
    pub fn new(max_restarts: u32, config: &RestartConfig) -> Self {
        Self {
            max_restarts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            attempts: 0,
        }
    }

    /// Restart attempts made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    /// Backoff for the `attempt`-th restart.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt).min(self.max_delay)
    }

    /// Record a process exit and decide whether to relaunch.
    pub fn on_exit(&mut self, exit: ProcessExit) -> RestartDecision {
        if exit.is_clean() {
            self.attempts = 0;
            return RestartDecision::Stop;
        }
        self.on_failure()
    }

    /// Record a failed `spawn()`; treated exactly like a crash.
    pub fn on_launch_failure(&mut self) -> RestartDecision {
        self.on_failure()
    }

    /// A liveness probe succeeded: sustained uptime counts as recovery.
    pub fn on_healthy(&mut self) {
        self.attempts = 0;
    }

    fn on_failure(&mut self) -> RestartDecision {
        if self.attempts >= self.max_restarts {
            return RestartDecision::GiveUp {
                attempts: self.attempts,
            };
        }
        self.attempts += 1;
        RestartDecision::Restart(RestartAttempt {
            index: self.attempts,
            delay: self.backoff(self.attempts),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
