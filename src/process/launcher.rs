//! Process Launcher: spawns a supervised child and exposes its lifecycle.
//!
//! [`ProcessLauncher::launch`] returns a [`ProcessHandle`] whose
//! [`wait`](ProcessHandle::wait) future resolves with the exit code (or
//! `None` when the child was killed by a signal).  A background watcher task
//! owns the `tokio::process::Child`, so the handle itself is cheap and the
//! exit is reaped even if nobody awaits it.
//!
//! ```text
//! launch() ──spawn──▶ Child ──▶ watcher task ──exit──▶ oneshot ──▶ handle.wait()
//!                       │                ▲
//!                       │                └──── kill signal (oneshot) ◀── handle.kill()
//!                       └─ stdout / stderr ──▶ forward_output ──▶ log
//! ```

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

use crate::config::{ServiceConfig, ServiceKind};

use super::output::forward_output;

// ---------------------------------------------------------------------------
// LaunchError
// ---------------------------------------------------------------------------

/// Errors raised before a child process exists.
///
/// Distinct from a post-start crash: a launch error means `spawn()` itself
/// failed and no exit code will ever be produced.
#[derive(Debug, Clone, Error)]
pub enum LaunchError {
    /// The executable could not be found on `PATH` or at the given path.
    #[error("executable not found: {0}")]
    NotFound(String),

    /// The executable exists but may not be run.
    #[error("permission denied launching {0}")]
    PermissionDenied(String),

    /// Any other OS error from `spawn()`.
    #[error("failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },
}

impl LaunchError {
    fn from_io(program: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => LaunchError::NotFound(program.to_string()),
            io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied(program.to_string()),
            _ => LaunchError::Spawn {
                program: program.to_string(),
                message: err.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// LaunchSpec
// ---------------------------------------------------------------------------

/// Fixed command line for one supervised process.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    /// Label used in log lines (`"synthesis"`, `"recognition"`).
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Build the server command line: `<program> <script> --port <port> [args…]`.
    pub fn for_service(kind: ServiceKind, config: &ServiceConfig) -> Self {
        let mut args = vec![
            config.script.display().to_string(),
            "--port".to_string(),
            config.port.to_string(),
        ];
        args.extend(config.args.iter().cloned());

        Self {
            label: kind.name().to_string(),
            program: config.program.clone(),
            args,
            working_dir: config.working_dir.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessExit
// ---------------------------------------------------------------------------

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, or `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub const KILLED: ProcessExit = ProcessExit { code: None };

    pub fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// `true` only for exit code `0`.
    pub fn is_clean(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl std::fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("killed by signal"),
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessHandle
// ---------------------------------------------------------------------------

/// Handle to one running child.
///
/// Dropping the handle kills the child.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    exit_rx: oneshot::Receiver<ProcessExit>,
    kill_tx: Option<oneshot::Sender<()>>,
    exited: Option<ProcessExit>,
}

impl ProcessHandle {
    /// Assemble a handle from its channels.
    ///
    /// `exit_rx` must receive exactly one [`ProcessExit`]; `kill_tx` fires
    /// (or is dropped) when the owner wants the process gone.  Custom
    /// [`Launcher`] implementations use this to plug in their own watcher.
    pub fn from_channels(
        pid: Option<u32>,
        exit_rx: oneshot::Receiver<ProcessExit>,
        kill_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            pid,
            exit_rx,
            kill_tx: Some(kill_tx),
            exited: None,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Send the kill signal.  Does not wait for the process to go away;
    /// await [`wait`](Self::wait) for that.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Resolve once the process has exited.
    ///
    /// Cancel-safe, and may be called again after it has resolved.
    pub async fn wait(&mut self) -> ProcessExit {
        if let Some(exit) = self.exited {
            return exit;
        }
        // A dropped sender means the watcher vanished; treat it as killed.
        let exit = (&mut self.exit_rx).await.unwrap_or(ProcessExit::KILLED);
        self.exited = Some(exit);
        exit
    }
}

// ---------------------------------------------------------------------------
// Launcher trait
// ---------------------------------------------------------------------------

/// Seam between the supervisor and the OS.
///
/// Must be called from within a tokio runtime.
pub trait Launcher: Send + Sync {
    fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHandle, LaunchError>;
}

/// Production launcher backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHandle, LaunchError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| LaunchError::from_io(&spec.program, e))?;
        let pid = child.id();

        log::info!(
            "process[{}]: started {} {} (pid {})",
            spec.label,
            spec.program,
            spec.args.join(" "),
            pid.map_or_else(|| "?".to_string(), |p| p.to_string())
        );

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, spec.label.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, spec.label.clone()));
        }

        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(watch_child(child, kill_rx, exit_tx, spec.label.clone()));

        Ok(ProcessHandle::from_channels(pid, exit_rx, kill_tx))
    }
}

/// Own `child` until it exits, killing it when `kill_rx` fires or its sender
/// is dropped.
async fn watch_child(
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    exit_tx: oneshot::Sender<ProcessExit>,
    label: String,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = kill_rx => {
            if let Err(e) = child.start_kill() {
                log::debug!("process[{label}]: kill failed (already exited?): {e}");
            }
            child.wait().await
        }
    };

    let exit = match status {
        Ok(status) => ProcessExit::from(status),
        Err(e) => {
            log::warn!("process[{label}]: failed to reap child: {e}");
            ProcessExit::KILLED
        }
    };
    log::info!("process[{label}]: exited ({exit})");
    let _ = exit_tx.send(exit);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
