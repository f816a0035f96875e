//! Process Launcher module.
//!
//! Spawns supervised inference servers, forwards their output to the log and
//! delivers their exit as a future instead of a callback.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use inference_supervisor::config::{ServiceKind, SupervisorConfig};
//! use inference_supervisor::process::{LaunchSpec, Launcher, ProcessLauncher};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SupervisorConfig::default();
//!     let spec = LaunchSpec::for_service(ServiceKind::Recognition, &config.recognition);
//!
//!     let mut handle = ProcessLauncher.launch(&spec).expect("python3 not found");
//!     let exit = handle.wait().await;
//!     println!("whisper server ended: {exit}");
//! }
//! ```

pub mod launcher;
pub mod output;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use launcher::{LaunchError, LaunchSpec, Launcher, ProcessExit, ProcessHandle, ProcessLauncher};
pub use output::{classify_line, LineLevel};
