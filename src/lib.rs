//! Supervisor for local speech inference servers with a script fallback.
//!
//! - [`process`] spawns the servers and forwards their output to the log.
//! - [`supervisor`] restarts them with backoff and probes their health.
//! - [`invoke`] routes each request to a live server or a one-shot script.
//! - [`config`] holds the TOML settings and environment overrides.

pub mod config;
pub mod invoke;
pub mod process;
pub mod supervisor;
