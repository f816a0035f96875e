//! Configuration module for the inference supervisor.
//!
//! Provides `SupervisorConfig` (top-level settings), sub-configs for each
//! subsystem, `AppPaths` for cross-platform data directories, TOML
//! persistence via `SupervisorConfig::load` / `SupervisorConfig::save`, and
//! environment overrides via `SupervisorConfig::apply_env`.

pub mod env;
pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    FallbackConfig, HealthConfig, InvokerConfig, LivePathConfig, RestartConfig, ServiceConfig,
    ServiceKind, SupervisorConfig,
};
