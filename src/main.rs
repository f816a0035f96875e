//! Daemon entry point: Inference Supervisor.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`SupervisorConfig`] from disk (defaults on first run), then apply
//!    environment overrides.
//! 3. Create the [`tokio`] runtime.
//! 4. Start the [`SupervisorRoot`] (one actor per enabled service).
//! 5. Wait for Ctrl-C or SIGTERM.
//! 6. Stop the root: kill children, cancel pending restarts and probes.

use anyhow::{Context, Result};
use inference_supervisor::config::SupervisorConfig;
use inference_supervisor::supervisor::SupervisorRoot;

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Inference supervisor starting up");

    // 2. Configuration
    let mut config = SupervisorConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e:#}); using defaults");
        SupervisorConfig::default()
    });
    config.apply_env();

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async move {
        // 4. Supervised services
        let mut root = SupervisorRoot::new(config);
        root.start();
        for status in root.statuses() {
            log::info!("{}: {}", status.kind, status.state.label());
        }

        // 5. Termination signal
        shutdown_signal().await?;
        log::info!("Shutdown requested");

        // 6. Teardown
        root.stop().await;
        log::info!("Inference supervisor stopped");
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("failed to listen for Ctrl-C")?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")
}
