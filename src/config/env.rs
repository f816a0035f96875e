//! Environment-variable overrides applied on top of `settings.toml`.
//!
//! Values are only coerced to the target type; anything that fails to parse
//! is logged and ignored so a typo never prevents the supervisor from booting.

use std::str::FromStr;

use super::settings::{ServiceKind, SupervisorConfig};

/// Executable override applied to both services and both fallback scripts.
pub const PYTHON_PATH: &str = "PYTHON_PATH";

fn prefix(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Synthesis => "TTS",
        ServiceKind::Recognition => "WHISPER",
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("config: ignoring {key}={raw:?} (not a valid value)");
            None
        }
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        "" => None,
        other => {
            log::warn!("config: ignoring {key}={other:?} (expected true/false)");
            None
        }
    }
}

impl SupervisorConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the variable source.
    ///
    /// Recognised keys: `{TTS,WHISPER}_SERVER_PORT`, `{TTS,WHISPER}_WARMUP_MS`,
    /// `{TTS,WHISPER}_MAX_RESTARTS`, `{TTS,WHISPER}_SERVER_ENABLED` and
    /// [`PYTHON_PATH`].
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for kind in ServiceKind::ALL {
            let p = prefix(kind);
            let svc = self.service_mut(kind);

            if let Some(port) = parse_var::<u16>(&lookup, &format!("{p}_SERVER_PORT")) {
                svc.port = port;
            }
            if let Some(ms) = parse_var::<u64>(&lookup, &format!("{p}_WARMUP_MS")) {
                svc.warmup_ms = ms;
            }
            if let Some(max) = parse_var::<u32>(&lookup, &format!("{p}_MAX_RESTARTS")) {
                svc.max_restarts = max;
            }
            if let Some(enabled) = parse_flag(&lookup, &format!("{p}_SERVER_ENABLED")) {
                svc.enabled = enabled;
            }
        }

        if let Some(python) = lookup(PYTHON_PATH).filter(|s| !s.trim().is_empty()) {
            let python = python.trim().to_string();
            self.synthesis.program = python.clone();
            self.recognition.program = python.clone();
            self.invoker.fallback.program = python;
        }
    }
}
