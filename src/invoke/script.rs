//! Fallback path: one-shot script invocation.
//!
//! The scripts print incidental log lines and one JSON object; the object is
//! the only meaningful output.  A script exits non-zero on failure but still
//! prints its `{"success": false, ...}` object, which is accepted as a
//! service-reported error rather than a fallback failure.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;

use crate::config::{FallbackConfig, ServiceKind};
use crate::process::{classify_line, LineLevel};

/// Why the script path produced no usable JSON.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptFailure {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("script timed out after {0:?}")]
    Timeout(Duration),

    #[error("script exited with {code:?}: {tail}")]
    NonZeroExit { code: Option<i32>, tail: String },

    #[error("script produced no JSON result")]
    NoJson,
}

/// Seam for the script runner.
#[async_trait]
pub trait FallbackRunner: Send + Sync {
    /// Run the script for `kind` with positional `args`, returning its JSON.
    async fn run(&self, kind: ServiceKind, args: Vec<String>) -> Result<Value, ScriptFailure>;
}

/// Runs `<program> <script> <args…>` with a hard timeout.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    program: String,
    synthesis_script: PathBuf,
    transcription_script: PathBuf,
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn from_config(config: &FallbackConfig) -> Self {
        Self {
            program: config.program.clone(),
            synthesis_script: config.synthesis_script.clone(),
            transcription_script: config.transcription_script.clone(),
            working_dir: config.working_dir.clone(),
            timeout: config.timeout(),
        }
    }

    fn script_for(&self, kind: ServiceKind) -> &PathBuf {
        match kind {
            ServiceKind::Synthesis => &self.synthesis_script,
            ServiceKind::Recognition => &self.transcription_script,
        }
    }
}

#[async_trait]
impl FallbackRunner for ScriptRunner {
    async fn run(&self, kind: ServiceKind, args: Vec<String>) -> Result<Value, ScriptFailure> {
        let script = self.script_for(kind);
        let mut command = Command::new(&self.program);
        command
            .arg(script)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        log::info!("fallback[{kind}]: running {} {}", self.program, script.display());

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => return Err(ScriptFailure::Timeout(self.timeout)),
            Ok(Err(e)) => {
                return Err(ScriptFailure::Spawn {
                    program: self.program.clone(),
                    message: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            match classify_line(line) {
                LineLevel::Warn => log::warn!("fallback[{kind}]: {line}"),
                _ => log::debug!("fallback[{kind}]: {line}"),
            }
        }

        let json = extract_json(&stdout).or_else(|| extract_json(&stderr));
        accept(output.status.success(), output.status.code(), json, &stderr, &stdout)
    }
}

fn accept(
    exited_ok: bool,
    code: Option<i32>,
    json: Option<Value>,
    stderr: &str,
    stdout: &str,
) -> Result<Value, ScriptFailure> {
    match json {
        Some(value) if exited_ok || value.get("success") == Some(&Value::Bool(false)) => Ok(value),
        None if exited_ok => Err(ScriptFailure::NoJson),
        _ => {
            let source = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(ScriptFailure::NonZeroExit {
                code,
                tail: tail(source, 500),
            })
        }
    }
}

/// Last `max` characters of `text`, trimmed.
fn tail(text: &str, max: usize) -> String {
    let text = text.trim();
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max)).collect()
}

/// Pull the structured result out of mixed script output.
///
/// The last line that parses as a JSON object wins; failing that, the span
/// from the first `{` to the last `}` is tried.
pub fn extract_json(output: &str) -> Option<Value> {
    let by_line = output.lines().rev().find_map(|line| {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str::<Value>(line).ok().filter(Value::is_object)
    });
    if by_line.is_some() {
        return by_line;
    }

    let start = output.find('{')?;
    let end = output.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&output[start..=end])
        .ok()
        .filter(Value::is_object)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
