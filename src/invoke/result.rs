//! Normalized outcome of one request.
//!
//! Both execution paths produce exactly these types, so a caller cannot tell
//! which path served a request except from the log.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Coarse failure class surfaced to the host layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureClass {
    ServiceUnavailable,
    Timeout,
    ServiceReportedError,
    UnsupportedInput,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::ServiceUnavailable => "service-unavailable",
            FailureClass::Timeout => "timeout",
            FailureClass::ServiceReportedError => "service-reported-error",
            FailureClass::UnsupportedInput => "unsupported-input",
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request that produced no payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationFailure {
    pub class: FailureClass,
    /// Short, user-facing message.
    pub error: String,
    /// Service- or script-provided detail, if any.
    pub details: Option<String>,
    /// The input language is not supported by the model.
    pub language_unsupported: bool,
}

impl InvocationFailure {
    pub fn new(class: FailureClass, error: impl Into<String>) -> Self {
        Self {
            class,
            error: error.into(),
            details: None,
            language_unsupported: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn language_unsupported(mut self) -> Self {
        self.language_unsupported = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Synthesised audio written by the service or script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeechPayload {
    pub audio_path: PathBuf,
    pub file_size: u64,
    /// Served from the service's on-disk cache.
    pub cached: bool,
}

impl SpeechPayload {
    /// Read the audio bytes.
    pub async fn read_audio(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.audio_path).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptPayload {
    pub text: String,
    /// Detected language code.
    pub language: Option<String>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Speech(SpeechPayload),
    Transcript(TranscriptPayload),
}

// ---------------------------------------------------------------------------
// InvocationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success(Payload),
    Failure(InvocationFailure),
}

impl InvocationResult {
    pub fn failure(class: FailureClass, error: impl Into<String>) -> Self {
        InvocationResult::Failure(InvocationFailure::new(class, error))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, InvocationResult::Success(_))
    }

    pub fn failure_ref(&self) -> Option<&InvocationFailure> {
        match self {
            InvocationResult::Success(_) => None,
            InvocationResult::Failure(failure) => Some(failure),
        }
    }

    /// The object handed to the host request layer:
    /// `{ "ok": true, ...payload }` or
    /// `{ "ok": false, "error", "reason", "details"?, "language_unsupported"? }`.
    pub fn to_json(&self) -> Value {
        match self {
            InvocationResult::Success(payload) => {
                let mut body = match payload {
                    Payload::Speech(speech) => serde_json::to_value(speech),
                    Payload::Transcript(transcript) => serde_json::to_value(transcript),
                }
                .unwrap_or_else(|_| json!({}));
                if let Value::Object(map) = &mut body {
                    map.insert("ok".into(), Value::Bool(true));
                }
                body
            }
            InvocationResult::Failure(failure) => {
                let mut body = json!({
                    "ok": false,
                    "error": failure.error,
                    "reason": failure.class.as_str(),
                });
                if let Value::Object(map) = &mut body {
                    if let Some(details) = &failure.details {
                        map.insert("details".into(), Value::String(details.clone()));
                    }
                    if failure.language_unsupported {
                        map.insert("language_unsupported".into(), Value::Bool(true));
                    }
                }
                body
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
