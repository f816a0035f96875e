//! Wire shapes shared by the live endpoints and the fallback scripts.
//!
//! The persistent servers and the one-shot scripts answer with the same JSON
//! objects, so both paths decode into these types and normalize through the
//! same `into_result`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::result::{
    FailureClass, InvocationFailure, InvocationResult, Payload, Segment, SpeechPayload,
    TranscriptPayload,
};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /synthesize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisCall {
    pub text: String,
    pub model: String,
    pub output_dir: String,
}

impl SynthesisCall {
    /// `<text> <model> <output_dir>`
    pub fn script_args(&self) -> Vec<String> {
        vec![self.text.clone(), self.model.clone(), self.output_dir.clone()]
    }
}

/// Body of `POST /transcribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptionCall {
    pub audio_path: String,
    pub model: String,
    pub language: String,
}

impl TranscriptionCall {
    /// `<audio_path> <model> <language>`
    pub fn script_args(&self) -> Vec<String> {
        vec![
            self.audio_path.clone(),
            self.model.clone(),
            self.language.clone(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// `success` is required: a body without it is not a reply from the service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SynthesisReply {
    pub success: bool,
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub language_unsupported: bool,
}

impl SynthesisReply {
    pub fn into_result(self) -> InvocationResult {
        if !self.success {
            return reported_failure(
                "Speech synthesis failed",
                self.error,
                self.language_unsupported,
            );
        }
        match self.audio_path {
            Some(audio_path) => InvocationResult::Success(Payload::Speech(SpeechPayload {
                audio_path,
                file_size: self.file_size.unwrap_or(0),
                cached: self.cached,
            })),
            None => InvocationResult::failure(
                FailureClass::ServiceReportedError,
                "Speech synthesis returned no audio",
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranscriptionReply {
    pub success: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TranscriptionReply {
    pub fn into_result(self) -> InvocationResult {
        if !self.success {
            let mut result = reported_failure("Transcription failed", self.error, false);
            // Keep the detected language visible when the mismatch was the reason.
            if let (InvocationResult::Failure(failure), Some(language)) = (&mut result, self.language)
            {
                if failure.details.is_none() {
                    failure.details = Some(format!("detected language: {language}"));
                }
            }
            return result;
        }
        InvocationResult::Success(Payload::Transcript(TranscriptPayload {
            text: self.text.unwrap_or_default().trim().to_string(),
            language: self.language,
            segments: self.segments,
        }))
    }
}

fn reported_failure(
    error: &str,
    details: Option<String>,
    language_unsupported: bool,
) -> InvocationResult {
    InvocationResult::Failure(InvocationFailure {
        class: FailureClass::ServiceReportedError,
        error: error.to_string(),
        details,
        language_unsupported,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
