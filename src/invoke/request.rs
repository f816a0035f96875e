//! Inbound units of work.

use std::path::PathBuf;

/// Text to turn into speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    /// Voice model; the configured default when `None`.
    pub model: Option<String>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Audio file to transcribe.
///
/// The file is owned by the request: it is deleted once the request
/// completes, whichever path served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub audio_path: PathBuf,
    /// Whisper model; the configured default when `None`.
    pub model: Option<String>,
    /// Required spoken language; the configured default when `None`.
    pub language: Option<String>,
}

impl TranscriptionRequest {
    pub fn new(audio_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            model: None,
            language: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// One user-triggered request, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationRequest {
    Synthesis(SynthesisRequest),
    Transcription(TranscriptionRequest),
}

impl From<SynthesisRequest> for InvocationRequest {
    fn from(request: SynthesisRequest) -> Self {
        InvocationRequest::Synthesis(request)
    }
}

impl From<TranscriptionRequest> for InvocationRequest {
    fn from(request: TranscriptionRequest) -> Self {
        InvocationRequest::Transcription(request)
    }
}
