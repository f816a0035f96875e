//! Live path: JSON over HTTP to the persistent servers.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SupervisorConfig;

use super::failure::CallFailure;
use super::wire::{SynthesisCall, SynthesisReply, TranscriptionCall, TranscriptionReply};

/// Seam for the persistent-service calls.
#[async_trait]
pub trait LiveService: Send + Sync {
    async fn synthesize(&self, call: &SynthesisCall) -> Result<SynthesisReply, CallFailure>;
    async fn transcribe(&self, call: &TranscriptionCall) -> Result<TranscriptionReply, CallFailure>;
}

/// `reqwest` client for `POST /synthesize` and `POST /transcribe`.
#[derive(Clone)]
pub struct HttpServiceClient {
    client: reqwest::Client,
    synthesis_url: String,
    transcription_url: String,
    synthesis_timeout: Duration,
    transcription_timeout: Duration,
}

impl HttpServiceClient {
    pub fn new(
        synthesis_base: &str,
        recognition_base: &str,
        synthesis_timeout: Duration,
        transcription_timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            synthesis_url: format!("{}/synthesize", synthesis_base.trim_end_matches('/')),
            transcription_url: format!("{}/transcribe", recognition_base.trim_end_matches('/')),
            synthesis_timeout,
            transcription_timeout,
        }
    }

    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(
            &config.synthesis.base_url(),
            &config.recognition.base_url(),
            config.invoker.synthesis.timeout(),
            config.invoker.transcription.timeout(),
        )
    }

    async fn post<B, R>(&self, url: &str, body: &B, timeout: Duration) -> Result<R, CallFailure>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CallFailure::from_error_body(status.as_u16(), &text));
        }
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl LiveService for HttpServiceClient {
    async fn synthesize(&self, call: &SynthesisCall) -> Result<SynthesisReply, CallFailure> {
        self.post(&self.synthesis_url, call, self.synthesis_timeout)
            .await
    }

    async fn transcribe(&self, call: &TranscriptionCall) -> Result<TranscriptionReply, CallFailure> {
        self.post(&self.transcription_url, call, self.transcription_timeout)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
