//! Dual-Path Invoker: live service first, one-shot script on qualifying
//! failure.
//!
//! ```text
//! request ─▶ pre-checks ──reject──▶ UnsupportedInput
//!               │
//!               ▼
//!          live call ──ok──▶ normalize ─▶ result
//!               │ CallFailure::route()
//!               ├─ Surface ───────────▶ ServiceReportedError
//!               ├─ RetryThenFallback ─▶ retry (per path) ─┐
//!               └─ Fallback ──────────────────────────────┴▶ script ─▶ normalize ─▶ result
//!                                                              └─ fails ─▶ generic failure
//! ```
//!
//! Every request resolves to exactly one [`InvocationResult`], and the
//! script runs at most once per request.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{InvokerConfig, LivePathConfig, ServiceKind, SupervisorConfig};

use super::client::{HttpServiceClient, LiveService};
use super::failure::{CallFailure, Route};
use super::request::{InvocationRequest, SynthesisRequest, TranscriptionRequest};
use super::result::{FailureClass, InvocationFailure, InvocationResult};
use super::script::{FallbackRunner, ScriptFailure, ScriptRunner};
use super::text::{is_target_language, prepare_synthesis_text};
use super::wire::{SynthesisCall, SynthesisReply, TranscriptionCall, TranscriptionReply};

/// Request entry point.  Cheap to clone; clones share the same seams.
#[derive(Clone)]
pub struct DualPathInvoker {
    live: Arc<dyn LiveService>,
    fallback: Arc<dyn FallbackRunner>,
    config: Arc<InvokerConfig>,
}

impl DualPathInvoker {
    pub fn new(
        live: Arc<dyn LiveService>,
        fallback: Arc<dyn FallbackRunner>,
        config: InvokerConfig,
    ) -> Self {
        Self {
            live,
            fallback,
            config: Arc::new(config),
        }
    }

    /// HTTP client against the supervised services plus the configured scripts.
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(
            Arc::new(HttpServiceClient::from_config(config)),
            Arc::new(ScriptRunner::from_config(&config.invoker.fallback)),
            config.invoker.clone(),
        )
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        match request {
            InvocationRequest::Synthesis(request) => self.synthesize(request).await,
            InvocationRequest::Transcription(request) => self.transcribe(request).await,
        }
    }

    // -----------------------------------------------------------------------
    // Synthesis
    // -----------------------------------------------------------------------

    pub async fn synthesize(&self, request: SynthesisRequest) -> InvocationResult {
        let kind = ServiceKind::Synthesis;

        let Some(text) = prepare_synthesis_text(&request.text) else {
            log::info!("invoke[{kind}]: rejected, no speakable text after cleaning");
            return InvocationResult::failure(
                FailureClass::UnsupportedInput,
                "Text contains only unsupported characters",
            );
        };
        if self.config.precheck_language && !is_target_language(&text) {
            log::info!("invoke[{kind}]: rejected, text is not in the supported language");
            return InvocationResult::Failure(
                InvocationFailure::new(
                    FailureClass::UnsupportedInput,
                    "Speech synthesis is only available for English text",
                )
                .language_unsupported(),
            );
        }

        let call = SynthesisCall {
            text,
            model: request
                .model
                .unwrap_or_else(|| self.config.default_voice_model.clone()),
            output_dir: self.config.output_dir.display().to_string(),
        };

        let live = self
            .call_live(kind, &self.config.synthesis, || self.live.synthesize(&call))
            .await;
        match live {
            Ok(reply) => {
                log::info!("invoke[{kind}]: served by live service");
                reply.into_result()
            }
            Err(failure) => {
                self.after_live_failure::<SynthesisReply, _>(
                    kind,
                    failure,
                    call.script_args(),
                    SynthesisReply::into_result,
                )
                .await
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transcription
    // -----------------------------------------------------------------------

    /// Transcribe, then delete the input file whatever the outcome.
    pub async fn transcribe(&self, request: TranscriptionRequest) -> InvocationResult {
        let audio_path = request.audio_path.clone();
        let result = self.transcribe_file(request).await;
        remove_input(&audio_path).await;
        result
    }

    async fn transcribe_file(&self, request: TranscriptionRequest) -> InvocationResult {
        let kind = ServiceKind::Recognition;

        if !tokio::fs::try_exists(&request.audio_path)
            .await
            .unwrap_or(false)
        {
            log::warn!(
                "invoke[{kind}]: audio file missing: {}",
                request.audio_path.display()
            );
            return InvocationResult::failure(FailureClass::UnsupportedInput, "Audio file not found");
        }

        // Both the JSON body and the script argument need the exact path.
        let Some(audio_path) = request.audio_path.to_str() else {
            log::warn!(
                "invoke[{kind}]: audio path is not valid UTF-8: {}",
                request.audio_path.display()
            );
            return InvocationResult::failure(
                FailureClass::UnsupportedInput,
                "Audio file name is not supported",
            );
        };

        let call = TranscriptionCall {
            audio_path: audio_path.to_string(),
            model: request
                .model
                .unwrap_or_else(|| self.config.default_transcription_model.clone()),
            language: request
                .language
                .unwrap_or_else(|| self.config.default_language.clone()),
        };

        let live = self
            .call_live(kind, &self.config.transcription, || self.live.transcribe(&call))
            .await;
        match live {
            Ok(reply) => {
                log::info!("invoke[{kind}]: served by live service");
                reply.into_result()
            }
            Err(failure) => {
                self.after_live_failure::<TranscriptionReply, _>(
                    kind,
                    failure,
                    call.script_args(),
                    TranscriptionReply::into_result,
                )
                .await
            }
        }
    }

    // -----------------------------------------------------------------------
    // Shared plumbing
    // -----------------------------------------------------------------------

    /// One live call, retried on timeout as often as `path` allows.
    async fn call_live<T, F, Fut>(
        &self,
        kind: ServiceKind,
        path: &LivePathConfig,
        mut call: F,
    ) -> Result<T, CallFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallFailure>>,
    {
        let mut retries = 0;
        loop {
            match call().await {
                Err(CallFailure::Timeout) if retries < path.timeout_retries => {
                    retries += 1;
                    log::warn!(
                        "invoke[{kind}]: live call timed out, retry {retries}/{}",
                        path.timeout_retries
                    );
                    tokio::time::sleep(path.retry_delay()).await;
                }
                other => return other,
            }
        }
    }

    async fn after_live_failure<R, N>(
        &self,
        kind: ServiceKind,
        failure: CallFailure,
        args: Vec<String>,
        normalize: N,
    ) -> InvocationResult
    where
        R: DeserializeOwned,
        N: FnOnce(R) -> InvocationResult,
    {
        match failure.route() {
            Route::Surface => {
                log::warn!("invoke[{kind}]: live service rejected request: {failure}");
                surfaced(kind, failure)
            }
            Route::Fallback | Route::RetryThenFallback => {
                log::warn!("invoke[{kind}]: live call failed ({failure}), using fallback script");
                match self.fallback.run(kind, args).await {
                    Ok(value) => {
                        log::info!("invoke[{kind}]: served by fallback script");
                        decode_script_result(kind, value).map_or_else(|f| f, normalize)
                    }
                    Err(script) => {
                        log::error!(
                            "invoke[{kind}]: fallback failed after live failure ({failure}): {script}"
                        );
                        fallback_failure(kind, &script)
                    }
                }
            }
        }
    }
}

fn unavailable_message(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Synthesis => "Speech synthesis is temporarily unavailable",
        ServiceKind::Recognition => "Transcription is temporarily unavailable",
    }
}

fn failed_message(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Synthesis => "Speech synthesis failed",
        ServiceKind::Recognition => "Transcription failed",
    }
}

fn surfaced(kind: ServiceKind, failure: CallFailure) -> InvocationResult {
    let (details, language_unsupported) = match failure {
        CallFailure::ServiceError {
            message,
            language_unsupported,
            ..
        } => (message, language_unsupported),
        other => (other.to_string(), false),
    };
    InvocationResult::Failure(InvocationFailure {
        class: FailureClass::ServiceReportedError,
        error: failed_message(kind).to_string(),
        details: Some(details),
        language_unsupported,
    })
}

fn fallback_failure(kind: ServiceKind, failure: &ScriptFailure) -> InvocationResult {
    let class = match failure {
        ScriptFailure::Timeout(_) => FailureClass::Timeout,
        ScriptFailure::Spawn { .. } | ScriptFailure::NonZeroExit { .. } | ScriptFailure::NoJson => {
            FailureClass::ServiceUnavailable
        }
    };
    InvocationResult::failure(class, unavailable_message(kind))
}

fn decode_script_result<R: DeserializeOwned>(
    kind: ServiceKind,
    value: Value,
) -> Result<R, InvocationResult> {
    serde_json::from_value(value).map_err(|e| {
        log::error!("invoke[{kind}]: script result has unexpected shape: {e}");
        InvocationResult::failure(FailureClass::ServiceUnavailable, unavailable_message(kind))
    })
}

/// Best-effort removal of a consumed upload.
async fn remove_input(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::debug!("invoke: deleted input {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("invoke: input already gone: {}", path.display())
        }
        Err(e) => log::warn!("invoke: failed to delete input {}: {e}", path.display()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::invoke::result::{Payload, SpeechPayload};

    type Reply = Result<Value, CallFailure>;

    /// Live service that replays queued replies, then repeats `default`.
    struct FakeLive {
        queued: Mutex<VecDeque<Reply>>,
        default: Reply,
        synth_calls: AtomicUsize,
        transcribe_calls: AtomicUsize,
        last_synthesis: Mutex<Option<SynthesisCall>>,
    }

    impl FakeLive {
        fn new(default: Reply) -> Arc<Self> {
            Self::queued(Vec::new(), default)
        }

        fn queued(queued: Vec<Reply>, default: Reply) -> Arc<Self> {
            Arc::new(Self {
                queued: Mutex::new(queued.into()),
                default,
                synth_calls: AtomicUsize::new(0),
                transcribe_calls: AtomicUsize::new(0),
                last_synthesis: Mutex::new(None),
            })
        }

        fn next<R: DeserializeOwned>(&self) -> Result<R, CallFailure> {
            let reply = self
                .queued
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default.clone());
            reply.and_then(|v| serde_json::from_value(v).map_err(|e| CallFailure::Decode(e.to_string())))
        }

        fn calls(&self) -> usize {
            self.synth_calls.load(Ordering::SeqCst) + self.transcribe_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LiveService for FakeLive {
        async fn synthesize(&self, call: &SynthesisCall) -> Result<SynthesisReply, CallFailure> {
            self.synth_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_synthesis.lock().unwrap() = Some(call.clone());
            tokio::task::yield_now().await;
            self.next()
        }

        async fn transcribe(&self, _call: &TranscriptionCall) -> Result<TranscriptionReply, CallFailure> {
            self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.next()
        }
    }

    struct FakeScript {
        reply: Result<Value, ScriptFailure>,
        calls: AtomicUsize,
        last_args: Mutex<Vec<String>>,
    }

    impl FakeScript {
        fn new(reply: Result<Value, ScriptFailure>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_args: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FallbackRunner for FakeScript {
        async fn run(&self, _kind: ServiceKind, args: Vec<String>) -> Result<Value, ScriptFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_args.lock().unwrap() = args;
            self.reply.clone()
        }
    }

    fn speech_json() -> Value {
        json!({"success": true, "audio_path": "/out/tts_1.wav", "file_size": 2048, "cached": false})
    }

    fn transcript_json() -> Value {
        json!({"success": true, "text": "hello world", "language": "en",
               "segments": [{"start": 0.0, "end": 1.0, "text": "hello world"}]})
    }

    fn config() -> InvokerConfig {
        let mut config = InvokerConfig::default();
        config.output_dir = PathBuf::from("/out");
        config.synthesis.retry_delay_ms = 1;
        config
    }

    fn invoker(live: &Arc<FakeLive>, script: &Arc<FakeScript>, config: InvokerConfig) -> DualPathInvoker {
        DualPathInvoker::new(live.clone(), script.clone(), config)
    }

    fn audio_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("upload.webm");
        std::fs::write(&path, b"webm").expect("write upload");
        path
    }

    #[tokio::test]
    async fn healthy_live_service_never_uses_fallback() {
        let live = FakeLive::new(Ok(speech_json()));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        for _ in 0..5 {
            let result = invoker.synthesize(SynthesisRequest::new("Hello there")).await;
            assert!(result.is_ok());
        }
        assert_eq!(live.calls(), 5);
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn refused_connection_falls_back_once_per_request() {
        let live = FakeLive::new(Err(CallFailure::ConnectionRefused));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        for n in 1..=3 {
            let result = invoker.synthesize(SynthesisRequest::new("Hello there")).await;
            assert!(result.is_ok());
            assert_eq!(script.calls(), n);
        }
        assert_eq!(live.calls(), 3);
    }

    #[tokio::test]
    async fn script_receives_prepared_text_and_defaults() {
        let live = FakeLive::new(Err(CallFailure::ConnectionRefused));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        invoker
            .synthesize(SynthesisRequest::new("  Hello   there 👋 "))
            .await;

        assert_eq!(
            *script.last_args.lock().unwrap(),
            vec![
                "Hello there".to_string(),
                "tts_models/en/ljspeech/tacotron2-DDC".to_string(),
                "/out".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn unsupported_language_reply_is_surfaced_without_fallback() {
        let live = FakeLive::new(Err(CallFailure::ServiceError {
            status: 400,
            message: "TTS is only available for English text.".into(),
            language_unsupported: true,
        }));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        let result = invoker.synthesize(SynthesisRequest::new("Привет, как дела?")).await;

        let failure = result.failure_ref().expect("failure");
        assert_eq!(failure.class, FailureClass::ServiceReportedError);
        assert!(failure.language_unsupported);
        assert_eq!(
            failure.details.as_deref(),
            Some("TTS is only available for English text.")
        );
        assert_eq!(live.calls(), 1);
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn success_false_reply_is_not_retried_on_script() {
        let live = FakeLive::new(Ok(json!({"success": false, "error": "model crashed"})));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        let result = invoker.synthesize(SynthesisRequest::new("Hello")).await;

        assert_eq!(
            result.failure_ref().map(|f| f.class),
            Some(FailureClass::ServiceReportedError)
        );
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn emoji_only_text_makes_no_calls() {
        let live = FakeLive::new(Ok(speech_json()));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        let result = invoker.synthesize(SynthesisRequest::new("🎉 🚀 ✨")).await;

        assert_eq!(
            result.failure_ref().map(|f| f.class),
            Some(FailureClass::UnsupportedInput)
        );
        assert_eq!(live.calls(), 0);
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn language_precheck_rejects_before_any_call() {
        let live = FakeLive::new(Ok(speech_json()));
        let script = FakeScript::new(Ok(speech_json()));
        let mut cfg = config();
        cfg.precheck_language = true;
        let invoker = invoker(&live, &script, cfg);

        let result = invoker.synthesize(SynthesisRequest::new("Привет, как дела?")).await;

        let failure = result.failure_ref().expect("failure");
        assert_eq!(failure.class, FailureClass::UnsupportedInput);
        assert!(failure.language_unsupported);
        assert_eq!(live.calls(), 0);
        assert_eq!(script.calls(), 0);

        assert!(invoker.synthesize(SynthesisRequest::new("Hello")).await.is_ok());
    }

    #[tokio::test]
    async fn synthesis_timeout_is_retried_before_fallback() {
        let live = FakeLive::queued(vec![Err(CallFailure::Timeout)], Ok(speech_json()));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        let result = invoker.synthesize(SynthesisRequest::new("Hello")).await;

        assert!(result.is_ok());
        assert_eq!(live.calls(), 2);
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn persistent_synthesis_timeout_runs_script_once() {
        let live = FakeLive::new(Err(CallFailure::Timeout));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        let result = invoker.synthesize(SynthesisRequest::new("Hello")).await;

        assert!(result.is_ok());
        assert_eq!(live.calls(), 2);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn transcription_timeout_goes_straight_to_fallback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let live = FakeLive::new(Err(CallFailure::Timeout));
        let script = FakeScript::new(Ok(transcript_json()));
        let invoker = invoker(&live, &script, config());

        let result = invoker
            .transcribe(TranscriptionRequest::new(audio_file(&dir)))
            .await;

        assert!(result.is_ok());
        assert_eq!(live.calls(), 1);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn fallback_failure_is_generic() {
        let live = FakeLive::new(Err(CallFailure::ConnectionRefused));
        let script = FakeScript::new(Err(ScriptFailure::NonZeroExit {
            code: Some(1),
            tail: "Traceback: ModuleNotFoundError: No module named 'TTS'".into(),
        }));
        let invoker = invoker(&live, &script, config());

        let result = invoker.synthesize(SynthesisRequest::new("Hello")).await;

        let failure = result.failure_ref().expect("failure");
        assert_eq!(failure.class, FailureClass::ServiceUnavailable);
        assert_eq!(failure.error, "Speech synthesis is temporarily unavailable");
        assert!(failure.details.is_none());
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn fallback_timeout_is_reported_as_timeout() {
        let live = FakeLive::new(Err(CallFailure::ConnectionRefused));
        let script = FakeScript::new(Err(ScriptFailure::Timeout(Duration::from_secs(300))));
        let invoker = invoker(&live, &script, config());

        let result = invoker.synthesize(SynthesisRequest::new("Hello")).await;

        assert_eq!(result.failure_ref().map(|f| f.class), Some(FailureClass::Timeout));
    }

    #[tokio::test]
    async fn both_paths_normalize_to_the_same_result() {
        let script = FakeScript::new(Ok(speech_json()));
        let via_live = invoker(&FakeLive::new(Ok(speech_json())), &script, config())
            .synthesize(SynthesisRequest::new("Hello"))
            .await;
        let via_script = invoker(
            &FakeLive::new(Err(CallFailure::ConnectionRefused)),
            &script,
            config(),
        )
        .synthesize(SynthesisRequest::new("Hello"))
        .await;

        assert_eq!(via_live, via_script);
        assert_eq!(
            via_live,
            InvocationResult::Success(Payload::Speech(SpeechPayload {
                audio_path: PathBuf::from("/out/tts_1.wav"),
                file_size: 2048,
                cached: false,
            }))
        );
    }

    #[tokio::test]
    async fn malformed_script_result_is_unavailable() {
        let live = FakeLive::new(Err(CallFailure::ConnectionRefused));
        let script = FakeScript::new(Ok(json!({"success": "yes"})));
        let invoker = invoker(&live, &script, config());

        let result = invoker.synthesize(SynthesisRequest::new("Hello")).await;

        assert_eq!(
            result.failure_ref().map(|f| f.class),
            Some(FailureClass::ServiceUnavailable)
        );
    }

    #[tokio::test]
    async fn input_file_is_deleted_on_both_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = FakeScript::new(Ok(transcript_json()));

        let path = audio_file(&dir);
        let result = invoker(&FakeLive::new(Ok(transcript_json())), &script, config())
            .transcribe(TranscriptionRequest::new(&path))
            .await;
        assert!(result.is_ok());
        assert!(!path.exists());

        let path = audio_file(&dir);
        let result = invoker(
            &FakeLive::new(Err(CallFailure::ConnectionRefused)),
            &script,
            config(),
        )
        .transcribe(TranscriptionRequest::new(&path))
        .await;
        assert!(result.is_ok());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn input_file_is_deleted_on_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = audio_file(&dir);
        let live = FakeLive::new(Err(CallFailure::ConnectionRefused));
        let script = FakeScript::new(Err(ScriptFailure::NoJson));

        let result = invoker(&live, &script, config())
            .transcribe(TranscriptionRequest::new(&path))
            .await;

        assert!(!result.is_ok());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_audio_makes_no_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let live = FakeLive::new(Ok(transcript_json()));
        let script = FakeScript::new(Ok(transcript_json()));
        let invoker = invoker(&live, &script, config());

        let result = invoker
            .transcribe(TranscriptionRequest::new(dir.path().join("gone.webm")))
            .await;

        assert_eq!(
            result.failure_ref().map(|f| f.class),
            Some(FailureClass::UnsupportedInput)
        );
        assert_eq!(live.calls(), 0);
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn transcription_passes_model_and_language_to_script() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = audio_file(&dir);
        let live = FakeLive::new(Err(CallFailure::ConnectionRefused));
        let script = FakeScript::new(Ok(transcript_json()));

        invoker(&live, &script, config())
            .invoke(
                TranscriptionRequest::new(&path)
                    .with_model("base.en")
                    .into(),
            )
            .await;

        assert_eq!(
            *script.last_args.lock().unwrap(),
            vec![path.display().to_string(), "base.en".to_string(), "en".to_string()]
        );
    }

    #[tokio::test]
    async fn concurrent_requests_each_resolve_once() {
        let live = FakeLive::new(Err(CallFailure::ConnectionRefused));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let invoker = invoker.clone();
                tokio::spawn(async move {
                    invoker
                        .synthesize(SynthesisRequest::new(format!("Sentence number {i}")))
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.expect("request task").is_ok());
        }
        assert_eq!(live.calls(), 16);
        assert_eq!(script.calls(), 16);
    }

    #[tokio::test]
    async fn pictograph_only_text_makes_no_calls() {
        let live = FakeLive::new(Ok(speech_json()));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        for text in ["🎉🎊", "⭐⏰", "🀄🃏", "🅰️🆎"] {
            let result = invoker.synthesize(SynthesisRequest::new(text)).await;
            assert_eq!(
                result.failure_ref().map(|f| f.class),
                Some(FailureClass::UnsupportedInput),
                "{text:?}"
            );
        }
        assert_eq!(live.calls(), 0);
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn live_reply_without_success_falls_back() {
        let live = FakeLive::new(Ok(json!({"status": "ok"})));
        let script = FakeScript::new(Ok(speech_json()));
        let invoker = invoker(&live, &script, config());

        let result = invoker.synthesize(SynthesisRequest::new("Hello")).await;

        assert!(result.is_ok());
        assert_eq!(live.calls(), 1);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn script_reply_without_success_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let live = FakeLive::new(Err(CallFailure::ConnectionRefused));
        let script = FakeScript::new(Ok(json!({})));

        let result = invoker(&live, &script, config())
            .transcribe(TranscriptionRequest::new(audio_file(&dir)))
            .await;

        let failure = result.failure_ref().expect("failure");
        assert_eq!(failure.class, FailureClass::ServiceUnavailable);
        assert!(failure.details.is_none());
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn requests_during_recovery_resolve_on_either_path() {
        // The first eight live calls hit a service that is still restarting;
        // after that it answers normally.
        let refusals = (0..8).map(|_| Err(CallFailure::ConnectionRefused)).collect();
        let live = FakeLive::queued(refusals, Ok(speech_json()));
        let script = FakeScript::new(Ok(json!({
            "success": true, "audio_path": "/out/tts_script.wav", "file_size": 1024
        })));
        let invoker = invoker(&live, &script, config());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let invoker = invoker.clone();
                tokio::spawn(async move {
                    invoker
                        .synthesize(SynthesisRequest::new(format!("Sentence number {i}")))
                        .await
                })
            })
            .collect();

        let (mut live_served, mut script_served) = (0, 0);
        for task in tasks {
            match task.await.expect("request task") {
                InvocationResult::Success(Payload::Speech(speech))
                    if speech.audio_path == PathBuf::from("/out/tts_1.wav") =>
                {
                    live_served += 1
                }
                InvocationResult::Success(Payload::Speech(speech))
                    if speech.audio_path == PathBuf::from("/out/tts_script.wav") =>
                {
                    script_served += 1
                }
                other => panic!("unexpected result {other:?}"),
            }
        }
        assert_eq!((live_served, script_served), (8, 8));
        assert_eq!(live.calls(), 16);
        assert_eq!(script.calls(), 8);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_audio_path_is_rejected_and_removed() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(OsStr::from_bytes(b"rec\xff.webm"));
        if std::fs::write(&path, b"webm").is_err() {
            // Filesystem refuses non-UTF-8 names; nothing to check.
            return;
        }
        let live = FakeLive::new(Ok(transcript_json()));
        let script = FakeScript::new(Ok(transcript_json()));

        let result = invoker(&live, &script, config())
            .transcribe(TranscriptionRequest::new(&path))
            .await;

        assert_eq!(
            result.failure_ref().map(|f| f.class),
            Some(FailureClass::UnsupportedInput)
        );
        assert_eq!(live.calls(), 0);
        assert_eq!(script.calls(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn explicit_model_reaches_live_call() {
        let live = FakeLive::new(Ok(speech_json()));
        let script = FakeScript::new(Ok(speech_json()));

        invoker(&live, &script, config())
            .synthesize(SynthesisRequest::new("Hello").with_model("tts_models/en/vctk/vits"))
            .await;

        let call = live.last_synthesis.lock().unwrap().clone().expect("live call");
        assert_eq!(call.model, "tts_models/en/vctk/vits");
        assert_eq!(call.output_dir, "/out");
    }
}
