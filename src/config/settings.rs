//! Supervisor settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ServiceKind
// ---------------------------------------------------------------------------

/// The two local inference capabilities the supervisor manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Text-to-speech server (`tts_server.py`).
    Synthesis,
    /// Speech-to-text server (`whisper_server.py`).
    Recognition,
}

impl ServiceKind {
    /// Both kinds, in boot order.
    pub const ALL: [ServiceKind; 2] = [ServiceKind::Synthesis, ServiceKind::Recognition];

    /// Short name used in log prefixes and status maps.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Synthesis => "synthesis",
            ServiceKind::Recognition => "recognition",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

/// Launch and routing settings for one supervised service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// When `false` the service is never launched; requests go straight to
    /// a connection failure and therefore to the fallback script.
    pub enabled: bool,
    /// Interpreter or executable (e.g. `"python3"`).
    pub program: String,
    /// Server script passed as the first argument to `program`.
    pub script: PathBuf,
    /// Extra arguments appended after the script and the `--port` pair.
    pub args: Vec<String>,
    /// Working directory for the child.  `None` inherits ours.
    pub working_dir: Option<PathBuf>,
    /// Host the service binds to.
    pub host: String,
    /// TCP port the service listens on.
    pub port: u16,
    /// Liveness endpoint path.  `None` means the service exposes none and the
    /// prober only checks that the process is still alive.
    pub health_path: Option<String>,
    /// Delay before the first liveness probe after each (re)launch.
    pub warmup_ms: u64,
    /// Restart cap; once exceeded the service stays down (fallback-only).
    pub max_restarts: u32,
}

impl ServiceConfig {
    fn synthesis_default() -> Self {
        Self {
            enabled: true,
            program: "python3".into(),
            script: PathBuf::from("src/tts_server.py"),
            args: Vec::new(),
            working_dir: None,
            host: "127.0.0.1".into(),
            port: 8765,
            health_path: Some("/health".into()),
            warmup_ms: 15_000,
            max_restarts: 5,
        }
    }

    fn recognition_default() -> Self {
        Self {
            enabled: true,
            program: "python3".into(),
            script: PathBuf::from("src/whisper_server.py"),
            args: Vec::new(),
            working_dir: None,
            host: "127.0.0.1".into(),
            port: 8766,
            health_path: Some("/health".into()),
            warmup_ms: 5_000,
            max_restarts: 5,
        }
    }

    /// Base URL of the service, e.g. `http://127.0.0.1:8765`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Full liveness URL, or `None` when the service has no endpoint.
    pub fn health_url(&self) -> Option<String> {
        self.health_path
            .as_deref()
            .map(|path| format!("{}{}", self.base_url(), path))
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

// ---------------------------------------------------------------------------
// RestartConfig / HealthConfig
// ---------------------------------------------------------------------------

/// Backoff parameters shared by all services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartConfig {
    /// Delay unit: attempt `n` waits `n * base_delay_ms`.
    pub base_delay_ms: u64,
    /// Ceiling on any single restart delay.
    pub max_delay_ms: u64,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 2_000,
            max_delay_ms: 10_000,
        }
    }
}

/// Liveness probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Bound on a single `GET /health` request.
    pub timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { timeout_ms: 5_000 }
    }
}

// ---------------------------------------------------------------------------
// InvokerConfig
// ---------------------------------------------------------------------------

/// Timeout and retry policy for the live (persistent service) path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivePathConfig {
    /// Bound on a single live call.
    pub timeout_secs: u64,
    /// Extra live attempts made after a timeout before falling back.
    pub timeout_retries: u32,
    /// Pause before each extra live attempt.
    pub retry_delay_ms: u64,
}

impl LivePathConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// One-shot fallback script settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Interpreter used to run both scripts.
    pub program: String,
    /// `tts_synthesize.py`: `<text> <model> <output_dir>`.
    pub synthesis_script: PathBuf,
    /// `whisper_transcribe.py`: `<audio_path> <model> <language>`.
    pub transcription_script: PathBuf,
    /// Working directory for script runs.  `None` inherits ours.
    pub working_dir: Option<PathBuf>,
    /// Bound on a whole script run, model load included.
    pub timeout_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            synthesis_script: PathBuf::from("src/tts_synthesize.py"),
            transcription_script: PathBuf::from("src/whisper_transcribe.py"),
            working_dir: None,
            timeout_secs: 300,
        }
    }
}

impl FallbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the dual-path invoker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokerConfig {
    pub synthesis: LivePathConfig,
    pub transcription: LivePathConfig,
    pub fallback: FallbackConfig,
    /// Voice model used when a request does not name one.
    pub default_voice_model: String,
    /// Directory synthesised audio is written to.
    pub output_dir: PathBuf,
    /// Whisper model used when a request does not name one.
    pub default_transcription_model: String,
    /// Spoken language required when a request does not name one.
    pub default_language: String,
    /// Reject mostly non-Latin synthesis text before any call.  When `false`
    /// the service (or script) is the authority on language support.
    pub precheck_language: bool,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            synthesis: LivePathConfig {
                timeout_secs: 120,
                timeout_retries: 1,
                retry_delay_ms: 1_000,
            },
            transcription: LivePathConfig {
                timeout_secs: 60,
                timeout_retries: 0,
                retry_delay_ms: 0,
            },
            fallback: FallbackConfig::default(),
            default_voice_model: "tts_models/en/ljspeech/tacotron2-DDC".into(),
            output_dir: AppPaths::new().tts_output_dir,
            default_transcription_model: "small.en".into(),
            default_language: "en".into(),
            precheck_language: false,
        }
    }
}

// ---------------------------------------------------------------------------
// SupervisorConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use inference_supervisor::config::SupervisorConfig;
///
/// // Load (returns Default when file is missing), then apply env overrides.
/// let mut config = SupervisorConfig::load().unwrap();
/// config.apply_env();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub synthesis: ServiceConfig,
    pub recognition: ServiceConfig,
    pub restart: RestartConfig,
    pub health: HealthConfig,
    pub invoker: InvokerConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            synthesis: ServiceConfig::synthesis_default(),
            recognition: ServiceConfig::recognition_default(),
            restart: RestartConfig::default(),
            health: HealthConfig::default(),
            invoker: InvokerConfig::default(),
        }
    }
}

impl SupervisorConfig {
    /// Service settings for `kind`.
    pub fn service(&self, kind: ServiceKind) -> &ServiceConfig {
        match kind {
            ServiceKind::Synthesis => &self.synthesis,
            ServiceKind::Recognition => &self.recognition,
        }
    }

    pub fn service_mut(&mut self, kind: ServiceKind) -> &mut ServiceConfig {
        match kind {
            ServiceKind::Synthesis => &mut self.synthesis,
            ServiceKind::Recognition => &mut self.recognition,
        }
    }

    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(SupervisorConfig::default())` when the file does not
    /// exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
