//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\inference-supervisor\
//!   macOS:   ~/Library/Application Support/inference-supervisor/
//!   Linux:   ~/.config/inference-supervisor/
//!
//! Data dir (synthesised audio):
//!   Windows: %LOCALAPPDATA%\inference-supervisor\
//!   macOS:   ~/Library/Application Support/inference-supervisor/
//!   Linux:   ~/.local/share/inference-supervisor/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory the synthesis service writes `.wav` files into.
    pub tts_output_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "inference-supervisor";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            tts_output_dir: data_dir.join("tts_output"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
