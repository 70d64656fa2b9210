//! TOML configuration file loading
//!
//! Supports `~/.config/voicebot/config.toml` as a persistent config source.
//! All fields are optional; environment variables take precedence.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoicebotConfigFile {
    /// LLM configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Interaction log configuration
    #[serde(default)]
    pub log: LogFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    pub base_url: Option<String>,

    /// Model identifier (e.g. "llama-3.1-8b-instant")
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,

    /// Directory holding the web UI
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogFileConfig {
    /// Path of the JSON interaction log
    pub file: Option<PathBuf>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// `OpenAI` key for Whisper and TTS
    pub openai_api_key: Option<String>,
    pub stt_model: Option<String>,
    pub tts_model: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_speed: Option<f32>,

    /// Seconds to wait for speech to start
    pub listen_timeout_secs: Option<u64>,

    /// Maximum seconds of a single phrase
    pub phrase_time_limit_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VoicebotConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> VoicebotConfigFile {
    config_file_path().map_or_else(VoicebotConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from `path`
#[must_use]
pub fn load_from(path: &Path) -> VoicebotConfigFile {
    if !path.exists() {
        return VoicebotConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VoicebotConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VoicebotConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voicebot/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voicebot").join("config.toml"))
}
