//! Configuration management for the voicebot

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::{Error, Result};
use file::VoicebotConfigFile;

/// Default Groq OpenAI-compatible endpoint
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default completion model
pub const DEFAULT_LLM_MODEL: &str = "llama-3.1-8b-instant";

/// Voicebot configuration
#[derive(Debug)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Path of the JSON interaction log
    pub log_file: PathBuf,

    /// Voice configuration
    pub voice: VoiceConfig,
}

/// LLM provider configuration
#[derive(Debug)]
pub struct LlmConfig {
    /// API key (from `GROQ_API_KEY`)
    pub api_key: SecretString,

    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Model identifier
    pub model: String,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

/// Voice processing configuration
#[derive(Debug)]
pub struct VoiceConfig {
    /// `OpenAI` API key for Whisper STT and TTS
    pub openai_api_key: Option<SecretString>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// How long to wait for speech to begin
    pub listen_timeout: Duration,

    /// Maximum length of one captured phrase
    pub phrase_time_limit: Duration,
}

impl Config {
    /// Load configuration from the environment and the optional config file
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `GROQ_API_KEY` is not set anywhere
    pub fn load() -> Result<Self> {
        Self::from_sources(&file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// Environment values win over file values, which win over defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no API key is available
    pub fn from_sources(
        file: &VoicebotConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let api_key = env("GROQ_API_KEY")
            .or_else(|| file.llm.api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config("GROQ_API_KEY environment variable not set".to_string())
            })?;

        let llm = LlmConfig {
            api_key: SecretString::from(api_key),
            base_url: env("VOICEBOT_LLM_BASE_URL")
                .or_else(|| file.llm.base_url.clone())
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: env("VOICEBOT_MODEL")
                .or_else(|| file.llm.model.clone())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        };

        let server = ServerConfig {
            host: env("VOICEBOT_HOST")
                .or_else(|| env("FLASK_HOST"))
                .or_else(|| file.server.host.clone())
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env("VOICEBOT_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(file.server.port)
                .unwrap_or(5000),
            static_dir: env("VOICEBOT_STATIC_DIR")
                .map(PathBuf::from)
                .or_else(|| file.server.static_dir.clone()),
        };

        let log_file = log_file_from_sources(file, &env);

        let secs = |key: &str, from_file: Option<u64>, default: u64| {
            Duration::from_secs(
                env(key)
                    .and_then(|s| s.parse().ok())
                    .or(from_file)
                    .unwrap_or(default),
            )
        };

        let voice = VoiceConfig {
            openai_api_key: env("OPENAI_API_KEY")
                .or_else(|| file.voice.openai_api_key.clone())
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            stt_model: env("VOICEBOT_STT_MODEL")
                .or_else(|| file.voice.stt_model.clone())
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_model: env("VOICEBOT_TTS_MODEL")
                .or_else(|| file.voice.tts_model.clone())
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: env("VOICEBOT_TTS_VOICE")
                .or_else(|| file.voice.tts_voice.clone())
                .unwrap_or_else(|| "nova".to_string()),
            tts_speed: env("VOICEBOT_TTS_SPEED")
                .and_then(|s| s.parse().ok())
                .or(file.voice.tts_speed)
                .unwrap_or(1.0)
                .clamp(0.25, 4.0),
            listen_timeout: secs("VOICEBOT_LISTEN_TIMEOUT", file.voice.listen_timeout_secs, 10),
            phrase_time_limit: secs(
                "VOICEBOT_PHRASE_TIME_LIMIT",
                file.voice.phrase_time_limit_secs,
                15,
            ),
        };

        Ok(Self {
            llm,
            server,
            log_file,
            voice,
        })
    }
}

/// Resolve only the interaction log path; needs no credentials
#[must_use]
pub fn log_file() -> PathBuf {
    log_file_from_sources(&file::load_config_file(), |key| std::env::var(key).ok())
}

fn log_file_from_sources(
    file: &VoicebotConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    env("VOICEBOT_LOG_FILE")
        .map(PathBuf::from)
        .or_else(|| file.log.file.clone())
        .unwrap_or_else(default_log_file)
}

/// Default log location: `<data dir>/logs/user_queries.json`
///
/// Uses `~/.local/share/voicebot` on Linux
#[must_use]
pub fn default_log_file() -> PathBuf {
    directories::ProjectDirs::from("dev", "voicebot", "voicebot")
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().to_path_buf())
        .join("logs")
        .join("user_queries.json")
}
