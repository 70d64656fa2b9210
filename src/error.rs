//! Error types for the voicebot

use thiserror::Error;

/// Result type alias for voicebot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voicebot
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, bad value)
    #[error("configuration error: {0}")]
    Config(String),

    /// Query was empty after trimming
    #[error("query must not be empty")]
    EmptyQuery,

    /// Interaction log could not be written
    #[error("storage error: {0}")]
    Storage(String),

    /// LLM completion error
    #[error("completion error: {0}")]
    Completion(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
