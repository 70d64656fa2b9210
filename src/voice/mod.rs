//! Voice processing module
//!
//! Handles microphone capture, utterance detection, Whisper transcription,
//! speech synthesis and playback. [`VoiceAssistant`] ties them to the
//! interaction pipeline.

mod assistant;
mod capture;
mod detector;
mod playback;
mod stt;
mod tts;

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub use assistant::{NOT_UNDERSTOOD_PROMPT, PROCESSING_ERROR_PROMPT, VoiceAssistant, VoiceOutcome};
pub use capture::{AudioCapture, SAMPLE_RATE, SampleBuffer, record_until, samples_to_wav};
pub use detector::{DetectorEvent, UtteranceDetector, rms};
pub use playback::{AudioPlayback, decode_mp3};
pub use stt::{MicrophoneRecognizer, SpeechToText};
pub use tts::{TextToSpeech, VoiceSpeaker};

/// Outcome of one listen attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// Speech was transcribed
    Heard(String),
    /// Audio was captured but contained no intelligible speech
    NoSpeechDetected,
    /// Capture or transcription failed
    RecognitionError(String),
    /// Nobody started speaking before the timeout
    Timeout,
}

impl Recognition {
    /// Classify a raw transcript; blank text means nothing was understood
    #[must_use]
    pub fn from_transcript(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            Self::NoSpeechDetected
        } else {
            Self::Heard(text.to_string())
        }
    }

    /// The transcribed text, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Heard(text) => Some(text),
            _ => None,
        }
    }
}

/// Source of spoken queries
#[async_trait(?Send)]
pub trait SpeechRecognizer {
    /// Listen for one phrase
    ///
    /// `timeout` bounds the wait for speech to begin and
    /// `phrase_time_limit` bounds the phrase length.
    async fn listen(&mut self, timeout: Duration, phrase_time_limit: Duration) -> Recognition;
}

/// Sink for spoken replies
#[async_trait(?Send)]
pub trait Speaker {
    /// Say `text` aloud, returning once playback finishes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&mut self, text: &str) -> Result<()>;
}
