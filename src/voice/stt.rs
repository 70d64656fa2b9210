//! Speech-to-text: Whisper transcription fed by the microphone

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::{Recognition, SpeechRecognizer};
use crate::{Error, Result};

const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes WAV audio with `OpenAI` Whisper
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl SpeechToText {
    /// Create a new Whisper client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }

    /// Transcribe WAV bytes to text
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(TRANSCRIPTIONS_URL)
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

/// Listens on the microphone and transcribes one phrase per call
pub struct MicrophoneRecognizer {
    capture: AudioCapture,
    stt: SpeechToText,
}

impl MicrophoneRecognizer {
    #[must_use]
    pub const fn new(capture: AudioCapture, stt: SpeechToText) -> Self {
        Self { capture, stt }
    }
}

#[async_trait(?Send)]
impl SpeechRecognizer for MicrophoneRecognizer {
    async fn listen(&mut self, timeout: Duration, phrase_time_limit: Duration) -> Recognition {
        let recorded = self
            .capture
            .record_phrase(timeout, phrase_time_limit)
            .await;

        let phrase = match recorded {
            Ok(Some(phrase)) => phrase,
            Ok(None) => return Recognition::Timeout,
            Err(e) => return Recognition::RecognitionError(format!("error capturing audio: {e}")),
        };
        tracing::debug!(samples = phrase.len(), "audio captured");

        let wav = match samples_to_wav(&phrase, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => return Recognition::RecognitionError(e.to_string()),
        };

        match self.stt.transcribe(&wav).await {
            Ok(text) => Recognition::from_transcript(&text),
            Err(e) => Recognition::RecognitionError(e.to_string()),
        }
    }
}
