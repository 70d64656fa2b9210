//! Voice interaction loop: listen, process, speak

use std::future::Future;
use std::time::Duration;

use super::{Recognition, Speaker, SpeechRecognizer};
use crate::exchange::{UserQuery, VOICE_INTERACTION};
use crate::pipeline::{InteractionPipeline, InteractionResult};

/// Spoken when recognition fails
pub const NOT_UNDERSTOOD_PROMPT: &str = "I'm sorry, I couldn't understand. Please try again.";

/// Spoken when the pipeline reports a failure
pub const PROCESSING_ERROR_PROMPT: &str = "I encountered an error. Please try again.";

/// Error reported when nothing usable was heard
const RECOGNITION_FAILED: &str = "Speech recognition failed";

/// Result of one voice turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    /// A query was heard and processed
    Completed(InteractionResult),
    /// Nothing usable was heard
    NotUnderstood(Recognition),
}

impl VoiceOutcome {
    /// Collapse into the pipeline result shape used by other front ends
    #[must_use]
    pub fn into_result(self) -> InteractionResult {
        match self {
            Self::Completed(result) => result,
            Self::NotUnderstood(_) => InteractionResult::Failure {
                error: RECOGNITION_FAILED.to_string(),
            },
        }
    }
}

/// Drives spoken conversations through the pipeline
pub struct VoiceAssistant {
    pipeline: InteractionPipeline,
    recognizer: Box<dyn SpeechRecognizer>,
    speaker: Option<Box<dyn Speaker>>,
    session_id: String,
    listen_timeout: Duration,
    phrase_time_limit: Duration,
}

impl VoiceAssistant {
    #[must_use]
    pub fn new(
        pipeline: InteractionPipeline,
        recognizer: Box<dyn SpeechRecognizer>,
        speaker: Option<Box<dyn Speaker>>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            recognizer,
            speaker,
            session_id: session_id.into(),
            listen_timeout: Duration::from_secs(10),
            phrase_time_limit: Duration::from_secs(15),
        }
    }

    /// Override the listen timeout and phrase limit
    #[must_use]
    pub fn with_timeouts(mut self, listen_timeout: Duration, phrase_time_limit: Duration) -> Self {
        self.listen_timeout = listen_timeout;
        self.phrase_time_limit = phrase_time_limit;
        self
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Listen for one query, answer it and speak the reply
    #[allow(clippy::future_not_send)]
    pub async fn interact_once(&mut self) -> VoiceOutcome {
        let recognition = self
            .recognizer
            .listen(self.listen_timeout, self.phrase_time_limit)
            .await;
        self.respond(recognition).await
    }

    /// Keep interacting until `shutdown` resolves
    ///
    /// Shutdown only interrupts listening. A query that has been heard is
    /// answered, logged and spoken before the loop exits.
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        tracing::info!(session_id = %self.session_id, "voice assistant started");

        loop {
            let recognition = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                recognition = self.recognizer.listen(self.listen_timeout, self.phrase_time_limit) => {
                    recognition
                }
            };

            let outcome = self.respond(recognition).await;
            tracing::debug!(?outcome, "voice turn finished");
        }
    }

    #[allow(clippy::future_not_send)]
    async fn respond(&mut self, recognition: Recognition) -> VoiceOutcome {
        let query = match recognition.text().map(UserQuery::parse) {
            Some(Ok(query)) => query,
            _ => {
                match &recognition {
                    Recognition::RecognitionError(detail) => {
                        tracing::warn!(detail, "speech recognition error");
                    }
                    other => tracing::info!(outcome = ?other, "nothing understood"),
                }
                self.say(NOT_UNDERSTOOD_PROMPT).await;
                return VoiceOutcome::NotUnderstood(recognition);
            }
        };

        tracing::info!(query = %query, "heard");
        let result = self
            .pipeline
            .process(&query, Some(self.session_id.as_str()), Some(VOICE_INTERACTION))
            .await;

        match result.response() {
            Some(reply) => self.say(reply).await,
            None => self.say(PROCESSING_ERROR_PROMPT).await,
        }

        VoiceOutcome::Completed(result)
    }

    async fn say(&mut self, text: &str) {
        let Some(speaker) = self.speaker.as_mut() else {
            return;
        };
        if let Err(e) = speaker.speak(text).await {
            tracing::error!(error = %e, "TTS failed");
        }
    }
}
