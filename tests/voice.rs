//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use voicebot::exchange::VOICE_INTERACTION;
use voicebot::voice::{
    DetectorEvent, NOT_UNDERSTOOD_PROMPT, PROCESSING_ERROR_PROMPT, Recognition, SAMPLE_RATE,
    Speaker, SpeechRecognizer, UtteranceDetector, VoiceAssistant, VoiceOutcome, samples_to_wav,
};
use voicebot::{Error, InteractionResult, Result};

mod common;
use common::{SlowProvider, TestEnv};

/// Recognizer that replays a script, then signals and waits forever
struct ScriptedRecognizer {
    script: VecDeque<Recognition>,
    timeouts: Arc<Mutex<Vec<(Duration, Duration)>>>,
    drained: Option<oneshot::Sender<()>>,
}

impl ScriptedRecognizer {
    fn new(script: impl IntoIterator<Item = Recognition>) -> Self {
        Self {
            script: script.into_iter().collect(),
            timeouts: Arc::default(),
            drained: None,
        }
    }
}

#[async_trait(?Send)]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn listen(&mut self, timeout: Duration, phrase_time_limit: Duration) -> Recognition {
        self.timeouts
            .lock()
            .unwrap()
            .push((timeout, phrase_time_limit));

        if let Some(next) = self.script.pop_front() {
            return next;
        }
        if let Some(tx) = self.drained.take() {
            let _ = tx.send(());
        }
        std::future::pending().await
    }
}

/// Speaker that records what it was asked to say
#[derive(Clone, Default)]
struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingSpeaker {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl Speaker for RecordingSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Tts("speaker unplugged".to_string()));
        }
        Ok(())
    }
}

fn assistant(
    env: &TestEnv,
    script: impl IntoIterator<Item = Recognition>,
    speaker: &RecordingSpeaker,
) -> VoiceAssistant {
    VoiceAssistant::new(
        env.pipeline.clone(),
        Box::new(ScriptedRecognizer::new(script)),
        Some(Box::new(speaker.clone())),
        "voice-session",
    )
}

#[tokio::test]
async fn test_heard_query_is_answered_and_spoken() {
    let (env, _provider) = TestEnv::replying("It is sunny.");
    let speaker = RecordingSpeaker::default();
    let mut bot = assistant(
        &env,
        [Recognition::Heard("What's the weather?".to_string())],
        &speaker,
    );

    let outcome = bot.interact_once().await;

    let VoiceOutcome::Completed(result) = outcome else {
        panic!("expected a completed turn");
    };
    assert_eq!(result.response(), Some("It is sunny."));
    assert_eq!(speaker.spoken(), ["It is sunny."]);

    let logs = env.log.recent(5);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].query_type, VOICE_INTERACTION);
    assert_eq!(logs[0].session_id.as_deref(), Some("voice-session"));
    assert_eq!(env.pipeline.history("voice-session").len(), 1);
}

#[tokio::test]
async fn test_failed_recognition_asks_to_repeat() {
    for recognition in [
        Recognition::NoSpeechDetected,
        Recognition::Timeout,
        Recognition::RecognitionError("network down".to_string()),
        Recognition::Heard("   ".to_string()),
    ] {
        let (env, provider) = TestEnv::replying("unused");
        let speaker = RecordingSpeaker::default();
        let mut bot = assistant(&env, [recognition.clone()], &speaker);

        let outcome = bot.interact_once().await;

        assert_eq!(outcome, VoiceOutcome::NotUnderstood(recognition));
        assert_eq!(speaker.spoken(), [NOT_UNDERSTOOD_PROMPT]);
        assert!(provider.requests().is_empty());
        assert!(env.log.recent(5).is_empty());

        let result = outcome.into_result();
        assert_eq!(
            result,
            InteractionResult::Failure {
                error: "Speech recognition failed".to_string()
            }
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error"], "Speech recognition failed");
    }
}

#[tokio::test]
async fn test_pipeline_failure_is_announced() {
    let (env, _provider) = TestEnv::replying("fine");
    std::fs::write(&env.log_path, "garbage").unwrap();
    let speaker = RecordingSpeaker::default();
    let mut bot = assistant(&env, [Recognition::Heard("hello".to_string())], &speaker);

    let outcome = bot.interact_once().await;

    let VoiceOutcome::Completed(result) = outcome else {
        panic!("expected a completed turn");
    };
    assert!(!result.is_success());
    assert_eq!(speaker.spoken(), [PROCESSING_ERROR_PROMPT]);
}

#[tokio::test]
async fn test_speaker_failure_does_not_fail_turn() {
    let (env, _provider) = TestEnv::replying("Hello!");
    let speaker = RecordingSpeaker {
        fail: true,
        ..RecordingSpeaker::default()
    };
    let mut bot = assistant(&env, [Recognition::Heard("hi".to_string())], &speaker);

    let outcome = bot.interact_once().await;

    assert!(matches!(outcome, VoiceOutcome::Completed(ref r) if r.is_success()));
    assert_eq!(speaker.spoken(), ["Hello!"]);
}

#[tokio::test]
async fn test_without_speaker_replies_are_silent() {
    let (env, _provider) = TestEnv::replying("quiet reply");
    let mut bot = VoiceAssistant::new(
        env.pipeline.clone(),
        Box::new(ScriptedRecognizer::new([Recognition::Heard("hi".to_string())])),
        None,
        "mute",
    );

    let outcome = bot.interact_once().await.into_result();
    assert_eq!(outcome.response(), Some("quiet reply"));
}

#[tokio::test]
async fn test_run_keeps_context_until_shutdown() {
    let (env, provider) = TestEnv::replying("ok");
    let speaker = RecordingSpeaker::default();
    let (tx, rx) = oneshot::channel();

    let mut recognizer = ScriptedRecognizer::new([
        Recognition::Heard("my name is Sam".to_string()),
        Recognition::Timeout,
        Recognition::Heard("what is my name?".to_string()),
    ]);
    recognizer.drained = Some(tx);
    let timeouts = Arc::clone(&recognizer.timeouts);

    let mut bot = VoiceAssistant::new(
        env.pipeline.clone(),
        Box::new(recognizer),
        Some(Box::new(speaker.clone())),
        "loop",
    )
    .with_timeouts(Duration::from_secs(3), Duration::from_secs(7));

    bot.run(async {
        let _ = rx.await;
    })
    .await;

    assert_eq!(speaker.spoken(), ["ok", NOT_UNDERSTOOD_PROMPT, "ok"]);
    assert_eq!(env.pipeline.history("loop").len(), 2);

    let prompt = provider.last_prompt().unwrap();
    assert!(prompt.contains("User: my name is Sam"));
    assert!(prompt.contains("Current user message: what is my name?"));

    let timeouts = timeouts.lock().unwrap();
    assert_eq!(timeouts.len(), 4);
    assert!(
        timeouts
            .iter()
            .all(|t| *t == (Duration::from_secs(3), Duration::from_secs(7)))
    );
}

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// Feed audio in 100ms chunks, returning the first non-pending event
fn feed(detector: &mut UtteranceDetector, audio: &[f32]) -> DetectorEvent {
    audio
        .chunks(1600)
        .map(|chunk| detector.process(chunk))
        .find(|event| *event != DetectorEvent::Pending)
        .unwrap_or(DetectorEvent::Pending)
}

#[test]
fn test_detector_captures_spoken_phrase() {
    let mut detector = UtteranceDetector::new(Duration::from_secs(5), Duration::from_secs(15));

    assert_eq!(feed(&mut detector, &generate_silence(0.5)), DetectorEvent::Pending);
    assert_eq!(
        feed(&mut detector, &generate_sine_samples(220.0, 1.0, 0.5)),
        DetectorEvent::Pending
    );
    assert_eq!(feed(&mut detector, &generate_silence(1.0)), DetectorEvent::Complete);

    let phrase = detector.take_phrase();
    // One second of speech plus the trailing pause
    assert!(phrase.len() > SAMPLE_RATE as usize);
    assert!(phrase.len() < 2 * SAMPLE_RATE as usize);

    let wav = samples_to_wav(&phrase, SAMPLE_RATE).unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    assert_eq!(reader.len() as usize, phrase.len());
}

#[test]
fn test_detector_times_out_on_silence() {
    let mut detector = UtteranceDetector::new(Duration::from_secs(2), Duration::from_secs(15));

    assert_eq!(feed(&mut detector, &generate_silence(3.0)), DetectorEvent::Timeout);
}

#[test]
fn test_detector_ignores_quiet_noise() {
    let mut detector = UtteranceDetector::new(Duration::from_secs(1), Duration::from_secs(15));

    let noise = generate_sine_samples(50.0, 2.0, 0.01);
    assert_eq!(feed(&mut detector, &noise), DetectorEvent::Timeout);
    assert!(!detector.is_speaking());
}

#[tokio::test]
async fn test_shutdown_waits_for_heard_query() {
    let (provider, generating) = SlowProvider::new("Finished anyway.", Duration::from_millis(300));
    let env = TestEnv::new(Arc::new(provider));
    let speaker = RecordingSpeaker::default();

    let mut bot = assistant(
        &env,
        [Recognition::Heard("tell me a story".to_string())],
        &speaker,
    );

    // Shutdown arrives while the model is still generating
    bot.run(async {
        let _ = generating.await;
    })
    .await;

    let logs = env.log.recent(5);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].response, "Finished anyway.");
    assert_eq!(env.pipeline.history("voice-session").len(), 1);
    assert_eq!(speaker.spoken(), ["Finished anyway."]);
}
