//! Energy-based utterance detection
//!
//! Waits for speech to start, accumulates it, and reports completion once a
//! pause follows enough voiced audio or the phrase limit is reached.

use std::time::Duration;

use super::SAMPLE_RATE;

/// Minimum RMS energy considered speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Voiced audio required for a phrase to count (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends a phrase (0.8s at 16kHz)
const PAUSE_SAMPLES: usize = 12_800;

/// Result of feeding a chunk to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorEvent {
    /// Keep feeding audio
    Pending,
    /// A phrase is ready in the buffer
    Complete,
    /// No speech began before the timeout
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Waiting,
    Speaking,
}

/// Detects the start and end of a spoken phrase
pub struct UtteranceDetector {
    state: State,
    buffer: Vec<f32>,
    voiced: usize,
    silence: usize,
    waited: usize,
    timeout_samples: usize,
    phrase_limit_samples: usize,
}

impl UtteranceDetector {
    /// Create a detector for one phrase
    ///
    /// `timeout` bounds the wait for speech to begin; `phrase_time_limit`
    /// bounds the phrase itself.
    #[must_use]
    pub fn new(timeout: Duration, phrase_time_limit: Duration) -> Self {
        Self {
            state: State::Waiting,
            buffer: Vec::new(),
            voiced: 0,
            silence: 0,
            waited: 0,
            timeout_samples: duration_to_samples(timeout),
            phrase_limit_samples: duration_to_samples(phrase_time_limit),
        }
    }

    /// Feed captured samples
    pub fn process(&mut self, samples: &[f32]) -> DetectorEvent {
        let is_speech = rms(samples) > ENERGY_THRESHOLD;

        match self.state {
            State::Waiting => {
                if is_speech {
                    self.state = State::Speaking;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.voiced = samples.len();
                    self.silence = 0;
                    tracing::trace!("speech started");
                } else {
                    self.waited += samples.len();
                    if self.waited >= self.timeout_samples {
                        return DetectorEvent::Timeout;
                    }
                }
            }
            State::Speaking => {
                self.buffer.extend_from_slice(samples);
                if is_speech {
                    self.voiced += samples.len();
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.buffer.len() >= self.phrase_limit_samples {
                    tracing::debug!(samples = self.buffer.len(), "phrase limit reached");
                    return DetectorEvent::Complete;
                }

                if self.silence > PAUSE_SAMPLES {
                    if self.voiced >= MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.buffer.len(), "phrase complete");
                        return DetectorEvent::Complete;
                    }
                    // Too short to be speech; count it as waiting time
                    self.waited += self.buffer.len();
                    self.discard();
                    if self.waited >= self.timeout_samples {
                        return DetectorEvent::Timeout;
                    }
                }
            }
        }

        DetectorEvent::Pending
    }

    /// Whether speech has started
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.state == State::Speaking
    }

    /// Take the captured phrase and reset
    pub fn take_phrase(&mut self) -> Vec<f32> {
        let phrase = std::mem::take(&mut self.buffer);
        self.discard();
        phrase
    }

    fn discard(&mut self) {
        self.state = State::Waiting;
        self.buffer.clear();
        self.voiced = 0;
        self.silence = 0;
    }
}

#[allow(clippy::cast_possible_truncation)]
fn duration_to_samples(duration: Duration) -> usize {
    (duration.as_millis() * u128::from(SAMPLE_RATE) / 1000) as usize
}

/// RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 100ms chunks at 16kHz
    const CHUNK: usize = 1600;

    fn loud() -> Vec<f32> {
        (0..CHUNK)
            .map(|i| if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect()
    }

    fn quiet() -> Vec<f32> {
        vec![0.0; CHUNK]
    }

    #[test]
    fn rms_of_silence_and_tone() {
        assert!(rms(&quiet()) < 0.001);
        assert!(rms(&loud()) > 0.25);
        assert!(rms(&[]) < f32::EPSILON);
    }

    #[test]
    fn times_out_without_speech() {
        let mut detector = UtteranceDetector::new(Duration::from_secs(1), Duration::from_secs(5));

        for _ in 0..9 {
            assert_eq!(detector.process(&quiet()), DetectorEvent::Pending);
        }
        assert_eq!(detector.process(&quiet()), DetectorEvent::Timeout);
    }

    #[test]
    fn completes_after_pause() {
        let mut detector = UtteranceDetector::new(Duration::from_secs(5), Duration::from_secs(10));

        for _ in 0..5 {
            assert_eq!(detector.process(&loud()), DetectorEvent::Pending);
        }
        assert!(detector.is_speaking());

        let mut event = DetectorEvent::Pending;
        for _ in 0..9 {
            event = detector.process(&quiet());
        }
        assert_eq!(event, DetectorEvent::Complete);

        let phrase = detector.take_phrase();
        assert_eq!(phrase.len(), 14 * CHUNK);
        assert!(!detector.is_speaking());
    }

    #[test]
    fn phrase_limit_cuts_long_speech() {
        let mut detector =
            UtteranceDetector::new(Duration::from_secs(5), Duration::from_millis(500));

        let events: Vec<_> = (0..5).map(|_| detector.process(&loud())).collect();
        assert_eq!(events.last(), Some(&DetectorEvent::Complete));
    }

    #[test]
    fn short_blip_is_discarded() {
        let mut detector = UtteranceDetector::new(Duration::from_secs(5), Duration::from_secs(10));

        detector.process(&loud());
        for _ in 0..9 {
            assert_eq!(detector.process(&quiet()), DetectorEvent::Pending);
        }
        assert!(!detector.is_speaking());
    }
}
