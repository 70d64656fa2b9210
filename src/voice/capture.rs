//! Microphone capture and phrase recording
//!
//! The cpal input callback appends to a [`SampleBuffer`]; [`record_until`]
//! drains it on a fixed cadence and feeds an [`UtteranceDetector`] until a
//! phrase is complete.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use tokio::time::Instant;

use super::detector::{DetectorEvent, UtteranceDetector};
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// How often captured samples are drained
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Detector input granularity (100ms at 16kHz)
const CHUNK_SAMPLES: usize = 1600;

/// Samples shared between the input callback and the recorder
#[derive(Clone, Default)]
pub struct SampleBuffer(Arc<Mutex<Vec<f32>>>);

impl SampleBuffer {
    pub fn push(&self, samples: &[f32]) {
        if let Ok(mut buf) = self.0.lock() {
            buf.extend_from_slice(samples);
        }
    }

    /// Everything captured since the last drain
    #[must_use]
    pub fn drain(&self) -> Vec<f32> {
        self.0
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut buf) = self.0.lock() {
            buf.clear();
        }
    }
}

/// Poll `samples` until `detector` finishes a phrase
///
/// Returns `None` when no speech started. If `deadline` passes mid-phrase,
/// whatever was heard so far is returned; it also stops the wait when the
/// device delivers no samples at all.
pub async fn record_until(
    samples: &SampleBuffer,
    detector: &mut UtteranceDetector,
    deadline: Instant,
) -> Option<Vec<f32>> {
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;

        for chunk in samples.drain().chunks(CHUNK_SAMPLES) {
            match detector.process(chunk) {
                DetectorEvent::Complete => return Some(detector.take_phrase()),
                DetectorEvent::Timeout => return None,
                DetectorEvent::Pending => {}
            }
        }

        if Instant::now() >= deadline {
            tracing::debug!(speaking = detector.is_speaking(), "recording deadline reached");
            return detector.is_speaking().then(|| detector.take_phrase());
        }
    }
}

/// Default microphone, opened at 16kHz mono
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    samples: SampleBuffer,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns error if no microphone is available or none supports 16kHz mono
    pub fn open() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no microphones found".to_string()))?;
        let config = speech_config(&device)?;

        tracing::info!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            samples: SampleBuffer::default(),
            stream: None,
        })
    }

    /// Buffer the input stream writes into
    #[must_use]
    pub const fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    /// Start streaming; no-op if already running
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let sink = self.samples.clone();
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| sink.push(data),
                |err| tracing::error!(error = %err, "audio capture error"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        self.stream = Some(stream);
        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop streaming and drop buffered audio
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            self.samples.clear();
            tracing::debug!("audio capture stopped");
        }
    }

    /// Record one phrase, waiting at most `timeout` for speech to start
    ///
    /// The stream is stopped again before returning.
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be started
    #[allow(clippy::future_not_send)]
    pub async fn record_phrase(
        &mut self,
        timeout: Duration,
        phrase_time_limit: Duration,
    ) -> Result<Option<Vec<f32>>> {
        let mut detector = UtteranceDetector::new(timeout, phrase_time_limit);
        let deadline = Instant::now() + timeout + phrase_time_limit;

        self.start()?;
        self.samples.clear();
        tracing::info!("listening");

        let phrase = record_until(&self.samples, &mut detector, deadline).await;
        self.stop();
        Ok(phrase)
    }
}

/// First mono input config that can run at the speech sample rate
fn speech_config(device: &Device) -> Result<StreamConfig> {
    let rate = SampleRate(SAMPLE_RATE);
    device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| c.channels() == 1 && (c.min_sample_rate()..=c.max_sample_rate()).contains(&rate))
        .map(|c| c.with_sample_rate(rate).config())
        .ok_or_else(|| Error::Audio("microphone does not support 16kHz mono".to_string()))
}

/// Encode f32 samples as 16-bit mono WAV for STT upload
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer =
        hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let pcm = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(pcm)
            .map_err(|e| Error::Audio(e.to_string()))?;
    }
    writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;

    Ok(cursor.into_inner())
}
