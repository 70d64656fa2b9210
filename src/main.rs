use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use voicebot::api::ApiServer;
use voicebot::log_store::{DEFAULT_RECENT_LIMIT, LogStore};
use voicebot::voice::{
    AudioCapture, AudioPlayback, MicrophoneRecognizer, Speaker, SpeechToText, TextToSpeech,
    VoiceAssistant, VoiceSpeaker, rms,
};
use voicebot::{Config, InteractionPipeline, UserQuery};

/// Voicebot - voice assistant backed by a hosted LLM
#[derive(Parser)]
#[command(name = "voicebot", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web API (default)
    Serve {
        /// Address to bind
        #[arg(long, env = "VOICEBOT_HOST")]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long, env = "VOICEBOT_PORT")]
        port: Option<u16>,
    },
    /// Send one text query and print the reply
    Ask {
        /// Query text
        #[arg(default_value = "Hello, how are you today?")]
        text: String,
        /// Conversation to continue
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Talk to the assistant through the microphone
    Listen {
        /// Handle a single query and exit
        #[arg(long)]
        once: bool,
        /// Conversation to continue (a new one is started otherwise)
        #[arg(short, long)]
        session: Option<String>,
        /// Print replies without speaking them
        #[arg(long)]
        mute: bool,
    },
    /// Show logged interactions
    Logs {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
        /// Only show entries from this session
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,voicebot=info",
        1 => "info,voicebot=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    });

    match command {
        Command::Serve { host, port } => serve(host, port).await,
        Command::Ask { text, session } => ask(&text, session.as_deref()).await,
        Command::Listen {
            once,
            session,
            mute,
        } => listen(once, session, mute).await,
        Command::Logs { limit, session } => show_logs(limit, session.as_deref()),
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker(),
        Command::TestTts { text } => test_tts(&text).await,
    }
}

/// Run the web API until interrupted
async fn serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    let pipeline = InteractionPipeline::from_config(&config)?;
    tracing::info!("starting voicebot web API");
    ApiServer::new(pipeline, &config.server).run().await?;

    Ok(())
}

/// One-off text query
async fn ask(text: &str, session: Option<&str>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let pipeline = InteractionPipeline::from_config(&config)?;
    let query = UserQuery::parse(text)?;

    let result = pipeline.process(&query, session, None).await;
    match result.response() {
        Some(reply) => println!("Success! Response: {reply}"),
        None => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            anyhow::bail!("query failed");
        }
    }

    Ok(())
}

/// Voice conversation through the microphone and speakers
#[allow(clippy::future_not_send)]
async fn listen(once: bool, session: Option<String>, mute: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let openai_key = config
        .voice
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY is required for voice mode")?;

    let pipeline = InteractionPipeline::from_config(&config)?;
    let stt = SpeechToText::new(openai_key.clone(), config.voice.stt_model.clone())?;
    let recognizer = MicrophoneRecognizer::new(AudioCapture::open()?, stt);

    let speaker: Option<Box<dyn Speaker>> = if mute {
        None
    } else {
        match build_speaker(&config, openai_key) {
            Ok(speaker) => Some(Box::new(speaker)),
            Err(e) => {
                tracing::warn!(error = %e, "speaker unavailable, replies will only be printed");
                None
            }
        }
    };

    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut assistant = VoiceAssistant::new(pipeline, Box::new(recognizer), speaker, session_id)
        .with_timeouts(config.voice.listen_timeout, config.voice.phrase_time_limit);

    if once {
        println!("VoiceBot is ready! Say something...");
        let result = assistant.interact_once().await.into_result();
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    tracing::info!(session_id = assistant.session_id(), "voicebot ready, press Ctrl-C to stop");
    assistant
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    Ok(())
}

fn build_speaker(config: &Config, api_key: SecretString) -> voicebot::Result<VoiceSpeaker> {
    let tts = TextToSpeech::new(
        api_key,
        config.voice.tts_model.clone(),
        config.voice.tts_voice.clone(),
        config.voice.tts_speed,
    )?;
    Ok(VoiceSpeaker::new(tts, AudioPlayback::new()?))
}

/// Print logged interactions, oldest first
fn show_logs(limit: usize, session: Option<&str>) -> anyhow::Result<()> {
    let store = LogStore::open(voicebot::config::log_file())?;
    let entries = match session {
        Some(id) => store.by_session(id, limit),
        None => store.recent(limit),
    };

    if entries.is_empty() {
        println!("No interactions logged in {}", store.path().display());
        return Ok(());
    }

    for entry in entries {
        println!(
            "[{}] ({}, {})",
            entry.timestamp,
            entry.query_type,
            entry.session_id.as_deref().unwrap_or("-")
        );
        println!("  Q: {}", entry.query);
        println!("  A: {}", entry.response);
    }

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::open()?;
    capture.start()?;
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.samples().drain();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check that your mic is plugged in and not muted.");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 24000_u16;
    let frequency = 440.0_f32;
    let samples: Vec<f32> = (0..u32::from(sample_rate) * 2)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / f32::from(sample_rate);
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    playback.play(samples)?;

    println!("If you heard the tone, your speakers are working!");
    Ok(())
}

/// Test TTS output
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let api_key = config
        .voice
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY is required for TTS")?;
    let tts = TextToSpeech::new(
        api_key,
        config.voice.tts_model.clone(),
        config.voice.tts_voice.clone(),
        config.voice.tts_speed,
    )?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Received {} bytes of audio", mp3_data.len());

    let playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data)?;

    println!("If you heard the speech, TTS is working!");
    Ok(())
}
