//! Voicebot - a voice assistant backed by a hosted LLM
//!
//! This library provides the core functionality for the voicebot:
//! - Session-scoped conversation history and prompt assembly
//! - Fail-soft response generation against an OpenAI-compatible API
//! - A durable JSON interaction log
//! - Voice input/output (microphone, Whisper STT, TTS, speakers)
//! - An HTTP API for the web UI
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Front ends                        │
//! │      Voice loop   │   HTTP API   │   CLI (ask)       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               InteractionPipeline                    │
//! │  HistoryStore → prompt → ResponseGenerator → LogStore│
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │          External services (via traits)              │
//! │     LLM completion  │  Whisper STT  │  TTS           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod exchange;
pub mod llm;
pub mod log_store;
pub mod pipeline;
pub mod voice;

pub use config::Config;
pub use context::{HistoryStore, build_prompt};
pub use error::{Error, Result};
pub use exchange::{Exchange, HistoryEntry, UserQuery};
pub use llm::{CompletionProvider, CompletionRequest, ResponseGenerator};
pub use log_store::LogStore;
pub use pipeline::{InteractionPipeline, InteractionResult};
