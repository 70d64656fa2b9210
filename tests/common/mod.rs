//! Shared test utilities
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use voicebot::{
    CompletionProvider, CompletionRequest, Error, HistoryStore, InteractionPipeline, LogStore,
    ResponseGenerator, Result,
};

/// Provider that answers every prompt with a fixed reply and records requests
#[derive(Default)]
pub struct ScriptedProvider {
    reply: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.requests().last().map(|r| r.prompt.clone())
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Provider that always fails like an unreachable API
pub struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Err(Error::Completion("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Provider that signals when a completion starts, then answers after a delay
pub struct SlowProvider {
    reply: String,
    delay: Duration,
    started: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

impl SlowProvider {
    pub fn new(reply: &str, delay: Duration) -> (Self, tokio::sync::oneshot::Receiver<()>) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let provider = Self {
            reply: reply.to_string(),
            delay,
            started: Mutex::new(Some(tx)),
        };
        (provider, rx)
    }
}

#[async_trait]
impl CompletionProvider for SlowProvider {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        if let Some(tx) = self.started.lock().unwrap().take() {
            let _ = tx.send(());
        }
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// A pipeline wired to in-memory history and a log in a temp directory
pub struct TestEnv {
    _dir: tempfile::TempDir,
    pub log_path: PathBuf,
    pub history: Arc<HistoryStore>,
    pub log: Arc<LogStore>,
    pub pipeline: InteractionPipeline,
}

impl TestEnv {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let log_path = dir.path().join("logs").join("user_queries.json");
        let log = Arc::new(LogStore::open(&log_path).expect("failed to open log"));
        let history = Arc::new(HistoryStore::new());
        let pipeline = InteractionPipeline::new(
            Arc::clone(&history),
            Arc::clone(&log),
            ResponseGenerator::new(provider),
        );

        Self {
            _dir: dir,
            log_path,
            history,
            log,
            pipeline,
        }
    }

    /// Environment whose model always answers `reply`
    pub fn replying(reply: &str) -> (Self, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(reply));
        (Self::new(provider.clone()), provider)
    }
}
