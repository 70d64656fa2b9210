//! Interaction pipeline: history → prompt → model → log → history
//!
//! `process` never fails. Model failures arrive as degraded reply text from
//! the generator; storage failures surface as a structured failure result.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::config::Config;
use crate::context::{HistoryStore, build_prompt};
use crate::exchange::{DIRECT_INTERACTION, Exchange, HistoryEntry, UserQuery, timestamp_now};
use crate::llm::{OpenAiCompatClient, ResponseGenerator};
use crate::log_store::LogStore;
use crate::{Error, Result};

/// Outcome of processing one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionResult {
    Success {
        user_query: String,
        assistant_response: String,
        timestamp: String,
    },
    Failure {
        error: String,
    },
}

impl InteractionResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The assistant reply, if processing succeeded
    #[must_use]
    pub fn response(&self) -> Option<&str> {
        match self {
            Self::Success {
                assistant_response, ..
            } => Some(assistant_response),
            Self::Failure { .. } => None,
        }
    }
}

// Serialized flat with a `success` flag, matching what web clients expect
impl Serialize for InteractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Success {
                user_query,
                assistant_response,
                timestamp,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("user_query", user_query)?;
                map.serialize_entry("assistant_response", assistant_response)?;
                map.serialize_entry("timestamp", timestamp)?;
                map.end()
            }
            Self::Failure { error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

/// Orchestrates one interaction per call
#[derive(Clone)]
pub struct InteractionPipeline {
    history: Arc<HistoryStore>,
    log: Arc<LogStore>,
    generator: ResponseGenerator,
}

impl InteractionPipeline {
    #[must_use]
    pub const fn new(
        history: Arc<HistoryStore>,
        log: Arc<LogStore>,
        generator: ResponseGenerator,
    ) -> Self {
        Self {
            history,
            log,
            generator,
        }
    }

    /// Wire the production collaborators described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the completion client cannot be built or the log
    /// file cannot be created
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = OpenAiCompatClient::new(
            &config.llm.base_url,
            config.llm.api_key.clone(),
            config.llm.model.clone(),
        )?;
        let log = LogStore::open(&config.log_file)?;

        tracing::info!(
            model = %config.llm.model,
            log_file = %config.log_file.display(),
            "interaction pipeline ready"
        );

        Ok(Self::new(
            Arc::new(HistoryStore::new()),
            Arc::new(log),
            ResponseGenerator::new(Arc::new(client)),
        ))
    }

    /// Process a query within an optional session
    ///
    /// `query_type` defaults to `direct_interaction`.
    pub async fn process(
        &self,
        query: &UserQuery,
        session_id: Option<&str>,
        query_type: Option<&str>,
    ) -> InteractionResult {
        tracing::info!(query = %query, session_id, "processing query");

        match self.try_process(query, session_id, query_type).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "interaction failed");
                InteractionResult::Failure {
                    error: format!("Error processing query: {e}"),
                }
            }
        }
    }

    async fn try_process(
        &self,
        query: &UserQuery,
        session_id: Option<&str>,
        query_type: Option<&str>,
    ) -> Result<InteractionResult> {
        let history = session_id
            .map(|id| self.history.get(id))
            .unwrap_or_default();
        let prompt = build_prompt(query.as_str(), &history);

        let response = self.generator.generate(&prompt).await;
        tracing::debug!(response = %response, "generated response");

        let exchange = Exchange::new(
            query.as_str(),
            response.as_str(),
            query_type.unwrap_or(DIRECT_INTERACTION),
            session_id.map(ToString::to_string),
        );
        let log = Arc::clone(&self.log);
        tokio::task::spawn_blocking(move || log.append(exchange))
            .await
            .map_err(|e| Error::Storage(format!("log task failed: {e}")))??;

        if let Some(id) = session_id {
            self.history.append(id, query.as_str(), &response);
        }

        Ok(InteractionResult::Success {
            user_query: query.to_string(),
            assistant_response: response,
            timestamp: timestamp_now(),
        })
    }

    /// Conversation history for a session in chronological order
    #[must_use]
    pub fn history(&self, session_id: &str) -> Vec<HistoryEntry> {
        self.history.get(session_id)
    }

    /// Forget a session's in-memory history
    pub fn clear_history(&self, session_id: &str) -> bool {
        self.history.clear(session_id)
    }

    /// Most recent logged exchanges
    #[must_use]
    pub fn recent_logs(&self, limit: usize) -> Vec<Exchange> {
        self.log.recent(limit)
    }

    /// Most recent logged exchanges for a session
    #[must_use]
    pub fn session_logs(&self, session_id: &str, limit: usize) -> Vec<Exchange> {
        self.log.by_session(session_id, limit)
    }
}
