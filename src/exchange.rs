//! Exchange records shared by the history store, log store and pipeline

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tag for queries processed through the pipeline directly
pub const DIRECT_INTERACTION: &str = "direct_interaction";

/// Tag for queries submitted from the web UI
pub const WEB_VOICE_INTERACTION: &str = "web_voice_interaction";

/// Tag for queries captured from the microphone
pub const VOICE_INTERACTION: &str = "voice_interaction";

/// One logged query/response pair with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// ISO-8601 creation time
    pub timestamp: String,
    pub query: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub query_type: String,
    /// Filled with the hour bucket by the log store when absent
    #[serde(default)]
    pub session_id: Option<String>,
}

impl Exchange {
    /// Create an exchange stamped with the current time
    #[must_use]
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        query_type: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            timestamp: timestamp_now(),
            query: query.into(),
            response: response.into(),
            query_type: query_type.into(),
            session_id,
        }
    }
}

/// A past exchange held in session history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub query: String,
    pub response: String,
}

/// A validated, non-empty user query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery(String);

impl UserQuery {
    /// Validate raw query text; the text is kept as given
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyQuery` if the text is blank
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        Ok(Self(text.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current local time as an ISO-8601 string
#[must_use]
pub fn timestamp_now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Coarse session id for unscoped queries: `YYYYMMDD_HH`
#[must_use]
pub fn hour_bucket(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H").to_string()
}
