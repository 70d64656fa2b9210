//! Append-only JSON interaction log
//!
//! The log is a single JSON array on disk. Every append rewrites the array
//! through a temporary file in the same directory followed by an atomic
//! rename, so an interrupted write leaves the previous contents intact.
//! Appends within the process are serialized by a lock; nothing coordinates
//! separate processes sharing the same path.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

use crate::exchange::{Exchange, hour_bucket};
use crate::{Error, Result};

/// Number of entries returned by the web log view
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// JSON-file backed log of every exchange
#[derive(Debug)]
pub struct LogStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LogStore {
    /// Open the log at `path`, creating it (and its directory) as an empty array
    ///
    /// # Errors
    ///
    /// Returns error if the file or directory cannot be created
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        store.ensure_file()?;

        tracing::debug!(path = %store.path.display(), "interaction log ready");
        Ok(store)
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an exchange, filling a missing session id with the hour bucket
    ///
    /// Returns the exchange as stored.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the log cannot be read, parsed or rewritten.
    /// The file is left unchanged on failure.
    pub fn append(&self, mut exchange: Exchange) -> Result<Exchange> {
        if exchange.session_id.is_none() {
            exchange.session_id = Some(hour_bucket(Local::now()));
        }

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        self.ensure_file()?;
        let mut logs = self.read_all()?;
        logs.push(exchange.clone());
        self.write_all(&logs)?;

        tracing::info!(
            query = %exchange.query,
            query_type = %exchange.query_type,
            session_id = exchange.session_id.as_deref().unwrap_or_default(),
            "logged query"
        );

        Ok(exchange)
    }

    /// Last `limit` exchanges in chronological order
    ///
    /// Read failures (missing or corrupt file) yield an empty list.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<Exchange> {
        match self.read_all() {
            Ok(logs) => tail(logs, limit),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read log");
                Vec::new()
            }
        }
    }

    /// Last `limit` exchanges recorded for `session_id`
    ///
    /// Same error policy as [`LogStore::recent`].
    #[must_use]
    pub fn by_session(&self, session_id: &str, limit: usize) -> Vec<Exchange> {
        match self.read_all() {
            Ok(logs) => {
                let matching = logs
                    .into_iter()
                    .filter(|e| e.session_id.as_deref() == Some(session_id))
                    .collect();
                tail(matching, limit)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read log");
                Vec::new()
            }
        }
    }

    fn ensure_file(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        fs::create_dir_all(self.dir()).map_err(|e| {
            Error::Storage(format!("failed to create {}: {e}", self.dir().display()))
        })?;
        self.write_all(&[])
    }

    fn read_all(&self) -> Result<Vec<Exchange>> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| Error::Storage(format!("failed to read {}: {e}", self.path.display())))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("corrupt log {}: {e}", self.path.display())))
    }

    fn write_all(&self, logs: &[Exchange]) -> Result<()> {
        let json = serde_json::to_vec_pretty(logs)?;

        let mut tmp = tempfile::NamedTempFile::new_in(self.dir())
            .map_err(|e| Error::Storage(format!("failed to create temp file: {e}")))?;
        tmp.write_all(&json)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::Storage(format!("failed to write temp file: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Storage(format!("failed to replace {}: {e}", self.path.display())))?;

        Ok(())
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

fn tail(mut logs: Vec<Exchange>, limit: usize) -> Vec<Exchange> {
    let start = logs.len().saturating_sub(limit);
    logs.split_off(start)
}
