//! In-memory, per-session conversation history
//!
//! Histories live for the lifetime of the process and are lost on restart.
//! The store is owned by whoever constructs it and handed to the pipeline;
//! there is no global instance.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::exchange::{HistoryEntry, timestamp_now};

/// Maximum entries kept per session
pub const MAX_HISTORY: usize = 50;

/// Bounded history of exchanges keyed by session id
#[derive(Debug, Default)]
pub struct HistoryStore {
    sessions: Mutex<HashMap<String, Vec<HistoryEntry>>>,
}

impl HistoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// History for a session in chronological order
    ///
    /// Unknown sessions yield an empty list.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Vec<HistoryEntry> {
        self.lock().get(session_id).cloned().unwrap_or_default()
    }

    /// Record an exchange, evicting the oldest entries past the cap
    pub fn append(&self, session_id: &str, query: &str, response: &str) {
        let mut sessions = self.lock();
        let history = sessions.entry(session_id.to_string()).or_default();

        history.push(HistoryEntry {
            timestamp: timestamp_now(),
            query: query.to_string(),
            response: response.to_string(),
        });

        if history.len() > MAX_HISTORY {
            let excess = history.len() - MAX_HISTORY;
            history.drain(..excess);
        }

        tracing::trace!(session_id, len = history.len(), "history appended");
    }

    /// Drop a session's history, returning whether it existed
    pub fn clear(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    /// Ids of all sessions with history
    #[must_use]
    pub fn sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    // A panic while holding the lock cannot leave a list half-written,
    // so a poisoned map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<HistoryEntry>>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn unknown_session_is_empty() {
        let store = HistoryStore::new();
        assert!(store.get("nobody").is_empty());
    }

    #[test]
    fn append_preserves_order() {
        let store = HistoryStore::new();
        store.append("s1", "first", "one");
        store.append("s1", "second", "two");

        let history = store.get("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "first");
        assert_eq!(history[1].response, "two");
    }

    #[test]
    fn keeps_last_fifty() {
        let store = HistoryStore::new();
        for i in 0..73 {
            store.append("s1", &format!("q{i}"), &format!("r{i}"));
        }

        let history = store.get("s1");
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.first().unwrap().query, "q23");
        assert_eq!(history.last().unwrap().query, "q72");
        for (offset, entry) in history.iter().enumerate() {
            assert_eq!(entry.query, format!("q{}", offset + 23));
        }
    }

    #[test]
    fn sessions_are_isolated() {
        let store = HistoryStore::new();
        store.append("a", "for a", "ok");
        store.append("b", "for b", "ok");

        assert_eq!(store.get("a").len(), 1);
        assert_eq!(store.get("a")[0].query, "for a");
        assert_eq!(store.sessions(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn clear_removes_session() {
        let store = HistoryStore::new();
        store.append("a", "q", "r");

        assert!(store.clear("a"));
        assert!(!store.clear("a"));
        assert!(store.get("a").is_empty());
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let store = Arc::new(HistoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..5 {
                        store.append("shared", &format!("t{t}-{i}"), "r");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("shared").len(), 40);
    }
}
