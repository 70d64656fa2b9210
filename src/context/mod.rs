//! Conversation context: session history and prompt assembly

mod builder;
mod history;

pub use builder::{CONTEXT_WINDOW, build_prompt};
pub use history::{HistoryStore, MAX_HISTORY};
