//! Prompt assembly from the current query and recent history

use crate::exchange::HistoryEntry;

/// Number of most recent exchanges carried into the prompt
pub const CONTEXT_WINDOW: usize = 5;

const CONTEXT_HEADER: &str = "Previous conversation context:";
const CURRENT_LABEL: &str = "Current user message:";
const INSTRUCTION: &str = "Please respond to the current message while considering the conversation context. Keep your answer concise.";

/// Build the prompt sent to the model
///
/// With no history the query is returned untouched. Otherwise the last
/// [`CONTEXT_WINDOW`] exchanges are rendered in chronological order ahead of
/// the current message.
#[must_use]
pub fn build_prompt(query: &str, history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return query.to_string();
    }

    let start = history.len().saturating_sub(CONTEXT_WINDOW);
    let lines: Vec<String> = history[start..]
        .iter()
        .flat_map(|entry| {
            let user = (!entry.query.is_empty()).then(|| format!("User: {}", entry.query));
            let assistant =
                (!entry.response.is_empty()).then(|| format!("Assistant: {}", entry.response));
            user.into_iter().chain(assistant)
        })
        .collect();

    format!(
        "{CONTEXT_HEADER}\n{}\n\n{CURRENT_LABEL} {query}\n\n{INSTRUCTION}",
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(query: &str, response: &str) -> HistoryEntry {
        HistoryEntry {
            timestamp: "2024-01-01T00:00:00".to_string(),
            query: query.to_string(),
            response: response.to_string(),
        }
    }

    #[test]
    fn empty_history_returns_query() {
        assert_eq!(build_prompt("What's new?", &[]), "What's new?");
    }

    #[test]
    fn renders_history_in_order() {
        let history = vec![entry("Hi", "Hello!"), entry("Weather?", "Sunny.")];
        let prompt = build_prompt("And tomorrow?", &history);

        assert_eq!(
            prompt,
            "Previous conversation context:\n\
             User: Hi\n\
             Assistant: Hello!\n\
             User: Weather?\n\
             Assistant: Sunny.\n\
             \n\
             Current user message: And tomorrow?\n\
             \n\
             Please respond to the current message while considering the conversation context. Keep your answer concise."
        );
    }

    #[test]
    fn only_last_five_entries_included() {
        let history: Vec<_> = (0..8)
            .map(|i| entry(&format!("q{i}"), &format!("r{i}")))
            .collect();
        let prompt = build_prompt("now", &history);

        for i in 0..3 {
            assert!(!prompt.contains(&format!("User: q{i}\n")));
        }
        let positions: Vec<usize> = (3..8)
            .map(|i| prompt.find(&format!("User: q{i}\n")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn skips_empty_sides() {
        let history = vec![entry("only a question", "")];
        let prompt = build_prompt("next", &history);

        assert!(prompt.contains("User: only a question\n\n"));
        assert!(!prompt.contains("Assistant:"));
    }
}
