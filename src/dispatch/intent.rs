use super::registry::{ANALYZE_CODE, FIND_SYMBOLS, INDEX_REPO, RUN_TESTS};
use crate::util::trim_token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Index,
    Test,
    Analyze,
    Search,
}

/// Checked in order; the first rule with a keyword in the message wins.
const RULES: &[(Intent, &[&str])] = &[
    (Intent::Index, &["index"]),
    (Intent::Test, &["test"]),
    (Intent::Analyze, &["analyze", "lint"]),
    (Intent::Search, &["find", "search"]),
];

impl Intent {
    pub fn tool_name(self) -> &'static str {
        match self {
            Intent::Index => INDEX_REPO,
            Intent::Test => RUN_TESTS,
            Intent::Analyze => ANALYZE_CODE,
            Intent::Search => FIND_SYMBOLS,
        }
    }
}

/// Substring match on the lower-cased message, so "testing" counts as a test intent.
pub fn classify(message: &str) -> Option<Intent> {
    let lowered = message.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(intent, _)| *intent)
}

/// Search term of a free-text request: its last word without quotes or punctuation.
pub fn search_query(message: &str) -> String {
    message
        .split_whitespace()
        .last()
        .map(trim_token)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_is_fixed() {
        assert_eq!(classify("Index this repo"), Some(Intent::Index));
        assert_eq!(classify("index then run the tests"), Some(Intent::Index));
        assert_eq!(classify("find the failing test"), Some(Intent::Test));
        assert_eq!(classify("lint and search"), Some(Intent::Analyze));
        assert_eq!(classify("please ANALYZE code"), Some(Intent::Analyze));
        assert_eq!(classify("search for parser"), Some(Intent::Search));
        assert_eq!(classify("what does this project do?"), None);
    }

    #[test]
    fn query_is_last_word_without_punctuation() {
        assert_eq!(search_query("find Calculator"), "Calculator");
        assert_eq!(search_query("where is \"parse_config\"?"), "parse_config");
        assert_eq!(search_query("   "), "");
    }

    #[test]
    fn intents_map_to_registered_tools() {
        assert_eq!(Intent::Search.tool_name(), "find_symbols");
        assert_eq!(Intent::Analyze.tool_name(), "analyze_code");
    }
}
