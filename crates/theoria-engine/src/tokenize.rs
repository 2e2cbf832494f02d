//! C1: lowercase, split on `[^a-z0-9-]`, drop stop-words, apply Porter stemming.

use crate::porter;

/// Closed set of common English function words dropped before stemming.
/// Deliberately small and fixed rather than frequency-derived: stability of
/// the token vocabulary across runs matters more than marginal recall.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "would", "you", "your", "yours", "yourself", "yourselves",
];

fn is_token_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

/// Tokenize one block of text into stemmed, stop-word-filtered terms,
/// preserving the order (and repeats) in which they appear.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tokens = Vec::new();
    for raw in lowered.split(|c: char| !is_token_char(c)) {
        if raw.is_empty() {
            continue;
        }
        if STOP_WORDS.contains(&raw) {
            continue;
        }
        tokens.push(porter::stem(raw));
    }
    tokens
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer;

impl theoria_core::Tokenize for Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        tokenize(text)
    }
}
