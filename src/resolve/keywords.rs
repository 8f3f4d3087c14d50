//! Query tokenization and candidate phrase generation.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// English words that almost never name an entity.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "could",
    "should", "may", "might", "shall", "can", "need", "dare", "ought",
    "used", "to", "of", "in", "on", "at", "by", "for", "with", "about",
    "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "from", "up", "down", "out", "off", "over", "under",
    "again", "further", "then", "once", "and", "but", "or", "nor", "so",
    "yet", "both", "either", "neither", "not", "only", "own", "same",
    "than", "too", "very", "just", "because", "as", "until", "while",
    "if", "when", "where", "how", "what", "which", "who", "whom", "that",
    "this", "these", "those", "i", "me", "my", "myself", "we", "our",
    "you", "your", "he", "him", "his", "she", "her", "it", "its", "they",
    "them", "their", "tell", "give", "show", "find", "get", "let",
    "make", "know", "see", "take", "come", "go", "say", "ask",
];

/// Longest n-gram first: multi-word names are tried before their parts.
const NGRAM_SIZES: [usize; 3] = [3, 2, 1];

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\s\-]").expect("valid character class"))
}

/// Stop-word set: the defaults plus caller extensions, all lowercase.
#[derive(Debug, Clone)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    pub fn with_extra<I, W>(extra: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let mut words: HashSet<String> = DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect();
        words.extend(extra.into_iter().map(|w| w.as_ref().to_lowercase()));
        Self(words)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }
}

impl Default for StopWords {
    fn default() -> Self {
        Self::with_extra(std::iter::empty::<&str>())
    }
}

/// Lowercased tokens; anything but ASCII letters, digits, whitespace and
/// hyphens separates tokens ("co-codamol" stays whole, "aspirin's" splits).
pub fn tokenize(query: &str) -> Vec<String> {
    disallowed_chars()
        .replace_all(query, " ")
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Candidate lookup phrases for a query, longest n-grams first, deduplicated
/// in first-seen order. Never empty for a query with at least one token: when
/// every token is a stop-word the unfiltered tokens are used.
pub fn candidate_phrases(query: &str, stop_words: &StopWords) -> Vec<String> {
    let tokens = tokenize(query);
    let content: Vec<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|t| !stop_words.contains(t))
        .collect();
    let content: Vec<&str> = if content.is_empty() {
        tokens.iter().map(String::as_str).collect()
    } else {
        content
    };

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for n in NGRAM_SIZES {
        for window in content.windows(n) {
            let phrase = window.join(" ");
            if seen.insert(phrase.clone()) {
                candidates.push(phrase);
            }
        }
    }
    candidates
}
