//! Keyword intent classification.

use serde_json::Value;

/// Intent returned when no configured keyword matches.
pub const GENERAL_INTENT: &str = "general";

/// Maps a query to the first configured intent whose keywords occur in it.
///
/// Intents are checked in configuration order and keywords match as
/// case-insensitive substrings, so "treatment" also matches the keyword "treat".
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    intents: Vec<(String, Vec<String>)>,
}

impl IntentClassifier {
    pub fn new<I, K>(intents: I) -> Self
    where
        I: IntoIterator<Item = (String, K)>,
        K: IntoIterator<Item = String>,
    {
        let intents = intents
            .into_iter()
            .map(|(name, keywords)| {
                let keywords = keywords
                    .into_iter()
                    .map(|k| k.to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (name, keywords)
            })
            .collect();
        Self { intents }
    }

    /// Read the `keywords` list of every `intent_patterns` entry, in order.
    pub fn from_intent_patterns(intent_patterns: &serde_json::Map<String, Value>) -> Self {
        Self::new(intent_patterns.iter().map(|(name, entry)| {
            let keywords: Vec<String> = match entry.get("keywords") {
                Some(Value::Array(items)) => items.iter().filter_map(|k| k.as_str().map(str::to_string)).collect(),
                _ => {
                    log::warn!("Intent '{}' has no keyword list and will never be selected", name);
                    Vec::new()
                }
            };
            (name.clone(), keywords)
        }))
    }

    pub fn classify(&self, query: &str) -> &str {
        let query = query.to_lowercase();
        self.intents
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| query.contains(k.as_str())))
            .map(|(name, _)| name.as_str())
            .unwrap_or(GENERAL_INTENT)
    }

    /// Configured intent names, without the `general` fallback.
    pub fn all_intents(&self) -> Vec<&str> {
        self.intents.iter().map(|(name, _)| name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classifier() -> IntentClassifier {
        let patterns = json!({
            "side_effects": {"keywords": ["side effect", "cause", "adverse"]},
            "treatment": {"keywords": ["treat", "cure"]},
            "connection": {"keywords": ["connect", "cause"]}
        });
        IntentClassifier::from_intent_patterns(patterns.as_object().unwrap())
    }

    #[test]
    fn test_first_matching_intent_wins() {
        let classifier = classifier();
        assert_eq!(classifier.classify("What does aspirin CAUSE?"), "side_effects");
        assert_eq!(classifier.classify("How is a headache treated"), "treatment");
        assert_eq!(classifier.classify("How are these connected?"), "connection");
    }

    #[test]
    fn test_no_match_is_general() {
        assert_eq!(classifier().classify("Tell me about aspirin"), GENERAL_INTENT);
        assert_eq!(IntentClassifier::default().classify("anything"), GENERAL_INTENT);
    }

    #[test]
    fn test_all_intents_in_config_order() {
        assert_eq!(classifier().all_intents(), vec!["side_effects", "treatment", "connection"]);
    }

    #[test]
    fn test_missing_keywords_never_match() {
        let patterns = json!({"broken": {"strategy": "variable_hop"}, "ok": {"keywords": ["x"]}});
        let classifier = IntentClassifier::from_intent_patterns(patterns.as_object().unwrap());
        assert_eq!(classifier.all_intents(), vec!["broken", "ok"]);
        assert_eq!(classifier.classify("x marks"), "ok");
    }
}
