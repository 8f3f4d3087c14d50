//! Entry-node resolution: map free-text query terms onto existing graph nodes.
//!
//! Each candidate phrase walks a cascade of lookups, stopping at the first
//! stage that finds anything:
//!
//! 1. exact, case-insensitive match on a searchable property
//! 2. substring match on the same properties
//! 3. fuzzy match on the primary property, when a similarity matcher is set
//!
//! Results accumulate across candidates in discovery order without duplicates.

pub mod keywords;
pub mod similarity;

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ResolverConfig;
use crate::graph::{GraphStore, LookupKind, Node, NodeLookup};
use crate::Result;

pub use keywords::{candidate_phrases, StopWords};
pub use similarity::{IndelRatio, SimilarityMatcher};

/// Candidates this short are never fuzzy matched.
const MIN_FUZZY_CHARS: usize = 4;

pub struct EntryNodeResolver<S> {
    store: S,
    settings: ResolverConfig,
    stop_words: StopWords,
    similarity: Option<Arc<dyn SimilarityMatcher>>,
}

impl<S: GraphStore> EntryNodeResolver<S> {
    pub fn new(store: S, settings: ResolverConfig, similarity: Option<Arc<dyn SimilarityMatcher>>) -> Self {
        if similarity.is_none() {
            log::debug!("No similarity matcher configured, fuzzy entity matching disabled");
        }
        let stop_words = StopWords::with_extra(&settings.extra_stop_words);
        Self {
            store,
            settings,
            stop_words,
            similarity,
        }
    }

    /// Build a resolver using [`IndelRatio`] when `fuzzy_enabled` is set.
    pub fn from_config(store: S, settings: ResolverConfig) -> Self {
        let similarity: Option<Arc<dyn SimilarityMatcher>> = if settings.fuzzy_enabled {
            Some(Arc::new(IndelRatio))
        } else {
            None
        };
        Self::new(store, settings, similarity)
    }

    pub fn fuzzy_enabled(&self) -> bool {
        self.similarity.is_some()
    }

    /// Candidate phrases the resolver would try for `query`.
    pub fn candidates(&self, query: &str) -> Vec<String> {
        candidate_phrases(query, &self.stop_words)
    }

    /// Resolve a query to entry nodes, in discovery order.
    pub async fn resolve(&self, query: &str) -> Result<Vec<Node>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.candidates(query);
        log::debug!("Entity candidates: {:?}", candidates);

        let mut seen: HashSet<String> = HashSet::new();
        let mut resolved: Vec<Node> = Vec::new();

        for candidate in &candidates {
            for node in self.match_candidate(candidate).await? {
                if seen.insert(node.id.clone()) {
                    resolved.push(node);
                }
            }
        }

        log::info!(
            "Resolved {} entry nodes from {} candidates: {:?}",
            resolved.len(),
            candidates.len(),
            resolved.iter().map(|n| n.name.as_str()).collect::<Vec<_>>()
        );
        Ok(resolved)
    }

    async fn match_candidate(&self, candidate: &str) -> Result<Vec<Node>> {
        let exact = self
            .store
            .find_nodes(self.lookup(LookupKind::Exact(candidate.to_string()), self.settings.lookup_limit))
            .await?;
        if !exact.is_empty() {
            log::debug!("Exact match for '{}': {} nodes", candidate, exact.len());
            return Ok(exact);
        }

        let partial = self
            .store
            .find_nodes(self.lookup(LookupKind::Contains(candidate.to_string()), self.settings.lookup_limit))
            .await?;
        if !partial.is_empty() {
            log::debug!("Partial match for '{}': {} nodes", candidate, partial.len());
            return Ok(partial);
        }

        match &self.similarity {
            Some(matcher) if candidate.chars().count() >= MIN_FUZZY_CHARS => {
                self.fuzzy_match(candidate, matcher.as_ref()).await
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn fuzzy_match(&self, candidate: &str, matcher: &dyn SimilarityMatcher) -> Result<Vec<Node>> {
        let Some(primary) = self.settings.search_properties.first() else {
            return Ok(Vec::new());
        };
        let n = candidate.chars().count();
        let window = LookupKind::LengthBetween {
            min: (n - n / 2).max(1),
            max: n + n / 2,
        };
        let pool = self
            .store
            .find_nodes(self.lookup(window, self.settings.fuzzy_candidate_limit))
            .await?;

        let mut scored: Vec<(f64, Node)> = pool
            .into_iter()
            .filter_map(|node| {
                let value = match node.properties.get(primary) {
                    Some(serde_json::Value::String(s)) => s.to_lowercase(),
                    _ => return None,
                };
                let score = matcher.ratio(candidate, &value);
                (score >= self.settings.fuzzy_threshold).then_some((score, node))
            })
            .collect();

        // stable: equal scores keep store order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(self.settings.fuzzy_top_k);

        if !scored.is_empty() {
            log::debug!(
                "Fuzzy match for '{}': {:?}",
                candidate,
                scored.iter().map(|(s, n)| (n.name.as_str(), *s)).collect::<Vec<_>>()
            );
        }
        Ok(scored.into_iter().map(|(_, node)| node).collect())
    }

    fn lookup(&self, kind: LookupKind, limit: usize) -> NodeLookup {
        NodeLookup {
            kind,
            properties: self.settings.search_properties.clone(),
            labels: self.settings.node_labels.clone(),
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{named, props, RecordingStore};
    use serde_json::json;

    fn medical_nodes() -> Vec<Node> {
        vec![
            named("aspirin", "Drug", "Aspirin"),
            named("ibuprofen", "Drug", "Ibuprofen"),
            named("bleeding", "SideEffect", "Stomach Bleeding"),
            named("nausea", "SideEffect", "Nausea"),
            named("headache", "Disease", "Headache"),
        ]
    }

    fn resolver(store: RecordingStore) -> EntryNodeResolver<Arc<RecordingStore>> {
        EntryNodeResolver::from_config(Arc::new(store), ResolverConfig::default())
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fuzzy_resolves_misspelling() {
        let resolver = resolver(RecordingStore::with_nodes(medical_nodes()));
        let nodes = resolver.resolve("asprin side effects").await.unwrap();
        assert_eq!(ids(&nodes), vec!["aspirin"]);
    }

    #[tokio::test]
    async fn test_fuzzy_disabled_without_matcher() {
        let store = Arc::new(RecordingStore::with_nodes(medical_nodes()));
        let resolver = EntryNodeResolver::new(store.clone(), ResolverConfig::default(), None);
        assert!(!resolver.fuzzy_enabled());
        assert!(resolver.resolve("asprin").await.unwrap().is_empty());
        assert!(store
            .lookups()
            .iter()
            .all(|l| !matches!(l.kind, LookupKind::LengthBetween { .. })));
    }

    #[tokio::test]
    async fn test_longer_phrase_matched_first() {
        let resolver = resolver(RecordingStore::with_nodes(medical_nodes()));
        let nodes = resolver.resolve("Does aspirin cause stomach bleeding?").await.unwrap();
        assert_eq!(ids(&nodes), vec!["bleeding", "aspirin"]);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_and_unique() {
        let resolver = resolver(RecordingStore::with_nodes(medical_nodes()));
        let query = "aspirin and ibuprofen nausea aspirin";
        let first = resolver.resolve(query).await.unwrap();
        let second = resolver.resolve(query).await.unwrap();
        assert_eq!(first, second);

        let unique: HashSet<&str> = ids(&first).into_iter().collect();
        assert_eq!(unique.len(), first.len());
    }

    #[tokio::test]
    async fn test_empty_query_issues_no_lookup() {
        let store = Arc::new(RecordingStore::with_nodes(medical_nodes()));
        let resolver = EntryNodeResolver::from_config(store.clone(), ResolverConfig::default());
        assert!(resolver.resolve("   ").await.unwrap().is_empty());
        assert!(store.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_store_error_discards_earlier_matches() {
        // aspirin resolves on the 4th lookup; the exact lookup for nausea fails
        let store = Arc::new(RecordingStore::with_nodes(medical_nodes()).failing_on(5));
        let resolver = EntryNodeResolver::from_config(store.clone(), ResolverConfig::default());
        let result = resolver.resolve("aspirin nausea").await;

        assert!(matches!(result, Err(crate::KgragError::Database(_))));
        let lookups = store.lookups();
        assert_eq!(lookups.len(), 5);
        assert_eq!(lookups[3].kind, LookupKind::Exact("aspirin".into()));
        assert_eq!(lookups[4].kind, LookupKind::Exact("nausea".into()));
    }

    #[tokio::test]
    async fn test_exact_match_skips_later_stages() {
        let store = Arc::new(RecordingStore::with_nodes(medical_nodes()));
        let resolver = EntryNodeResolver::from_config(store.clone(), ResolverConfig::default());
        resolver.resolve("nausea").await.unwrap();
        let lookups = store.lookups();
        assert_eq!(lookups.len(), 1);
        assert_eq!(lookups[0].kind, LookupKind::Exact("nausea".into()));
        assert_eq!(lookups[0].limit, 10);
    }

    #[tokio::test]
    async fn test_fuzzy_window_and_limits() {
        let store = Arc::new(RecordingStore::with_nodes(Vec::new()));
        let resolver = EntryNodeResolver::from_config(store.clone(), ResolverConfig::default());
        resolver.resolve("aspirin").await.unwrap();
        let lookups = store.lookups();
        assert_eq!(lookups.len(), 3);
        assert_eq!(lookups[2].kind, LookupKind::LengthBetween { min: 4, max: 10 });
        assert_eq!(lookups[2].limit, 200);
    }

    #[tokio::test]
    async fn test_short_candidates_not_fuzzy_matched() {
        let store = Arc::new(RecordingStore::with_nodes(Vec::new()));
        let resolver = EntryNodeResolver::from_config(store.clone(), ResolverConfig::default());
        resolver.resolve("flu").await.unwrap();
        assert_eq!(store.lookups().len(), 2);
    }

    #[tokio::test]
    async fn test_fuzzy_keeps_top_k_by_score() {
        let nodes: Vec<Node> = (0..8).map(|i| named(&format!("n{}", i), "Drug", "Aspirin")).collect();
        let store = Arc::new(RecordingStore::with_nodes(nodes));
        let settings = ResolverConfig {
            fuzzy_top_k: 3,
            ..ResolverConfig::default()
        };
        let resolver = EntryNodeResolver::from_config(store, settings);
        let resolved = resolver.resolve("asprin").await.unwrap();
        assert_eq!(ids(&resolved), vec!["n0", "n1", "n2"]);
    }

    #[tokio::test]
    async fn test_injected_matcher_and_threshold() {
        let store = Arc::new(RecordingStore::with_nodes(medical_nodes()));
        let settings = ResolverConfig {
            fuzzy_threshold: 0.5,
            ..ResolverConfig::default()
        };
        let matcher = |_: &str, b: &str| if b == "ibuprofen" { 0.6 } else { 0.1 };
        let resolver = EntryNodeResolver::new(store, settings, Some(Arc::new(matcher)));
        let resolved = resolver.resolve("zzzzzzzz").await.unwrap();
        assert_eq!(ids(&resolved), vec!["ibuprofen"]);
    }

    #[tokio::test]
    async fn test_label_restriction_and_custom_properties() {
        let nodes = vec![
            Node::new("tylenol", "Drug", props(json!({"name": "Acetaminophen", "brand_name": "Tylenol"}))),
            named("tylenol_book", "Book", "Tylenol"),
        ];
        let store = Arc::new(RecordingStore::with_nodes(nodes));
        let settings = ResolverConfig {
            search_properties: vec!["name".into(), "brand_name".into()],
            node_labels: vec!["Drug".into()],
            ..ResolverConfig::default()
        };
        let resolver = EntryNodeResolver::from_config(store.clone(), settings);
        let resolved = resolver.resolve("tylenol").await.unwrap();
        assert_eq!(ids(&resolved), vec!["tylenol"]);
        assert_eq!(store.lookups()[0].labels, vec!["Drug".to_string()]);
    }

    #[tokio::test]
    async fn test_extra_stop_words_from_settings() {
        let store = Arc::new(RecordingStore::with_nodes(medical_nodes()));
        let settings = ResolverConfig {
            extra_stop_words: vec!["drug".into()],
            ..ResolverConfig::default()
        };
        let resolver = EntryNodeResolver::from_config(store, settings);
        assert_eq!(resolver.candidates("drug aspirin"), vec!["aspirin"]);
    }
}
