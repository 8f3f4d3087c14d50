//! Typed traversal patterns and the per-intent registry.
//!
//! Patterns are parsed and validated once when the domain config is loaded.
//! An invalid entry is kept in the registry as an error message so that only
//! the intent that uses it fails; the rest of the registry stays usable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KgragError, Result};
use crate::graph::{Anchor, Hop, StrategyKind};

/// Node limit of the `general` fallback when the domain config sets none.
pub const DEFAULT_GENERAL_NODE_LIMIT: usize = 30;

fn default_min_hops() -> usize {
    1
}

fn default_max_hops() -> usize {
    2
}

fn default_shortest_max_hops() -> usize {
    6
}

fn default_min_connections() -> usize {
    2
}

/// How to traverse from the entry nodes for one intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum TraversalPattern {
    /// One named relationship, one hop.
    Targeted {
        relationship: String,
        #[serde(default)]
        source_label: Option<String>,
        #[serde(default)]
        target_label: Option<String>,
        #[serde(default, rename = "entry_anchor")]
        anchor: Anchor,
    },
    /// A fixed directed chain of relationships.
    Chained {
        hops: Vec<Hop>,
        #[serde(default)]
        entry_label: Option<String>,
    },
    /// Any relationships within a hop range, either direction.
    VariableHop {
        #[serde(default = "default_min_hops")]
        min_hops: usize,
        #[serde(default = "default_max_hops")]
        max_hops: usize,
    },
    /// Connect pairs of entry nodes.
    ShortestPath {
        #[serde(default = "default_shortest_max_hops")]
        max_hops: usize,
    },
    /// Nodes linked to several entry nodes at once.
    SharedNeighbor {
        #[serde(default = "default_min_connections")]
        min_connections: usize,
    },
}

impl TraversalPattern {
    pub fn kind(&self) -> StrategyKind {
        match self {
            TraversalPattern::Targeted { .. } => StrategyKind::Targeted,
            TraversalPattern::Chained { .. } => StrategyKind::Chained,
            TraversalPattern::VariableHop { .. } => StrategyKind::VariableHop,
            TraversalPattern::ShortestPath { .. } => StrategyKind::ShortestPath,
            TraversalPattern::SharedNeighbor { .. } => StrategyKind::SharedNeighbor,
        }
    }

    /// Parse one `intent_patterns` entry. Keys the pattern does not use
    /// (`keywords`, descriptions) are ignored; a missing `strategy` means
    /// `targeted`.
    pub fn from_entry(entry: &Value) -> std::result::Result<Self, String> {
        let Value::Object(fields) = entry else {
            return Err("pattern must be an object".to_string());
        };
        let mut fields = fields.clone();
        fields
            .entry("strategy")
            .or_insert_with(|| Value::String("targeted".to_string()));

        let pattern: TraversalPattern =
            serde_json::from_value(Value::Object(fields)).map_err(|e| e.to_string())?;
        pattern.validate()?;
        Ok(pattern)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            TraversalPattern::Targeted { relationship, .. } => {
                if relationship.trim().is_empty() {
                    return Err("targeted pattern needs a relationship".to_string());
                }
            }
            TraversalPattern::Chained { hops, .. } => {
                if hops.is_empty() {
                    return Err("chained pattern needs at least one hop".to_string());
                }
                if let Some(i) = hops.iter().position(|h| h.relationship.trim().is_empty()) {
                    return Err(format!("chained hop {} has no relationship", i));
                }
            }
            TraversalPattern::VariableHop { min_hops, max_hops } => {
                if *min_hops == 0 || min_hops > max_hops {
                    return Err(format!(
                        "variable_hop needs 1 <= min_hops <= max_hops, got {}..{}",
                        min_hops, max_hops
                    ));
                }
            }
            TraversalPattern::ShortestPath { max_hops } => {
                if *max_hops == 0 {
                    return Err("shortest_path needs max_hops >= 1".to_string());
                }
            }
            TraversalPattern::SharedNeighbor { min_connections } => {
                if *min_connections == 0 {
                    return Err("shared_neighbor needs min_connections >= 1".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Intent name -> traversal pattern. Immutable once built.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: HashMap<String, std::result::Result<TraversalPattern, String>>,
    general_node_limit: usize,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self {
            patterns: HashMap::new(),
            general_node_limit: DEFAULT_GENERAL_NODE_LIMIT,
        }
    }
}

impl PatternRegistry {
    pub fn new(general_node_limit: usize) -> Self {
        Self {
            patterns: HashMap::new(),
            general_node_limit,
        }
    }

    /// Build from the `intent_patterns` object of a domain config.
    pub fn from_intent_patterns(intent_patterns: &serde_json::Map<String, Value>, general_node_limit: usize) -> Self {
        let mut registry = Self::new(general_node_limit);
        for (intent, entry) in intent_patterns {
            let parsed = TraversalPattern::from_entry(entry);
            if let Err(reason) = &parsed {
                log::warn!("Invalid traversal pattern for intent '{}': {}", intent, reason);
            }
            registry.patterns.insert(intent.clone(), parsed);
        }
        registry
    }

    /// The pattern for `intent`: `Ok(None)` when no pattern is configured,
    /// a config error when the configured entry is invalid.
    pub fn get(&self, intent: &str) -> Result<Option<&TraversalPattern>> {
        match self.patterns.get(intent) {
            None => Ok(None),
            Some(Ok(pattern)) => Ok(Some(pattern)),
            Some(Err(reason)) => Err(KgragError::Config(format!(
                "invalid traversal pattern for intent '{}': {}",
                intent, reason
            ))),
        }
    }

    pub fn general_node_limit(&self) -> usize {
        self.general_node_limit
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Intents whose entries failed validation.
    pub fn invalid_intents(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .patterns
            .iter()
            .filter(|(_, p)| p.is_err())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> std::result::Result<TraversalPattern, String> {
        TraversalPattern::from_entry(&value)
    }

    #[test]
    fn test_missing_strategy_is_targeted() {
        let pattern = parse(json!({"keywords": ["treat"], "relationship": "TREATS", "entry_anchor": "target"})).unwrap();
        assert_eq!(
            pattern,
            TraversalPattern::Targeted {
                relationship: "TREATS".into(),
                source_label: None,
                target_label: None,
                anchor: Anchor::Target,
            }
        );
        assert_eq!(pattern.kind(), StrategyKind::Targeted);
    }

    #[test]
    fn test_defaults_applied() {
        assert_eq!(
            parse(json!({"strategy": "variable_hop"})).unwrap(),
            TraversalPattern::VariableHop { min_hops: 1, max_hops: 2 }
        );
        assert_eq!(
            parse(json!({"strategy": "shortest_path"})).unwrap(),
            TraversalPattern::ShortestPath { max_hops: 6 }
        );
        assert_eq!(
            parse(json!({"strategy": "shared_neighbor"})).unwrap(),
            TraversalPattern::SharedNeighbor { min_connections: 2 }
        );
    }

    #[test]
    fn test_chained_hops_parse() {
        let pattern = parse(json!({
            "strategy": "chained",
            "entry_label": "Drug",
            "hops": [
                {"relationship": "CAUSES", "target_label": "SideEffect"},
                {"relationship": "INCREASES_RISK_OF"}
            ]
        }))
        .unwrap();
        let TraversalPattern::Chained { hops, entry_label } = pattern else {
            panic!("expected chained pattern");
        };
        assert_eq!(entry_label.as_deref(), Some("Drug"));
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[1].target_label, None);
    }

    #[test]
    fn test_malformed_patterns_rejected() {
        assert!(parse(json!({"strategy": "chained", "hops": []})).is_err());
        assert!(parse(json!({"strategy": "chained"})).is_err());
        assert!(parse(json!({"strategy": "variable_hop", "min_hops": 0})).is_err());
        assert!(parse(json!({"strategy": "variable_hop", "min_hops": 3, "max_hops": 2})).is_err());
        assert!(parse(json!({"strategy": "shortest_path", "max_hops": 0})).is_err());
        assert!(parse(json!({"strategy": "teleport"})).is_err());
        assert!(parse(json!({"keywords": ["x"]})).is_err());
        assert!(parse(json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_registry_isolates_invalid_entries() {
        let patterns = json!({
            "broken": {"strategy": "chained", "hops": []},
            "side_effects": {"relationship": "CAUSES"}
        });
        let registry = PatternRegistry::from_intent_patterns(patterns.as_object().unwrap(), 30);
        assert_eq!(registry.len(), 2);
        assert!(matches!(registry.get("broken"), Err(KgragError::Config(_))));
        assert!(registry.get("side_effects").unwrap().is_some());
        assert!(registry.get("unknown").unwrap().is_none());
        assert_eq!(registry.invalid_intents(), vec!["broken"]);
    }
}
