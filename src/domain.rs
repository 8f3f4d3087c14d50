//! Domain configuration: intent keywords, traversal patterns and relationship
//! sentence templates, read from one JSON or YAML file.
//!
//! ```json
//! {
//!   "intent_patterns": {
//!     "side_effects": {"keywords": ["side effect"], "strategy": "targeted", "relationship": "CAUSES"}
//!   },
//!   "relationship_templates": {"CAUSES": "{source} may cause {target}"},
//!   "general_traversal": {"node_limit": 30}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::context::ContextFormatter;
use crate::error::{KgragError, Result};
use crate::intent::IntentClassifier;
use crate::traversal::pattern::DEFAULT_GENERAL_NODE_LIMIT;
use crate::traversal::PatternRegistry;

#[derive(Debug, Deserialize)]
struct RawDomainConfig {
    intent_patterns: serde_json::Map<String, Value>,
    #[serde(default)]
    relationship_templates: BTreeMap<String, String>,
    #[serde(default)]
    general_traversal: GeneralTraversal,
}

#[derive(Debug, Deserialize)]
struct GeneralTraversal {
    #[serde(default = "default_node_limit")]
    node_limit: usize,
}

impl Default for GeneralTraversal {
    fn default() -> Self {
        Self {
            node_limit: DEFAULT_GENERAL_NODE_LIMIT,
        }
    }
}

fn default_node_limit() -> usize {
    DEFAULT_GENERAL_NODE_LIMIT
}

/// Everything a query pipeline needs from the domain config.
#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub registry: PatternRegistry,
    pub classifier: IntentClassifier,
    pub formatter: ContextFormatter,
}

impl DomainConfig {
    /// Load a domain config, YAML for `.yaml`/`.yml` and JSON otherwise.
    ///
    /// Bad templates and a zero node limit fail the load; individual bad
    /// traversal patterns only fail the intent that uses them.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let raw: RawDomainConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml_ng::from_str(&content)
                .map_err(|e| KgragError::Parse(format!("YAML parse error in {}: {}", path.display(), e)))?,
            _ => serde_json::from_str(&content)
                .map_err(|e| KgragError::Parse(format!("JSON parse error in {}: {}", path.display(), e)))?,
        };
        let config = Self::from_raw(raw)?;
        log::info!(
            "Loaded domain config {}: {} intents ({} invalid)",
            path.display(),
            config.registry.len(),
            config.registry.invalid_intents().len()
        );
        Ok(config)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Self::from_raw(serde_json::from_value(value)?)
    }

    fn from_raw(raw: RawDomainConfig) -> Result<Self> {
        if raw.general_traversal.node_limit == 0 {
            return Err(KgragError::Config(
                "general_traversal.node_limit must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            registry: PatternRegistry::from_intent_patterns(&raw.intent_patterns, raw.general_traversal.node_limit),
            classifier: IntentClassifier::from_intent_patterns(&raw.intent_patterns),
            formatter: ContextFormatter::from_templates(&raw.relationship_templates)?,
        })
    }
}
