//! Property-graph data model, the store capability and its SQLite backend.
//!
//! Every traversal strategy reduces to flat [`EdgeRow`]s, which the assembler
//! folds into a [`Subgraph`]. Nodes and edges are plain values: edges point at
//! nodes by id and never own them.

mod import;
mod sqlite;
mod store;

pub use import::{import_graph, GraphDocument, ImportStats};
pub use sqlite::SqliteGraphStore;
pub use store::{Anchor, GraphStore, Hop, LookupKind, NodeLookup, TraversalQuery};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute name -> scalar value, as stored on nodes and relationships.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Label used when the store reports a node without one.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A graph node. Identity is `id`; `name` mirrors the `name` property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub name: String,
    pub properties: Properties,
}

impl Node {
    /// Build a node, promoting the `name` property (empty when absent).
    pub fn new(id: impl Into<String>, label: impl Into<String>, properties: Properties) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            label: if label.is_empty() { UNKNOWN_LABEL.to_string() } else { label },
            name: display_name(&properties),
            properties,
        }
    }
}

fn display_name(properties: &Properties) -> String {
    match properties.get("name") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// A directed relationship between two nodes, referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub properties: Properties,
}

/// One relationship as returned by a traversal query, with both endpoints
/// described inline. Rows always carry the stored direction of the relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRow {
    pub source_id: String,
    pub source_label: String,
    pub source_props: Properties,
    pub rel_type: String,
    pub rel_props: Properties,
    pub target_id: String,
    pub target_label: String,
    pub target_props: Properties,
}

/// Which traversal algorithm produced a subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// No traversal ran (empty entry set)
    None,
    /// Fallback for intents without a configured pattern
    General,
    Targeted,
    Chained,
    VariableHop,
    ShortestPath,
    SharedNeighbor,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::None => "none",
            StrategyKind::General => "general",
            StrategyKind::Targeted => "targeted",
            StrategyKind::Chained => "chained",
            StrategyKind::VariableHop => "variable_hop",
            StrategyKind::ShortestPath => "shortest_path",
            StrategyKind::SharedNeighbor => "shared_neighbor",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The retrieval result handed to the context formatter.
///
/// `nodes` has unique ids with entry nodes first; `relationships` keeps one
/// edge per traversal row and is not deduplicated. `hop_depth` is the
/// furthest distance the strategy was configured to reach, not the distance
/// actually found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Edge>,
    pub strategy: StrategyKind,
    pub hop_depth: usize,
}

impl Subgraph {
    /// The canonical result for an empty entry set.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            relationships: Vec::new(),
            strategy: StrategyKind::None,
            hop_depth: 0,
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }
}
