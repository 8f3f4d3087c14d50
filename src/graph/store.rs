//! The graph store capability: typed read queries and the trait that runs them.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{EdgeRow, Node};
use crate::Result;

/// Which side of a directed relationship the entry nodes must occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    #[default]
    Source,
    Target,
    Either,
}

/// One step of a fixed chain: follow `relationship` outwards to a node
/// optionally restricted to `target_label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub relationship: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_label: Option<String>,
}

/// How a node lookup compares its term against the searched properties.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupKind {
    /// Case-insensitive equality with any searched property
    Exact(String),
    /// Case-insensitive substring of any searched property
    Contains(String),
    /// Character length of the first searched property within `[min, max]`
    LengthBetween { min: usize, max: usize },
}

/// A node lookup issued by the entry-node resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLookup {
    pub kind: LookupKind,
    /// Properties to compare; the first one is the primary property.
    pub properties: Vec<String>,
    /// Restrict to these labels; empty means any label.
    pub labels: Vec<String>,
    pub limit: usize,
}

/// A traversal issued by the strategy engine. Each variant is one query shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalQuery {
    /// Relationships touching the entry ids on the anchored side.
    /// `relationship: None` matches any type.
    SingleHop {
        entry_ids: Vec<String>,
        relationship: Option<String>,
        source_label: Option<String>,
        target_label: Option<String>,
        anchor: Anchor,
        limit: usize,
    },
    /// Directed paths following `hops` in order from the entry ids, unrolled.
    FixedPath {
        entry_ids: Vec<String>,
        entry_label: Option<String>,
        hops: Vec<Hop>,
        path_limit: usize,
    },
    /// Undirected paths of `min_hops..=max_hops` from the entry ids that do
    /// not end where they started, unrolled.
    VariablePath {
        entry_ids: Vec<String>,
        min_hops: usize,
        max_hops: usize,
        path_limit: usize,
    },
    /// One shortest undirected path per pair, up to `max_hops`, unrolled.
    ShortestPaths {
        pairs: Vec<(String, String)>,
        max_hops: usize,
        path_limit: usize,
    },
    /// Relationships between entry ids and nodes adjacent to at least
    /// `min_connections` distinct entry ids.
    SharedNeighbors {
        entry_ids: Vec<String>,
        min_connections: usize,
    },
}

impl TraversalQuery {
    /// Short name of the query shape, for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            TraversalQuery::SingleHop { .. } => "single_hop",
            TraversalQuery::FixedPath { .. } => "fixed_path",
            TraversalQuery::VariablePath { .. } => "variable_path",
            TraversalQuery::ShortestPaths { .. } => "shortest_paths",
            TraversalQuery::SharedNeighbors { .. } => "shared_neighbors",
        }
    }
}

/// A read-only property-graph store.
///
/// Implementations must be safe to call from concurrent tasks; the core never
/// retries a failed query.
pub trait GraphStore: Send + Sync {
    /// Nodes matching a resolver lookup, in a stable order.
    fn find_nodes(&self, lookup: NodeLookup) -> impl Future<Output = Result<Vec<Node>>> + Send;

    /// Relationship rows for a traversal query.
    fn match_edges(&self, query: TraversalQuery) -> impl Future<Output = Result<Vec<EdgeRow>>> + Send;
}

impl<S: GraphStore> GraphStore for Arc<S> {
    fn find_nodes(&self, lookup: NodeLookup) -> impl Future<Output = Result<Vec<Node>>> + Send {
        (**self).find_nodes(lookup)
    }

    fn match_edges(&self, query: TraversalQuery) -> impl Future<Output = Result<Vec<EdgeRow>>> + Send {
        (**self).match_edges(query)
    }
}
