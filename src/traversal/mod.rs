//! Intent-driven traversal: pick the intent's pattern, turn it into one typed
//! graph query, run it and assemble the rows into a [`Subgraph`].

pub mod assemble;
pub mod pattern;

use std::collections::HashSet;

use crate::config::TraversalLimits;
use crate::graph::{Anchor, GraphStore, Hop, Node, StrategyKind, Subgraph, TraversalQuery};
use crate::Result;

pub use assemble::assemble;
pub use pattern::{PatternRegistry, TraversalPattern};

/// The query a strategy resolves to for a given set of entry ids.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalPlan {
    pub strategy: StrategyKind,
    pub query: TraversalQuery,
    pub hop_depth: usize,
}

pub struct TraversalEngine<S> {
    store: S,
    registry: PatternRegistry,
    limits: TraversalLimits,
}

impl<S: GraphStore> TraversalEngine<S> {
    pub fn new(store: S, registry: PatternRegistry, limits: TraversalLimits) -> Self {
        Self {
            store,
            registry,
            limits,
        }
    }

    /// Traverse from `entry_nodes` using the pattern configured for `intent`.
    ///
    /// An empty entry set returns [`Subgraph::empty`] without touching the
    /// store or the registry. Intents without a pattern fall back to an
    /// undirected single hop. An intent whose pattern failed validation
    /// returns [`crate::KgragError::Config`].
    pub async fn traverse(&self, entry_nodes: &[Node], intent: &str) -> Result<Subgraph> {
        if entry_nodes.is_empty() {
            return Ok(Subgraph::empty());
        }

        let entry_ids = unique_ids(entry_nodes);
        let plan = self.plan(&entry_ids, intent)?;
        log::debug!(
            "Intent '{}' -> {} via {} from {} entry nodes",
            intent,
            plan.strategy,
            plan.query.shape(),
            entry_ids.len()
        );

        let rows = self.store.match_edges(plan.query).await?;
        let subgraph = assemble(rows, entry_nodes, plan.strategy, plan.hop_depth);
        log::info!(
            "Traversal {} (depth {}): {} nodes, {} relationships",
            subgraph.strategy,
            subgraph.hop_depth,
            subgraph.nodes.len(),
            subgraph.relationships.len()
        );
        Ok(subgraph)
    }

    /// Build the query `intent` would run from `entry_ids`.
    pub fn plan(&self, entry_ids: &[String], intent: &str) -> Result<TraversalPlan> {
        let Some(pattern) = self.registry.get(intent)? else {
            return Ok(TraversalPlan {
                strategy: StrategyKind::General,
                query: TraversalQuery::SingleHop {
                    entry_ids: entry_ids.to_vec(),
                    relationship: None,
                    source_label: None,
                    target_label: None,
                    anchor: Anchor::Either,
                    limit: self.registry.general_node_limit(),
                },
                hop_depth: 1,
            });
        };

        let entry_ids = entry_ids.to_vec();
        let (query, hop_depth) = match pattern {
            TraversalPattern::Targeted {
                relationship,
                source_label,
                target_label,
                anchor,
            } => (
                TraversalQuery::SingleHop {
                    entry_ids,
                    relationship: Some(relationship.clone()),
                    source_label: label_filter(source_label),
                    target_label: label_filter(target_label),
                    anchor: *anchor,
                    limit: self.limits.targeted_row_limit,
                },
                1,
            ),
            TraversalPattern::Chained { hops, entry_label } => {
                let hops: Vec<_> = hops
                    .iter()
                    .map(|hop| Hop {
                        relationship: hop.relationship.clone(),
                        target_label: label_filter(&hop.target_label),
                    })
                    .collect();
                let depth = hops.len();
                (
                    TraversalQuery::FixedPath {
                        entry_ids,
                        entry_label: label_filter(entry_label),
                        hops,
                        path_limit: self.limits.chained_path_limit,
                    },
                    depth,
                )
            }
            TraversalPattern::VariableHop { min_hops, max_hops } => (
                TraversalQuery::VariablePath {
                    entry_ids,
                    min_hops: *min_hops,
                    max_hops: *max_hops,
                    path_limit: self.limits.variable_hop_path_limit,
                },
                *max_hops,
            ),
            TraversalPattern::ShortestPath { max_hops } => {
                let pairs = entry_pairs(&entry_ids);
                let query = if pairs.is_empty() {
                    // a lone entry node has nothing to connect to: explore around it
                    TraversalQuery::VariablePath {
                        entry_ids,
                        min_hops: 1,
                        max_hops: *max_hops,
                        path_limit: self.limits.variable_hop_path_limit,
                    }
                } else {
                    TraversalQuery::ShortestPaths {
                        pairs,
                        max_hops: *max_hops,
                        path_limit: self.limits.shortest_path_limit,
                    }
                };
                (query, *max_hops)
            }
            TraversalPattern::SharedNeighbor { min_connections } => {
                let min_connections = (*min_connections).min(entry_ids.len());
                (
                    TraversalQuery::SharedNeighbors {
                        entry_ids,
                        min_connections,
                    },
                    1,
                )
            }
        };

        Ok(TraversalPlan {
            strategy: pattern.kind(),
            query,
            hop_depth,
        })
    }
}

fn unique_ids(nodes: &[Node]) -> Vec<String> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter(|n| seen.insert(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect()
}

/// Empty labels mean "no filter".
fn label_filter(label: &Option<String>) -> Option<String> {
    label.as_ref().filter(|l| !l.trim().is_empty()).cloned()
}

/// Every unordered pair of distinct ids, each as `(smaller, larger)`.
fn entry_pairs(entry_ids: &[String]) -> Vec<(String, String)> {
    let mut sorted: Vec<&String> = entry_ids.iter().collect();
    sorted.sort();
    sorted.dedup();
    let mut pairs = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            pairs.push(((*a).clone(), (*b).clone()));
        }
    }
    pairs
}
