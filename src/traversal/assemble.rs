//! Fold traversal rows into a [`Subgraph`].

use std::collections::HashSet;

use crate::graph::{Edge, EdgeRow, Node, StrategyKind, Subgraph};

/// Entry nodes first (deduplicated, order kept), then unseen row endpoints
/// source before target, and one relationship per row in row order.
pub fn assemble(rows: Vec<EdgeRow>, entry_nodes: &[Node], strategy: StrategyKind, hop_depth: usize) -> Subgraph {
    let mut seen: HashSet<String> = HashSet::new();
    let mut nodes: Vec<Node> = Vec::with_capacity(entry_nodes.len() + rows.len());
    let mut relationships: Vec<Edge> = Vec::with_capacity(rows.len());

    for node in entry_nodes {
        if seen.insert(node.id.clone()) {
            nodes.push(node.clone());
        }
    }

    for row in rows {
        let EdgeRow {
            source_id,
            source_label,
            source_props,
            rel_type,
            rel_props,
            target_id,
            target_label,
            target_props,
        } = row;

        if !source_id.is_empty() && seen.insert(source_id.clone()) {
            nodes.push(Node::new(source_id.clone(), source_label, source_props));
        }
        if !target_id.is_empty() && seen.insert(target_id.clone()) {
            nodes.push(Node::new(target_id.clone(), target_label, target_props));
        }

        if !source_id.is_empty() && !target_id.is_empty() {
            relationships.push(Edge {
                source_id,
                target_id,
                rel_type,
                properties: rel_props,
            });
        }
    }

    Subgraph {
        nodes,
        relationships,
        strategy,
        hop_depth,
    }
}
