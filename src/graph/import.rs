//! Load a graph document (JSON or YAML) into the SQLite property graph.
//!
//! Relationship endpoints may name a node by its `id` or, for hand-written
//! datasets, by its `name` property. Nodes without an id get a UUID.
//! Re-importing the same document is a no-op for relationships that already
//! exist with identical properties.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::params;
use serde::Deserialize;
use uuid::Uuid;

use super::Properties;
use crate::db::Db;
use crate::error::{KgragError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipRecord {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub relationships: Vec<RelationshipRecord>,
}

impl GraphDocument {
    /// Read a document, choosing YAML for `.yaml`/`.yml` and JSON otherwise.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml_ng::from_str(&content).map_err(|e| {
                KgragError::Parse(format!("YAML parse error in {}: {}", path.display(), e))
            }),
            _ => serde_json::from_str(&content).map_err(|e| {
                KgragError::Parse(format!("JSON parse error in {}: {}", path.display(), e))
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub nodes: usize,
    pub relationships: usize,
}

struct PreparedNode {
    id: String,
    label: String,
    properties_json: String,
}

struct PreparedEdge {
    source_id: String,
    rel_type: String,
    target_id: String,
    properties_json: String,
}

/// Assign ids and resolve relationship endpoints before touching the database.
fn prepare(document: GraphDocument) -> Result<(Vec<PreparedNode>, Vec<PreparedEdge>)> {
    let mut keys: HashMap<String, String> = HashMap::new();
    let mut nodes = Vec::with_capacity(document.nodes.len());

    for record in document.nodes {
        if record.label.trim().is_empty() {
            return Err(KgragError::InvalidInput("node without a label".to_string()));
        }
        let id = record.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        keys.insert(id.clone(), id.clone());
        nodes.push(PreparedNode {
            id,
            label: record.label,
            properties_json: serde_json::to_string(&record.properties)?,
        });
        if let Some(serde_json::Value::String(name)) = record.properties.get("name") {
            let id = nodes[nodes.len() - 1].id.clone();
            keys.entry(name.clone()).or_insert(id);
        }
    }

    let mut edges = Vec::with_capacity(document.relationships.len());
    for record in document.relationships {
        let resolve = |key: &str| {
            keys.get(key).cloned().ok_or_else(|| {
                KgragError::InvalidInput(format!(
                    "relationship {} references unknown node '{}'",
                    record.rel_type, key
                ))
            })
        };
        edges.push(PreparedEdge {
            source_id: resolve(&record.source)?,
            target_id: resolve(&record.target)?,
            properties_json: serde_json::to_string(&record.properties)?,
            rel_type: record.rel_type,
        });
    }

    Ok((nodes, edges))
}

/// Write a graph document into the database in one transaction.
pub async fn import_graph(db: &Db, document: GraphDocument) -> Result<ImportStats> {
    let (nodes, edges) = prepare(document)?;

    let stats = db
        .with_connection(move |conn| {
            let tx = conn.transaction()?;
            let mut stats = ImportStats::default();
            {
                let mut insert_node = tx.prepare(
                    "INSERT INTO graph_nodes (node_id, label, properties_json) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(node_id) DO UPDATE SET \
                         label = excluded.label, \
                         properties_json = excluded.properties_json",
                )?;
                for node in &nodes {
                    stats.nodes += insert_node.execute(params![node.id, node.label, node.properties_json])?;
                }

                let mut insert_edge = tx.prepare(
                    "INSERT INTO graph_edges (source_id, rel_type, target_id, properties_json) \
                     SELECT ?1, ?2, ?3, ?4 \
                     WHERE NOT EXISTS ( \
                         SELECT 1 FROM graph_edges \
                         WHERE source_id = ?1 AND rel_type = ?2 AND target_id = ?3 AND properties_json = ?4 \
                     )",
                )?;
                for edge in &edges {
                    stats.relationships += insert_edge.execute(params![
                        edge.source_id,
                        edge.rel_type,
                        edge.target_id,
                        edge.properties_json
                    ])?;
                }
            }
            tx.commit()?;
            Ok(stats)
        })
        .await?;

    log::info!(
        "Imported {} nodes and {} relationships into {}",
        stats.nodes,
        stats.relationships,
        db.path().display()
    );
    Ok(stats)
}
