//! In-memory graph store that records the queries it receives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::graph::{EdgeRow, GraphStore, LookupKind, Node, NodeLookup, Properties, TraversalQuery};
use crate::{KgragError, Result};

#[derive(Default)]
pub(crate) struct RecordingStore {
    nodes: Vec<Node>,
    rows: Vec<EdgeRow>,
    pub lookups: Mutex<Vec<NodeLookup>>,
    pub traversals: Mutex<Vec<TraversalQuery>>,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl RecordingStore {
    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes, ..Self::default() }
    }

    pub fn with_rows(rows: Vec<EdgeRow>) -> Self {
        Self { rows, ..Self::default() }
    }

    /// Fail the `call`-th store call (1-based, lookups and traversals
    /// counted together) with a database error.
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    fn check_failure(&self) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(KgragError::Database(rusqlite::Error::InvalidQuery));
        }
        Ok(())
    }

    pub fn lookups(&self) -> Vec<NodeLookup> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn traversals(&self) -> Vec<TraversalQuery> {
        self.traversals.lock().unwrap().clone()
    }

    fn text(node: &Node, property: &str) -> Option<String> {
        match node.properties.get(property) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn matches(node: &Node, lookup: &NodeLookup) -> bool {
        if !lookup.labels.is_empty() && !lookup.labels.contains(&node.label) {
            return false;
        }
        match &lookup.kind {
            LookupKind::Exact(term) => lookup
                .properties
                .iter()
                .filter_map(|p| Self::text(node, p))
                .any(|v| v.to_lowercase() == term.to_lowercase()),
            LookupKind::Contains(term) => lookup
                .properties
                .iter()
                .filter_map(|p| Self::text(node, p))
                .any(|v| v.to_lowercase().contains(&term.to_lowercase())),
            LookupKind::LengthBetween { min, max } => lookup
                .properties
                .first()
                .and_then(|p| Self::text(node, p))
                .map(|v| (*min..=*max).contains(&v.chars().count()))
                .unwrap_or(false),
        }
    }
}

impl GraphStore for RecordingStore {
    async fn find_nodes(&self, lookup: NodeLookup) -> Result<Vec<Node>> {
        self.lookups.lock().unwrap().push(lookup.clone());
        self.check_failure()?;
        let mut found: Vec<Node> = self
            .nodes
            .iter()
            .filter(|n| Self::matches(n, &lookup))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.truncate(lookup.limit);
        Ok(found)
    }

    async fn match_edges(&self, query: TraversalQuery) -> Result<Vec<EdgeRow>> {
        self.traversals.lock().unwrap().push(query);
        self.check_failure()?;
        Ok(self.rows.clone())
    }
}

/// A node with a `name` property.
pub(crate) fn named(id: &str, label: &str, name: &str) -> Node {
    Node::new(id, label, props(json!({ "name": name })))
}

pub(crate) fn props(value: Value) -> Properties {
    value.as_object().cloned().unwrap_or_default()
}

/// A row between two named nodes, with names equal to their ids.
pub(crate) fn row(source: &str, rel_type: &str, target: &str) -> EdgeRow {
    EdgeRow {
        source_id: source.to_string(),
        source_label: "Entity".to_string(),
        source_props: props(json!({ "name": source })),
        rel_type: rel_type.to_string(),
        rel_props: Properties::new(),
        target_id: target.to_string(),
        target_label: "Entity".to_string(),
        target_props: props(json!({ "name": target })),
    }
}

/// A migrated throwaway database loaded with `graph`.
pub(crate) async fn sqlite_store(graph: Value) -> (crate::graph::SqliteGraphStore, tempfile::TempDir) {
    use crate::db::{migrate, Db};
    use crate::graph::{import_graph, GraphDocument};
    use std::path::Path;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let db = Db::new(temp_dir.path().join("graph.db"));
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await
        .unwrap();
    let document: GraphDocument = serde_json::from_value(graph).unwrap();
    import_graph(&db, document).await.unwrap();
    (crate::graph::SqliteGraphStore::new(db), temp_dir)
}

pub(crate) fn medical_graph() -> Value {
    json!({
        "nodes": [
            {"id": "aspirin", "label": "Drug", "properties": {"name": "Aspirin", "class": "NSAID"}},
            {"id": "ibuprofen", "label": "Drug", "properties": {"name": "Ibuprofen"}},
            {"id": "headache", "label": "Disease", "properties": {"name": "Headache"}},
            {"id": "severe_pain", "label": "Symptom", "properties": {"name": "Severe Pain"}},
            {"id": "nausea", "label": "SideEffect", "properties": {"name": "Nausea"}},
            {"id": "bleeding", "label": "SideEffect", "properties": {"name": "Stomach Bleeding"}},
            {"id": "ulcer", "label": "Disease", "properties": {"name": "Peptic Ulcer"}}
        ],
        "relationships": [
            {"source": "aspirin", "target": "nausea", "type": "CAUSES"},
            {"source": "aspirin", "target": "bleeding", "type": "CAUSES"},
            {"source": "aspirin", "target": "headache", "type": "TREATS"},
            {"source": "headache", "target": "severe_pain", "type": "HAS_SYMPTOM"},
            {"source": "bleeding", "target": "ulcer", "type": "INCREASES_RISK_OF"},
            {"source": "ibuprofen", "target": "nausea", "type": "CAUSES"}
        ]
    })
}
