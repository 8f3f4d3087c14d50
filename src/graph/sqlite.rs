//! SQLite-backed property graph.
//!
//! Nodes live in `graph_nodes` with their properties as a JSON object, edges in
//! `graph_edges`. Single-hop and neighbor-intersection queries are plain SQL;
//! fixed chains are a k-way self join; variable-length and shortest paths are
//! walked breadth-first over cached adjacency lookups. Path results are
//! unrolled into their relationships, each relationship reported once per
//! query in first-seen order.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Statement};

use super::store::{Anchor, GraphStore, Hop, LookupKind, NodeLookup, TraversalQuery};
use super::{EdgeRow, Node, Properties};
use crate::db::Db;
use crate::Result;

const EDGE_SELECT: &str = "SELECT e.edge_id, e.source_id, s.label, s.properties_json, e.rel_type, \
     e.properties_json, e.target_id, t.label, t.properties_json \
     FROM graph_edges e \
     JOIN graph_nodes s ON s.node_id = e.source_id \
     JOIN graph_nodes t ON t.node_id = e.target_id";

const ENTRY_IDS: &str = "(SELECT value FROM json_each(?1))";

/// Graph store over the kgrag SQLite schema.
#[derive(Debug, Clone)]
pub struct SqliteGraphStore {
    db: Db,
}

impl SqliteGraphStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl GraphStore for SqliteGraphStore {
    async fn find_nodes(&self, lookup: NodeLookup) -> Result<Vec<Node>> {
        self.db.with_connection(move |conn| lookup_nodes(conn, &lookup)).await
    }

    async fn match_edges(&self, query: TraversalQuery) -> Result<Vec<EdgeRow>> {
        let start = Instant::now();
        let shape = query.shape();
        let rows = self.db.with_connection(move |conn| run_traversal(conn, &query)).await?;
        log::debug!("{} query took {:?}, returned {} rows", shape, start.elapsed(), rows.len());
        Ok(rows)
    }
}

/// JSON path addressing a top-level property, quoted so any key works.
fn json_path(property: &str) -> String {
    format!("$.\"{}\"", property)
}

fn ids_param(ids: &[String]) -> Result<String> {
    Ok(serde_json::to_string(ids)?)
}

fn parse_properties(raw: &str) -> Result<Properties> {
    Ok(serde_json::from_str(raw)?)
}

fn lookup_nodes(conn: &Connection, lookup: &NodeLookup) -> Result<Vec<Node>> {
    let Some(primary) = lookup.properties.first() else {
        return Ok(Vec::new());
    };

    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if !lookup.labels.is_empty() {
        clauses.push("label IN (SELECT value FROM json_each(?))".to_string());
        values.push(Value::Text(serde_json::to_string(&lookup.labels)?));
    }

    match &lookup.kind {
        LookupKind::Exact(term) | LookupKind::Contains(term) => {
            let comparison = match lookup.kind {
                LookupKind::Exact(_) => "lower(json_extract(properties_json, ?)) = ?",
                _ => "instr(lower(json_extract(properties_json, ?)), ?) > 0",
            };
            let mut any = Vec::with_capacity(lookup.properties.len());
            for property in &lookup.properties {
                any.push(comparison);
                values.push(Value::Text(json_path(property)));
                values.push(Value::Text(term.to_lowercase()));
            }
            clauses.push(format!("({})", any.join(" OR ")));
        }
        LookupKind::LengthBetween { min, max } => {
            clauses.push(
                "json_type(properties_json, ?) = 'text' \
                 AND length(json_extract(properties_json, ?)) BETWEEN ? AND ?"
                    .to_string(),
            );
            values.push(Value::Text(json_path(primary)));
            values.push(Value::Text(json_path(primary)));
            values.push(Value::Integer(*min as i64));
            values.push(Value::Integer(*max as i64));
        }
    }

    let sql = format!(
        "SELECT node_id, label, properties_json FROM graph_nodes WHERE {} ORDER BY node_id LIMIT ?",
        clauses.join(" AND ")
    );
    values.push(Value::Integer(lookup.limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(values.iter()))?;
    let mut nodes = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let label: String = row.get(1)?;
        let properties_json: String = row.get(2)?;
        nodes.push(Node::new(id, label, parse_properties(&properties_json)?));
    }
    Ok(nodes)
}

fn run_traversal(conn: &Connection, query: &TraversalQuery) -> Result<Vec<EdgeRow>> {
    match query {
        TraversalQuery::SingleHop {
            entry_ids,
            relationship,
            source_label,
            target_label,
            anchor,
            limit,
        } => {
            let anchor_clause = match anchor {
                Anchor::Source => format!("e.source_id IN {ENTRY_IDS}"),
                Anchor::Target => format!("e.target_id IN {ENTRY_IDS}"),
                Anchor::Either => {
                    format!("(e.source_id IN {ENTRY_IDS} OR e.target_id IN {ENTRY_IDS})")
                }
            };
            let sql = format!(
                "{EDGE_SELECT} WHERE {anchor_clause} \
                 AND (?2 IS NULL OR e.rel_type = ?2) \
                 AND (?3 IS NULL OR s.label = ?3) \
                 AND (?4 IS NULL OR t.label = ?4) \
                 ORDER BY e.edge_id LIMIT ?5"
            );
            let mut stmt = conn.prepare(&sql)?;
            collect_edge_rows(
                &mut stmt,
                params![ids_param(entry_ids)?, relationship, source_label, target_label, *limit as i64],
            )
        }
        TraversalQuery::FixedPath {
            entry_ids,
            entry_label,
            hops,
            path_limit,
        } => {
            let paths = fixed_paths(conn, entry_ids, entry_label.as_deref(), hops, *path_limit)?;
            unroll_paths(conn, &paths)
        }
        TraversalQuery::VariablePath {
            entry_ids,
            min_hops,
            max_hops,
            path_limit,
        } => {
            let mut adjacency = Adjacency::new(conn);
            let paths = variable_paths(&mut adjacency, entry_ids, *min_hops, *max_hops, *path_limit)?;
            unroll_paths(conn, &paths)
        }
        TraversalQuery::ShortestPaths {
            pairs,
            max_hops,
            path_limit,
        } => {
            let mut adjacency = Adjacency::new(conn);
            let mut paths = Vec::new();
            for (from, to) in pairs {
                if paths.len() >= *path_limit {
                    break;
                }
                if let Some(path) = shortest_path(&mut adjacency, from, to, *max_hops)? {
                    paths.push(path);
                }
            }
            unroll_paths(conn, &paths)
        }
        TraversalQuery::SharedNeighbors {
            entry_ids,
            min_connections,
        } => {
            let sql = format!(
                "WITH incident(entry_id, neighbor_id) AS ( \
                     SELECT source_id, target_id FROM graph_edges WHERE source_id IN {ENTRY_IDS} \
                     UNION \
                     SELECT target_id, source_id FROM graph_edges WHERE target_id IN {ENTRY_IDS} \
                 ), \
                 shared(node_id) AS ( \
                     SELECT neighbor_id FROM incident \
                     GROUP BY neighbor_id HAVING COUNT(DISTINCT entry_id) >= ?2 \
                 ) \
                 {EDGE_SELECT} \
                 WHERE (e.source_id IN {ENTRY_IDS} AND e.target_id IN (SELECT node_id FROM shared)) \
                    OR (e.target_id IN {ENTRY_IDS} AND e.source_id IN (SELECT node_id FROM shared)) \
                 ORDER BY e.edge_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            collect_edge_rows(&mut stmt, params![ids_param(entry_ids)?, *min_connections as i64])
        }
    }
}

/// Read rows produced by a statement that starts with [`EDGE_SELECT`].
fn collect_edge_rows(stmt: &mut Statement<'_>, params: impl rusqlite::Params) -> Result<Vec<EdgeRow>> {
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(read_edge_row(row)?);
    }
    Ok(out)
}

fn read_edge_row(row: &rusqlite::Row<'_>) -> Result<EdgeRow> {
    let source_props: String = row.get(3)?;
    let rel_props: String = row.get(5)?;
    let target_props: String = row.get(8)?;
    Ok(EdgeRow {
        source_id: row.get(1)?,
        source_label: row.get(2)?,
        source_props: parse_properties(&source_props)?,
        rel_type: row.get(4)?,
        rel_props: parse_properties(&rel_props)?,
        target_id: row.get(6)?,
        target_label: row.get(7)?,
        target_props: parse_properties(&target_props)?,
    })
}

/// Turn paths (edge id sequences) into rows, one per distinct edge.
fn unroll_paths(conn: &Connection, paths: &[Vec<i64>]) -> Result<Vec<EdgeRow>> {
    let mut seen = HashSet::new();
    let edge_ids: Vec<i64> = paths
        .iter()
        .flatten()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    let mut stmt = conn.prepare_cached(&format!("{EDGE_SELECT} WHERE e.edge_id = ?1"))?;
    let mut out = Vec::with_capacity(edge_ids.len());
    for edge_id in edge_ids {
        let mut rows = stmt.query([edge_id])?;
        if let Some(row) = rows.next()? {
            out.push(read_edge_row(row)?);
        }
    }
    Ok(out)
}

/// Directed paths following `hops` from the entry ids; each path is its edge ids.
fn fixed_paths(
    conn: &Connection,
    entry_ids: &[String],
    entry_label: Option<&str>,
    hops: &[Hop],
    path_limit: usize,
) -> Result<Vec<Vec<i64>>> {
    if hops.is_empty() {
        return Ok(Vec::new());
    }

    let edge_columns: Vec<String> = (1..=hops.len()).map(|i| format!("e{i}.edge_id")).collect();
    let mut sql = format!("SELECT {} FROM graph_nodes n0", edge_columns.join(", "));
    let mut values: Vec<Value> = Vec::new();

    for (i, hop) in hops.iter().enumerate() {
        let step = i + 1;
        sql.push_str(&format!(
            " JOIN graph_edges e{step} ON e{step}.source_id = n{i}.node_id AND e{step}.rel_type = ?"
        ));
        values.push(Value::Text(hop.relationship.clone()));
        if step > 1 {
            // a path never reuses a relationship
            sql.push_str(&format!(" AND e{step}.edge_id NOT IN ({})", edge_columns[..i].join(", ")));
        }
        sql.push_str(&format!(" JOIN graph_nodes n{step} ON n{step}.node_id = e{step}.target_id"));
        if let Some(label) = &hop.target_label {
            sql.push_str(&format!(" AND n{step}.label = ?"));
            values.push(Value::Text(label.clone()));
        }
    }

    sql.push_str(" WHERE n0.node_id IN (SELECT value FROM json_each(?))");
    values.push(Value::Text(ids_param(entry_ids)?));
    if let Some(label) = entry_label {
        sql.push_str(" AND n0.label = ?");
        values.push(Value::Text(label.to_string()));
    }
    sql.push_str(&format!(" ORDER BY {} LIMIT ?", edge_columns.join(", ")));
    values.push(Value::Integer(path_limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(values.iter()))?;
    let mut paths = Vec::new();
    while let Some(row) = rows.next()? {
        let path = (0..hops.len())
            .map(|i| row.get::<_, i64>(i))
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        paths.push(path);
    }
    Ok(paths)
}

/// Undirected neighbor lookups, memoized for the duration of one query.
struct Adjacency<'c> {
    conn: &'c Connection,
    cache: HashMap<String, Vec<(i64, String)>>,
}

impl<'c> Adjacency<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            cache: HashMap::new(),
        }
    }

    /// (edge id, node on the other end) for every edge touching `node_id`
    fn neighbors(&mut self, node_id: &str) -> Result<Vec<(i64, String)>> {
        if let Some(cached) = self.cache.get(node_id) {
            return Ok(cached.clone());
        }
        let mut stmt = self.conn.prepare_cached(
            "SELECT edge_id, CASE WHEN source_id = ?1 THEN target_id ELSE source_id END \
             FROM graph_edges WHERE source_id = ?1 OR target_id = ?1 ORDER BY edge_id",
        )?;
        let neighbors = stmt
            .query_map([node_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        self.cache.insert(node_id.to_string(), neighbors.clone());
        Ok(neighbors)
    }
}

/// Relationship-unique undirected paths, shortest lengths first, so the path
/// cap keeps the nearest neighborhood. Each length is walked depth-first and
/// the walk stops as soon as the cap is reached.
fn variable_paths(
    adjacency: &mut Adjacency<'_>,
    entry_ids: &[String],
    min_hops: usize,
    max_hops: usize,
    path_limit: usize,
) -> Result<Vec<Vec<i64>>> {
    let mut found = Vec::new();
    if max_hops == 0 || path_limit == 0 {
        return Ok(found);
    }

    let mut walk = PathWalk {
        adjacency,
        found: &mut found,
        path_limit,
    };
    for depth in min_hops.max(1)..=max_hops {
        for start in entry_ids {
            let mut edges = Vec::with_capacity(depth);
            if walk.extend(start, start, depth, &mut edges)? {
                return Ok(found);
            }
        }
    }
    Ok(found)
}

struct PathWalk<'a, 'c> {
    adjacency: &'a mut Adjacency<'c>,
    found: &'a mut Vec<Vec<i64>>,
    path_limit: usize,
}

impl PathWalk<'_, '_> {
    /// Extend `edges` from `end` until it holds `depth` edges. Returns true
    /// once the path cap is reached.
    fn extend(&mut self, start: &str, end: &str, depth: usize, edges: &mut Vec<i64>) -> Result<bool> {
        if edges.len() == depth {
            if end == start {
                return Ok(false);
            }
            self.found.push(edges.clone());
            return Ok(self.found.len() >= self.path_limit);
        }
        for (edge_id, neighbor) in self.adjacency.neighbors(end)? {
            if edges.contains(&edge_id) {
                continue;
            }
            edges.push(edge_id);
            let full = self.extend(start, &neighbor, depth, edges)?;
            edges.pop();
            if full {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// One shortest undirected path from `from` to `to` within `max_hops`.
fn shortest_path(
    adjacency: &mut Adjacency<'_>,
    from: &str,
    to: &str,
    max_hops: usize,
) -> Result<Option<Vec<i64>>> {
    let mut parent: HashMap<String, (String, i64)> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::from([from.to_string()]);
    let mut frontier = vec![from.to_string()];

    for _ in 0..max_hops {
        let mut next_frontier = Vec::new();
        for node in &frontier {
            for (edge_id, neighbor) in adjacency.neighbors(node)? {
                if !visited.insert(neighbor.clone()) {
                    continue;
                }
                parent.insert(neighbor.clone(), (node.clone(), edge_id));
                if neighbor == to {
                    return Ok(Some(rebuild_path(&parent, from, to)));
                }
                next_frontier.push(neighbor);
            }
        }
        if next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
    }
    Ok(None)
}

fn rebuild_path(parent: &HashMap<String, (String, i64)>, from: &str, to: &str) -> Vec<i64> {
    let mut edges = Vec::new();
    let mut current = to;
    while current != from {
        match parent.get(current) {
            Some((previous, edge_id)) => {
                edges.push(*edge_id);
                current = previous.as_str();
            }
            None => break,
        }
    }
    edges.reverse();
    edges
}
