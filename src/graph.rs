//! Graph - the public node/edge/attribute API over a SQLite file
//!
//! Every operation runs against the graph's single connection. Mutations
//! that touch more than one row run inside one transaction and are
//! committed before the call returns; sequences come back as lazy
//! [`Cursor`]s that stream rows page by page.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::codec;
use crate::config::{EndpointPolicy, GraphConfig};
use crate::edge::Edge;
use crate::node::Node;
use crate::storage::{self, Cursor};
use crate::value::Attributes;
use crate::{Error, Result};

const UPSERT_NODE: &str = r#"
INSERT INTO nodes (id, attrs) VALUES (?1, ?2)
ON CONFLICT(id) DO UPDATE SET attrs = excluded.attrs
"#;

const UPSERT_EDGE: &str = r#"
INSERT INTO edges (src, dst, attrs) VALUES (?1, ?2, ?3)
ON CONFLICT(src, dst) DO UPDATE SET attrs = excluded.attrs
"#;

const INSERT_NODE_IF_ABSENT: &str = "INSERT OR IGNORE INTO nodes (id) VALUES (?1)";
const INSERT_EDGE_IF_ABSENT: &str = "INSERT OR IGNORE INTO edges (src, dst) VALUES (?1, ?2)";

const SCAN_NODE_KEYS: &str = "SELECT rowid, id FROM nodes WHERE rowid > ?1 ORDER BY rowid LIMIT ?2";
const SCAN_NODES: &str =
    "SELECT rowid, id, attrs FROM nodes WHERE rowid > ?1 ORDER BY rowid LIMIT ?2";
const SCAN_EDGES: &str =
    "SELECT rowid, src, dst, attrs FROM edges WHERE rowid > ?1 ORDER BY rowid LIMIT ?2";
const SCAN_NEIGHBORS: &str =
    "SELECT rowid, dst FROM edges WHERE src = ?1 AND rowid > ?2 ORDER BY rowid LIMIT ?3";
const SCAN_PREDECESSORS: &str =
    "SELECT rowid, src FROM edges WHERE dst = ?1 AND rowid > ?2 ORDER BY rowid LIMIT ?3";

/// Which side of an edge a lookup starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Follow `src -> dst`
    Outgoing,
    /// Follow `dst -> src`
    Incoming,
}

impl Direction {
    /// `(column matched against the query, column returned)`
    fn columns(&self) -> (&'static str, &'static str) {
        match self {
            Direction::Outgoing => ("src", "dst"),
            Direction::Incoming => ("dst", "src"),
        }
    }
}

/// A directed property graph persisted in one SQLite database.
///
/// Node and edge identities are strings. Adding an existing node or edge
/// replaces its attributes; reading a missing node fails with
/// [`Error::NodeNotFound`].
#[derive(Debug)]
pub struct Graph {
    conn: Connection,
    path: Option<PathBuf>,
    config: GraphConfig,
}

impl Graph {
    /// Open a graph file with the default configuration (creates if doesn't exist)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, GraphConfig::default())
    }

    /// Open a graph file with an explicit configuration
    pub fn open_with(path: impl AsRef<Path>, config: GraphConfig) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let graph = Self::from_connection(conn, Some(path.to_path_buf()), config)?;
        tracing::info!("Opened graph {}", path.display());
        Ok(graph)
    }

    /// Open an in-memory graph (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(GraphConfig::default())
    }

    pub fn open_in_memory_with(config: GraphConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None, config)
    }

    fn from_connection(
        conn: Connection,
        path: Option<PathBuf>,
        config: GraphConfig,
    ) -> Result<Self> {
        storage::ensure_schema(&conn)?;
        storage::apply_pragmas(&conn, &config)?;
        Ok(Self { conn, path, config })
    }

    /// Release the connection, reporting any error from closing it
    pub fn close(self) -> Result<()> {
        let path = self.path.clone();
        self.conn.close().map_err(|(_, e)| Error::Storage(e))?;
        if let Some(path) = path {
            tracing::info!("Closed graph {}", path.display());
        }
        Ok(())
    }

    /// Backing file, `None` for in-memory graphs
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // ========== Node Operations ==========

    /// Insert a node or replace the attributes of an existing one
    pub fn add_node(&mut self, id: &str, attrs: &Attributes) -> Result<()> {
        let payload = codec::encode(attrs, self.config.compress)?;
        self.conn.execute(UPSERT_NODE, params![id, payload])?;
        Ok(())
    }

    /// Insert every key not already present, leaving existing nodes untouched.
    ///
    /// Returns the number of nodes created.
    pub fn add_nodes_from<I, S>(&mut self, keys: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tx = self.conn.transaction()?;
        let mut created = 0;
        {
            let mut stmt = tx.prepare_cached(INSERT_NODE_IF_ABSENT)?;
            for key in keys {
                created += stmt.execute([key.as_ref()])?;
            }
        }
        tx.commit()?;
        tracing::debug!("add_nodes_from created {} nodes", created);
        Ok(created)
    }

    /// Attribute mapping of a node
    pub fn node(&self, id: &str) -> Result<Attributes> {
        let payload: Option<Option<Vec<u8>>> = self
            .conn
            .query_row("SELECT attrs FROM nodes WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;

        match payload {
            Some(blob) => codec::decode(id, blob.as_deref()),
            None => Err(Error::NodeNotFound(id.to_string())),
        }
    }

    /// Item access: same as [`Graph::node`]
    pub fn get(&self, id: &str) -> Result<Attributes> {
        self.node(id)
    }

    /// Item assignment: replaces the node's attributes, same as [`Graph::add_node`]
    pub fn set(&mut self, id: &str, attrs: &Attributes) -> Result<()> {
        self.add_node(id, attrs)
    }

    pub fn has_node(&self, id: &str) -> Result<bool> {
        Ok(node_exists(&self.conn, id)?)
    }

    /// Delete a node and every edge touching it.
    ///
    /// Returns `false` if the node did not exist.
    pub fn remove_node(&mut self, id: &str) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let edges = tx.execute("DELETE FROM edges WHERE src = ?1 OR dst = ?1", [id])?;
        let removed = tx.execute("DELETE FROM nodes WHERE id = ?1", [id])?;
        tx.commit()?;
        tracing::debug!("remove_node {}: {} incident edges deleted", id, edges);
        Ok(removed > 0)
    }

    /// All node keys, in insertion order
    pub fn nodes(&self) -> Cursor<'_, String> {
        self.cursor(SCAN_NODE_KEYS, None, row_to_key)
    }

    /// All nodes with their attributes, in insertion order
    pub fn node_records(&self) -> Cursor<'_, Node> {
        self.cursor(SCAN_NODES, None, row_to_node)
    }

    /// One page of node keys (`page` counts from 0).
    ///
    /// A page past the end of the table is empty.
    pub fn nodes_page(&self, page: usize, size: usize) -> Result<Vec<String>> {
        let Some(offset) = page.checked_mul(size) else {
            return Ok(Vec::new());
        };
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM nodes ORDER BY rowid LIMIT ?1 OFFSET ?2")?;
        let keys = stmt
            .query_map(params![sql_int(size), sql_int(offset)], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }

    pub fn node_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn.query_row("SELECT n_nodes FROM count_nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Edge Operations ==========

    /// Insert an edge or replace the attributes of an existing one.
    ///
    /// Missing endpoints are handled according to the configured
    /// [`EndpointPolicy`].
    pub fn add_edge(&mut self, src: &str, dst: &str, attrs: &Attributes) -> Result<()> {
        let payload = codec::encode(attrs, self.config.compress)?;
        let policy = self.config.endpoint_policy;

        let tx = self.conn.transaction()?;
        resolve_endpoints(&tx, policy, &[src, dst])?;
        tx.execute(UPSERT_EDGE, params![src, dst, payload])?;
        tx.commit()?;
        Ok(())
    }

    /// Insert attribute-less edges, leaving existing edges untouched.
    ///
    /// All-or-nothing: under [`EndpointPolicy::Strict`] one unknown endpoint
    /// rejects the whole batch. Returns the number of edges created.
    pub fn add_edges_from<I, S, T>(&mut self, pairs: I) -> Result<usize>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let policy = self.config.endpoint_policy;
        let tx = self.conn.transaction()?;
        let mut created = 0;
        {
            let mut stmt = tx.prepare_cached(INSERT_EDGE_IF_ABSENT)?;
            for (src, dst) in pairs {
                let (src, dst) = (src.as_ref(), dst.as_ref());
                resolve_endpoints(&tx, policy, &[src, dst])?;
                created += stmt.execute([src, dst])?;
            }
        }
        tx.commit()?;
        tracing::debug!("add_edges_from created {} edges", created);
        Ok(created)
    }

    /// Attribute mapping of an edge
    pub fn edge(&self, src: &str, dst: &str) -> Result<Attributes> {
        let payload: Option<Option<Vec<u8>>> = self
            .conn
            .query_row(
                "SELECT attrs FROM edges WHERE src = ?1 AND dst = ?2",
                [src, dst],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(blob) => codec::decode(&edge_owner(src, dst), blob.as_deref()),
            None => Err(Error::EdgeNotFound {
                src: src.to_string(),
                dst: dst.to_string(),
            }),
        }
    }

    pub fn has_edge(&self, src: &str, dst: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM edges WHERE src = ?1 AND dst = ?2",
                [src, dst],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Delete one edge. Returns `false` if it did not exist.
    pub fn remove_edge(&mut self, src: &str, dst: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM edges WHERE src = ?1 AND dst = ?2", [src, dst])?;
        Ok(removed > 0)
    }

    /// All edges with their attributes, in insertion order
    pub fn edges(&self) -> Cursor<'_, Edge> {
        self.cursor(SCAN_EDGES, None, row_to_edge)
    }

    /// One page of edges (`page` counts from 0)
    pub fn edges_page(&self, page: usize, size: usize) -> Result<Vec<Edge>> {
        let Some(offset) = page.checked_mul(size) else {
            return Ok(Vec::new());
        };
        let mut stmt = self.conn.prepare_cached(
            "SELECT rowid, src, dst, attrs FROM edges ORDER BY rowid LIMIT ?1 OFFSET ?2",
        )?;
        let mut rows = stmt.query(params![sql_int(size), sql_int(offset)])?;

        let mut edges = Vec::new();
        while let Some(row) = rows.next()? {
            edges.push(row_to_edge(row)?);
        }
        Ok(edges)
    }

    pub fn edge_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn.query_row("SELECT n_edges FROM count_edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Adjacency ==========

    /// Targets of the edges leaving `id`.
    ///
    /// Empty for an unknown node; use [`Graph::has_node`] to tell the two
    /// apart.
    pub fn neighbors(&self, id: &str) -> Cursor<'_, String> {
        self.cursor(SCAN_NEIGHBORS, Some(id.to_string()), row_to_key)
    }

    /// Sources of the edges entering `id`
    pub fn predecessors(&self, id: &str) -> Cursor<'_, String> {
        self.cursor(SCAN_PREDECESSORS, Some(id.to_string()), row_to_key)
    }

    /// Neighbors of several nodes at once, keyed by the queried node.
    ///
    /// Nodes without outgoing edges are absent from the map.
    pub fn neighbors_from<S: AsRef<str>>(&self, ids: &[S]) -> Result<HashMap<String, Vec<String>>> {
        self.adjacency_from(ids, Direction::Outgoing)
    }

    /// Predecessors of several nodes at once, keyed by the queried node
    pub fn predecessors_from<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<HashMap<String, Vec<String>>> {
        self.adjacency_from(ids, Direction::Incoming)
    }

    /// Replace every outgoing edge of `id` with edges to `targets`
    pub fn set_neighbors<I, S>(&mut self, id: &str, targets: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.replace_adjacency(id, targets, Direction::Outgoing)
    }

    /// Replace every incoming edge of `id` with edges from `sources`
    pub fn set_predecessors<I, S>(&mut self, id: &str, sources: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.replace_adjacency(id, sources, Direction::Incoming)
    }

    /// Up to `n` neighbors of `id`, in random order
    pub fn random_neighbors(&self, id: &str, n: usize) -> Result<Vec<String>> {
        self.random_adjacent(id, n, Direction::Outgoing)
    }

    /// Up to `n` predecessors of `id`, in random order
    pub fn random_predecessors(&self, id: &str, n: usize) -> Result<Vec<String>> {
        self.random_adjacent(id, n, Direction::Incoming)
    }

    /// Edges whose endpoints are both in `ids`, as `(source, target)` pairs
    pub fn subgraph<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<(String, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = numbered_placeholders(ids.len());
        let sql = format!(
            "SELECT src, dst FROM edges WHERE src IN ({0}) AND dst IN ({0}) ORDER BY rowid",
            placeholders
        );
        let keys: Vec<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let pairs = stmt
            .query_map(params_from_iter(keys), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
        Ok(pairs)
    }

    /// Number of edges leaving `id`
    pub fn out_degree(&self, id: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges WHERE src = ?1", [id], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of edges entering `id`
    pub fn in_degree(&self, id: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges WHERE dst = ?1", [id], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Bulk Operations ==========

    /// Delete all nodes and edges
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM edges", [])?;
        tx.execute("DELETE FROM nodes", [])?;
        tx.commit()?;
        Ok(())
    }

    /// Get graph statistics
    pub fn stats(&self) -> Result<GraphStats> {
        let self_loops: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges WHERE src = dst", [], |row| row.get(0))?;

        Ok(GraphStats {
            nodes: self.node_count()?,
            edges: self.edge_count()?,
            self_loops: self_loops as usize,
        })
    }

    // ========== Helpers ==========

    fn cursor<T>(
        &self,
        sql: &'static str,
        key: Option<String>,
        map: fn(&Row<'_>) -> Result<T>,
    ) -> Cursor<'_, T> {
        Cursor::new(&self.conn, sql, key, map, self.config.page_size)
    }

    fn adjacency_from<S: AsRef<str>>(
        &self,
        ids: &[S],
        direction: Direction,
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        if ids.is_empty() {
            return Ok(adjacency);
        }

        let (matched, returned) = direction.columns();
        let sql = format!(
            "SELECT {0}, {1} FROM edges WHERE {0} IN ({2}) ORDER BY rowid",
            matched,
            returned,
            numbered_placeholders(ids.len())
        );
        let keys: Vec<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(keys))?;

        while let Some(row) = rows.next()? {
            let from: String = row.get(0)?;
            let to: String = row.get(1)?;
            adjacency.entry(from).or_default().push(to);
        }
        Ok(adjacency)
    }

    fn replace_adjacency<I, S>(&mut self, id: &str, others: I, direction: Direction) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let policy = self.config.endpoint_policy;
        let (matched, _) = direction.columns();

        let tx = self.conn.transaction()?;
        let dropped = tx.execute(&format!("DELETE FROM edges WHERE {} = ?1", matched), [id])?;
        {
            let mut stmt = tx.prepare_cached(INSERT_EDGE_IF_ABSENT)?;
            for other in others {
                let other = other.as_ref();
                let (src, dst) = match direction {
                    Direction::Outgoing => (id, other),
                    Direction::Incoming => (other, id),
                };
                resolve_endpoints(&tx, policy, &[src, dst])?;
                stmt.execute([src, dst])?;
            }
        }
        tx.commit()?;
        tracing::debug!("Replaced adjacency of {} ({} edges dropped)", id, dropped);
        Ok(())
    }

    fn random_adjacent(&self, id: &str, n: usize, direction: Direction) -> Result<Vec<String>> {
        let (matched, returned) = direction.columns();
        let sql = format!(
            "SELECT {1} FROM edges WHERE {0} = ?1 ORDER BY RANDOM() LIMIT ?2",
            matched, returned
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let ids = stmt
            .query_map(params![id, sql_int(n)], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}

/// Statistics about a graph
#[derive(Debug, Clone)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub self_loops: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph Statistics:")?;
        writeln!(f, "  Nodes: {}", self.nodes)?;
        writeln!(f, "  Edges: {}", self.edges)?;
        writeln!(f, "  Self-loops: {}", self.self_loops)
    }
}

fn node_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let found = conn
        .prepare_cached("SELECT 1 FROM nodes WHERE id = ?1")?
        .query_row([id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Apply the endpoint policy to the endpoints of an edge about to be written
fn resolve_endpoints(conn: &Connection, policy: EndpointPolicy, ids: &[&str]) -> Result<()> {
    match policy {
        EndpointPolicy::AutoCreate => {
            let mut stmt = conn.prepare_cached(INSERT_NODE_IF_ABSENT)?;
            for id in ids {
                stmt.execute([id])?;
            }
        }
        EndpointPolicy::Strict => {
            for id in ids {
                if !node_exists(conn, id)? {
                    return Err(Error::UnknownEndpoint(id.to_string()));
                }
            }
        }
    }
    Ok(())
}

/// Bind a count as a SQLite integer. Saturates instead of wrapping, since a
/// negative `LIMIT` means no limit at all.
fn sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// `?1, ?2, ..., ?n`
fn numbered_placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

fn edge_owner(src: &str, dst: &str) -> String {
    format!("edge {} -> {}", src, dst)
}

fn row_to_key(row: &Row<'_>) -> Result<String> {
    Ok(row.get(1)?)
}

fn row_to_node(row: &Row<'_>) -> Result<Node> {
    let key: String = row.get(1)?;
    let blob: Option<Vec<u8>> = row.get(2)?;
    let attributes = codec::decode(&key, blob.as_deref())?;
    Ok(Node { key, attributes })
}

fn row_to_edge(row: &Row<'_>) -> Result<Edge> {
    let source: String = row.get(1)?;
    let target: String = row.get(2)?;
    let blob: Option<Vec<u8>> = row.get(3)?;
    let attributes = codec::decode(&edge_owner(&source, &target), blob.as_deref())?;
    Ok(Edge {
        source,
        target,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn collect(cursor: Cursor<'_, String>) -> Vec<String> {
        cursor.collect::<Result<_>>().unwrap()
    }

    fn strict_graph() -> Graph {
        let config = GraphConfig::default().with_endpoint_policy(EndpointPolicy::Strict);
        Graph::open_in_memory_with(config).unwrap()
    }

    #[test]
    fn test_item_assignment_and_access() {
        let mut graph = Graph::open_in_memory().unwrap();
        let mary = attrs(&[("age", Value::from(32))]);

        graph.set("Mary", &mary).unwrap();
        assert_eq!(graph.get("Mary").unwrap(), mary);
    }

    #[test]
    fn test_add_node_replaces_attributes() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_node("a", &attrs(&[("x", Value::from(1)), ("y", Value::from(2))])).unwrap();
        graph.add_node("a", &attrs(&[("z", Value::from(3))])).unwrap();

        assert_eq!(graph.node("a").unwrap(), attrs(&[("z", Value::from(3))]));
        assert_eq!(graph.node_count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_keeps_scan_position() {
        let mut graph = Graph::open_in_memory().unwrap();
        for id in ["a", "b", "c"] {
            graph.add_node(id, &Attributes::new()).unwrap();
        }
        graph.add_node("a", &attrs(&[("v", Value::from(2))])).unwrap();

        assert_eq!(collect(graph.nodes()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_node_is_an_error() {
        let graph = Graph::open_in_memory().unwrap();
        assert!(matches!(graph.node("ghost"), Err(Error::NodeNotFound(ref id)) if id == "ghost"));
        assert!(!graph.has_node("ghost").unwrap());
    }

    #[test]
    fn test_neighbors_and_predecessors() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_node("A", &Attributes::new()).unwrap();
        graph.add_node("B", &Attributes::new()).unwrap();
        graph.add_edge("A", "B", &Attributes::new()).unwrap();

        assert_eq!(collect(graph.neighbors("A")), vec!["B"]);
        assert_eq!(collect(graph.predecessors("B")), vec!["A"]);
        assert!(collect(graph.neighbors("B")).is_empty());
        assert!(collect(graph.neighbors("nobody")).is_empty());
    }

    #[test]
    fn test_adjacency_follows_insertion_order() {
        let mut graph = Graph::open_in_memory().unwrap();
        for dst in ["d", "b", "c"] {
            graph.add_edge("a", dst, &Attributes::new()).unwrap();
        }
        graph.add_edge("x", "b", &Attributes::new()).unwrap();

        assert_eq!(collect(graph.neighbors("a")), vec!["d", "b", "c"]);
        assert_eq!(collect(graph.predecessors("b")), vec!["a", "x"]);
    }

    #[test]
    fn test_edge_upsert_is_single_row() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edge("a", "b", &attrs(&[("w", Value::from(1))])).unwrap();
        graph.add_edge("a", "b", &attrs(&[("w", Value::from(2))])).unwrap();
        graph.add_edge("a", "b", &attrs(&[("w", Value::from(3))])).unwrap();

        let edges: Vec<Edge> = graph.edges().collect::<Result<_>>().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].attributes, attrs(&[("w", Value::from(3))]));
        assert_eq!(graph.edge("a", "b").unwrap(), attrs(&[("w", Value::from(3))]));
    }

    #[test]
    fn test_edges_are_directed() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edge("a", "b", &Attributes::new()).unwrap();

        assert!(graph.has_edge("a", "b").unwrap());
        assert!(!graph.has_edge("b", "a").unwrap());
        assert!(matches!(graph.edge("b", "a"), Err(Error::EdgeNotFound { .. })));
    }

    #[test]
    fn test_auto_create_endpoints() {
        let mut graph = Graph::open_in_memory().unwrap();
        let kept = attrs(&[("name", Value::from("kept"))]);
        graph.add_node("a", &kept).unwrap();

        graph.add_edge("a", "b", &Attributes::new()).unwrap();

        assert_eq!(graph.node("a").unwrap(), kept);
        assert!(graph.node("b").unwrap().is_empty());
        assert_eq!(graph.node_count().unwrap(), 2);
    }

    #[test]
    fn test_strict_policy_rejects_unknown_endpoint() {
        let mut graph = strict_graph();
        graph.add_node("a", &Attributes::new()).unwrap();

        let err = graph.add_edge("a", "b", &Attributes::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownEndpoint(ref id) if id == "b"));
        assert_eq!(graph.edge_count().unwrap(), 0);
        assert_eq!(graph.node_count().unwrap(), 1);

        graph.add_node("b", &Attributes::new()).unwrap();
        graph.add_edge("a", "b", &Attributes::new()).unwrap();
        assert!(graph.has_edge("a", "b").unwrap());
    }

    #[test]
    fn test_strict_bulk_insert_is_all_or_nothing() {
        let mut graph = strict_graph();
        graph.add_nodes_from(["a", "b"]).unwrap();

        let result = graph.add_edges_from([("a", "b"), ("b", "c")]);
        assert!(matches!(result, Err(Error::UnknownEndpoint(ref id)) if id == "c"));
        assert_eq!(graph.edge_count().unwrap(), 0);
    }

    #[test]
    fn test_bulk_inserts_skip_existing() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_node("a", &attrs(&[("k", Value::from(1))])).unwrap();
        graph.add_edge("a", "b", &attrs(&[("w", Value::from(1))])).unwrap();

        assert_eq!(graph.add_nodes_from(["a", "c", "c"]).unwrap(), 1);
        assert_eq!(graph.add_edges_from([("a", "b"), ("b", "c")]).unwrap(), 1);

        assert_eq!(graph.node("a").unwrap(), attrs(&[("k", Value::from(1))]));
        assert_eq!(graph.edge("a", "b").unwrap(), attrs(&[("w", Value::from(1))]));
        assert!(graph.edge("b", "c").unwrap().is_empty());
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edges_from([("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")]).unwrap();

        assert!(graph.remove_node("b").unwrap());
        assert!(!graph.remove_node("b").unwrap());

        let edges: Vec<(String, String)> = graph
            .edges()
            .map(|e| e.map(|e| (e.source, e.target)))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            edges,
            vec![("c".to_string(), "a".to_string()), ("c".to_string(), "d".to_string())]
        );
    }

    #[test]
    fn test_remove_edge() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edge("a", "b", &Attributes::new()).unwrap();

        assert!(graph.remove_edge("a", "b").unwrap());
        assert!(!graph.remove_edge("a", "b").unwrap());
        assert!(graph.has_node("a").unwrap());
    }

    #[test]
    fn test_neighbors_from_groups_by_node() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edges_from([("a", "b"), ("a", "c"), ("b", "c"), ("d", "a")]).unwrap();

        let out = graph.neighbors_from(&["a", "b", "c"]).unwrap();
        assert_eq!(out["a"], vec!["b", "c"]);
        assert_eq!(out["b"], vec!["c"]);
        assert!(!out.contains_key("c"));

        let inc = graph.predecessors_from(&["c", "a"]).unwrap();
        assert_eq!(inc["c"], vec!["a", "b"]);
        assert_eq!(inc["a"], vec!["d"]);

        let none: [&str; 0] = [];
        assert!(graph.neighbors_from(&none).unwrap().is_empty());
    }

    #[test]
    fn test_set_neighbors_replaces_outgoing() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edges_from([("a", "b"), ("a", "c"), ("x", "a")]).unwrap();

        graph.set_neighbors("a", ["d", "e"]).unwrap();

        assert_eq!(collect(graph.neighbors("a")), vec!["d", "e"]);
        assert_eq!(collect(graph.predecessors("a")), vec!["x"]);
        assert!(graph.has_node("e").unwrap());
    }

    #[test]
    fn test_set_predecessors_replaces_incoming() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edges_from([("b", "a"), ("c", "a"), ("a", "z")]).unwrap();

        graph.set_predecessors("a", ["d"]).unwrap();

        assert_eq!(collect(graph.predecessors("a")), vec!["d"]);
        assert_eq!(collect(graph.neighbors("a")), vec!["z"]);
    }

    #[test]
    fn test_random_neighbors_are_a_subset() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edges_from([("a", "b"), ("a", "c"), ("a", "d"), ("e", "b")]).unwrap();

        let picked = graph.random_neighbors("a", 2).unwrap();
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|id| ["b", "c", "d"].contains(&id.as_str())));

        let mut all = graph.random_neighbors("a", 10).unwrap();
        all.sort();
        assert_eq!(all, vec!["b", "c", "d"]);

        let mut preds = graph.random_predecessors("b", 5).unwrap();
        preds.sort();
        assert_eq!(preds, vec!["a", "e"]);
    }

    #[test]
    fn test_subgraph_keeps_inner_edges() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edges_from([("a", "b"), ("b", "c"), ("c", "d"), ("b", "a")]).unwrap();

        let inner = graph.subgraph(&["a", "b", "c"]).unwrap();
        assert_eq!(
            inner,
            vec![
                ("a".to_string(), "b".to_string()),
                ("b".to_string(), "c".to_string()),
                ("b".to_string(), "a".to_string()),
            ]
        );
    }

    #[test]
    fn test_degrees() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edges_from([("a", "b"), ("a", "c"), ("c", "b")]).unwrap();

        assert_eq!(graph.out_degree("a").unwrap(), 2);
        assert_eq!(graph.in_degree("b").unwrap(), 2);
        assert_eq!(graph.out_degree("b").unwrap(), 0);
    }

    #[test]
    fn test_pages() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_nodes_from(["n0", "n1", "n2", "n3", "n4"]).unwrap();
        graph.add_edges_from([("n0", "n1"), ("n1", "n2"), ("n2", "n3")]).unwrap();

        assert_eq!(graph.nodes_page(0, 2).unwrap(), vec!["n0", "n1"]);
        assert_eq!(graph.nodes_page(2, 2).unwrap(), vec!["n4"]);
        assert!(graph.nodes_page(3, 2).unwrap().is_empty());

        let second = graph.edges_page(1, 2).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].key(), ("n2", "n3"));
    }

    #[test]
    fn test_cursor_spans_pages() {
        let config = GraphConfig::default().with_page_size(3);
        let mut graph = Graph::open_in_memory_with(config).unwrap();
        let keys: Vec<String> = (0..10).map(|i| format!("n{i}")).collect();
        graph.add_nodes_from(&keys).unwrap();

        assert_eq!(collect(graph.nodes()), keys);

        let mut cursor = graph.nodes();
        assert_eq!(cursor.by_ref().take(4).count(), 4);
        cursor.rewind();
        assert_eq!(cursor.count(), 10);
    }

    #[test]
    fn test_node_records() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_node("a", &attrs(&[("x", Value::from(1))])).unwrap();
        graph.add_edge("a", "b", &Attributes::new()).unwrap();

        let records: Vec<Node> = graph.node_records().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].to_string(), "Node(key='a', x=1)");
        assert_eq!(records[1].to_string(), "Node(key='b')");
    }

    #[test]
    fn test_clear_and_stats() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edges_from([("a", "a"), ("a", "b")]).unwrap();

        let stats = graph.stats().unwrap();
        assert_eq!((stats.nodes, stats.edges, stats.self_loops), (2, 2, 1));
        assert!(stats.to_string().contains("Edges: 2"));

        graph.clear().unwrap();
        assert_eq!(graph.node_count().unwrap(), 0);
        assert_eq!(graph.edge_count().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_payload_surfaces() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_node("a", &attrs(&[("x", Value::from(1))])).unwrap();
        graph
            .conn
            .execute("UPDATE nodes SET attrs = x'ff00' WHERE id = 'a'", [])
            .unwrap();

        assert!(matches!(
            graph.node("a"),
            Err(Error::CorruptAttributes { ref owner, .. }) if owner == "a"
        ));

        let mut records = graph.node_records();
        assert!(matches!(records.next(), Some(Err(Error::CorruptAttributes { .. }))));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_corrupt_row_keeps_earlier_records() {
        for page_size in [1, 256] {
            let config = GraphConfig::default().with_page_size(page_size);
            let mut graph = Graph::open_in_memory_with(config).unwrap();
            for id in ["a", "b", "c"] {
                graph.add_node(id, &attrs(&[("x", Value::from(1))])).unwrap();
            }
            graph
                .conn
                .execute("UPDATE nodes SET attrs = x'ff00' WHERE id = 'c'", [])
                .unwrap();

            let seen: Vec<String> = graph
                .node_records()
                .map(|record| record.map_or_else(|_| "ERR".to_string(), |node| node.key))
                .collect();
            assert_eq!(seen, vec!["a", "b", "ERR"], "page_size {page_size}");
        }
    }

    #[test]
    fn test_oversized_pages_do_not_overflow() {
        let mut graph = Graph::open_in_memory().unwrap();
        graph.add_edges_from([("a", "b"), ("b", "c")]).unwrap();

        assert!(graph.nodes_page(usize::MAX, 2).unwrap().is_empty());
        assert!(graph.nodes_page(1, usize::MAX).unwrap().is_empty());
        assert_eq!(graph.nodes_page(0, usize::MAX).unwrap(), vec!["a", "b", "c"]);
        assert!(graph.edges_page(usize::MAX, usize::MAX).unwrap().is_empty());
        assert_eq!(graph.edges_page(0, usize::MAX).unwrap().len(), 2);
        assert_eq!(graph.random_neighbors("a", usize::MAX).unwrap(), vec!["b"]);
    }
}
