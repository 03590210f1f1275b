//! Knowledge graph persistence
//!
//! [`KnowledgeGraph`] is a stateless view over the shared store handle: typed
//! node/edge CRUD, neighbor traversal, full-text index maintenance, and the
//! file-scoped delete used by the stale sweep. Every query is scoped to the
//! graph's project id.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::node::{Edge, EdgeType, Node, NodeType};

/// Shared handle to the per-project store. The mutex serializes all access;
/// writes must never interleave on the connection.
pub type Db = Arc<Mutex<Connection>>;

const NODE_COLUMNS: &str =
    "id, project_id, name, node_type, file_path, start_line, end_line, summary, content_hash";

#[derive(Clone)]
pub struct KnowledgeGraph {
    db: Db,
    project_id: String,
}

impl KnowledgeGraph {
    pub fn new(db: Db, project_id: &str) -> Self {
        Self {
            db,
            project_id: project_id.to_string(),
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Upsert a node by id, refreshing `updated_at`.
    pub fn add_node(&self, node: &Node) -> Result<()> {
        let conn = self.db.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR REPLACE INTO nodes
             (id, project_id, name, node_type, file_path, start_line, end_line, summary, content_hash, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                node.id,
                node.project_id,
                node.name,
                node.node_type.as_str(),
                node.file_path,
                node.start_line,
                node.end_line,
                node.summary,
                node.content_hash,
                now,
            ],
        )?;
        Ok(())
    }

    pub fn get_node(&self, node_id: &str) -> Result<Option<Node>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?1 AND project_id = ?2"
        ))?;
        let node = stmt
            .query_row(params![node_id, self.project_id], node_from_row)
            .optional()?;
        Ok(node)
    }

    /// Insert an edge if absent. Idempotent by id and by
    /// (source, target, type).
    pub fn add_edge(&self, edge: &Edge) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT OR IGNORE INTO edges (id, project_id, source_id, target_id, edge_type, weight)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                edge.id,
                edge.project_id,
                edge.source_id,
                edge.target_id,
                edge.edge_type.as_str(),
                edge.weight,
            ],
        )?;
        Ok(())
    }

    /// Every edge touching `node_id`, paired with the other endpoint resolved
    /// in the same query.
    pub fn get_neighbors(&self, node_id: &str) -> Result<Vec<(Edge, Node)>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.project_id, e.source_id, e.target_id, e.edge_type, e.weight,
                    n.id, n.project_id, n.name, n.node_type, n.file_path, n.start_line, n.end_line, n.summary, n.content_hash
             FROM edges e
             JOIN nodes n ON n.id = CASE WHEN e.source_id = ?1 THEN e.target_id ELSE e.source_id END
             WHERE (e.source_id = ?1 OR e.target_id = ?1) AND e.project_id = ?2",
        )?;
        let rows = stmt
            .query_map(params![node_id, self.project_id], |row| {
                let edge = Edge {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    source_id: row.get(2)?,
                    target_id: row.get(3)?,
                    edge_type: EdgeType::parse(&row.get::<_, String>(4)?),
                    weight: row.get(5)?,
                };
                let node = Node {
                    id: row.get(6)?,
                    project_id: row.get(7)?,
                    name: row.get(8)?,
                    node_type: NodeType::parse(&row.get::<_, String>(9)?),
                    file_path: row.get(10)?,
                    start_line: row.get(11)?,
                    end_line: row.get(12)?,
                    summary: row.get(13)?,
                    content_hash: row.get(14)?,
                };
                Ok((edge, node))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace the node's full-text row (delete then insert).
    pub fn index_fts(&self, node: &Node, content: &str) -> Result<()> {
        let conn = self.db.lock();
        conn.execute("DELETE FROM fts_content WHERE node_id = ?1", params![node.id])?;
        conn.execute(
            "INSERT INTO fts_content (node_id, project_id, name, content, file_path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![node.id, node.project_id, node.name, content, node.file_path],
        )?;
        Ok(())
    }

    /// Two-phase literal name lookup. Prefix matches win outright; only when
    /// there are none does the contains phase run. The query is lowercased
    /// with the Unicode-aware `to_lowercase`; the stored side goes through
    /// SQL `LOWER`, which leaves non-ASCII verbatim.
    pub fn literal_search_by_name(&self, query: &str) -> Result<Vec<Node>> {
        let query_lower = query.to_lowercase();
        let prefix = self.nodes_matching_name(&format!("{query_lower}%"))?;
        if !prefix.is_empty() {
            return Ok(prefix);
        }
        self.nodes_matching_name(&format!("%{query_lower}%"))
    }

    fn nodes_matching_name(&self, pattern: &str) -> Result<Vec<Node>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE project_id = ?1 AND LOWER(name) LIKE ?2"
        ))?;
        let rows = stmt
            .query_map(params![self.project_id, pattern], node_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Full-text query ordered by BM25 rank ascending (smaller is better).
    /// Callers normalize the raw rank into a score.
    pub fn fts_search(&self, query: &str, limit: usize) -> Result<Vec<(Node, f64)>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT n.id, n.project_id, n.name, n.node_type, n.file_path, n.start_line, n.end_line, n.summary, n.content_hash,
                    bm25(fts_content) AS rank
             FROM fts_content f
             JOIN nodes n ON n.id = f.node_id
             WHERE fts_content MATCH ?1 AND f.project_id = ?2
             ORDER BY rank
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![query, self.project_id, limit as i64], |row| {
                Ok((node_from_row(row)?, row.get::<_, f64>(9)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Distinct paths of `file`-typed nodes; the stale sweep diffs this
    /// against the crawl result.
    pub fn get_all_file_paths(&self) -> Result<HashSet<String>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT file_path FROM nodes
             WHERE project_id = ?1 AND node_type = 'file' AND file_path IS NOT NULL",
        )?;
        let paths = stmt
            .query_map(params![self.project_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(paths)
    }

    pub fn get_all_nodes(&self) -> Result<Vec<Node>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE project_id = ?1"
        ))?;
        let rows = stmt
            .query_map(params![self.project_id], node_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Remove everything rooted at `file_path`: FTS rows first, then edges
    /// touching the nodes, then the nodes. The order is a contract — the FTS
    /// deletes select by node id, so the nodes must still exist.
    pub fn delete_nodes_for_file(&self, file_path: &str) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "DELETE FROM fts_content WHERE node_id IN
             (SELECT id FROM nodes WHERE file_path = ?1 AND project_id = ?2)",
            params![file_path, self.project_id],
        )?;
        conn.execute(
            "DELETE FROM edges WHERE
             source_id IN (SELECT id FROM nodes WHERE file_path = ?1 AND project_id = ?2)
             OR target_id IN (SELECT id FROM nodes WHERE file_path = ?1 AND project_id = ?2)",
            params![file_path, self.project_id],
        )?;
        conn.execute(
            "DELETE FROM nodes WHERE file_path = ?1 AND project_id = ?2",
            params![file_path, self.project_id],
        )?;
        Ok(())
    }
}

fn node_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        node_type: NodeType::parse(&row.get::<_, String>(3)?),
        file_path: row.get(4)?,
        start_line: row.get(5)?,
        end_line: row.get(6)?,
        summary: row.get(7)?,
        content_hash: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hermes;

    fn graph() -> KnowledgeGraph {
        Hermes::in_memory("graph-tests").unwrap().graph()
    }

    fn insert(graph: &KnowledgeGraph, id: &str, name: &str, path: &str) -> Node {
        let node = Node {
            id: id.to_string(),
            project_id: graph.project_id().to_string(),
            name: name.to_string(),
            node_type: NodeType::Function,
            file_path: Some(path.to_string()),
            start_line: Some(1),
            end_line: Some(10),
            summary: None,
            content_hash: None,
        };
        graph.add_node(&node).unwrap();
        node
    }

    #[test]
    fn test_add_node_round_trip() {
        let graph = graph();
        let node = insert(&graph, "n1", "handle_request", "src/server.rs");
        let fetched = graph.get_node("n1").unwrap().unwrap();
        assert_eq!(fetched, node);
    }

    #[test]
    fn test_get_node_missing_returns_none() {
        let graph = graph();
        assert!(graph.get_node("missing").unwrap().is_none());
    }

    #[test]
    fn test_add_node_upserts_by_id() {
        let graph = graph();
        insert(&graph, "n1", "old_name", "src/a.rs");
        insert(&graph, "n1", "new_name", "src/a.rs");
        let all = graph.get_all_nodes().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "new_name");
    }

    #[test]
    fn test_add_edge_is_idempotent() {
        let graph = graph();
        let a = insert(&graph, "a", "fn_a", "src/a.rs");
        let b = insert(&graph, "b", "fn_b", "src/b.rs");
        let edge = Edge {
            id: "e1".to_string(),
            project_id: graph.project_id().to_string(),
            source_id: a.id.clone(),
            target_id: b.id.clone(),
            edge_type: EdgeType::Calls,
            weight: 1.0,
        };
        graph.add_edge(&edge).unwrap();
        graph.add_edge(&edge).unwrap();
        assert_eq!(graph.get_neighbors("a").unwrap().len(), 1);
    }

    #[test]
    fn test_get_neighbors_resolves_other_endpoint() {
        let graph = graph();
        let a = insert(&graph, "a", "fn_a", "src/a.rs");
        let b = insert(&graph, "b", "fn_b", "src/b.rs");
        let edge = Edge::builder(graph.project_id())
            .source(&a.id)
            .target(&b.id)
            .edge_type(EdgeType::Calls)
            .build();
        graph.add_edge(&edge).unwrap();

        let neighbors = graph.get_neighbors("a").unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].1.id, "b");

        let reverse = graph.get_neighbors("b").unwrap();
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse[0].1.id, "a");
    }

    #[test]
    fn test_literal_search_prefix_phase_wins() {
        let graph = graph();
        insert(&graph, "n1", "fetch_alerts", "src/api.rs");
        insert(&graph, "n2", "process_alerts", "src/api.rs");

        let results = graph.literal_search_by_name("fetch").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "fetch_alerts");
    }

    #[test]
    fn test_literal_search_contains_fallback() {
        let graph = graph();
        insert(&graph, "n1", "fetch_alerts", "src/api.rs");
        insert(&graph, "n2", "process_alerts", "src/api.rs");

        let results = graph.literal_search_by_name("alert").unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_literal_search_is_case_insensitive() {
        let graph = graph();
        insert(&graph, "n1", "HandleRequest", "src/server.rs");
        let results = graph.literal_search_by_name("handlerequest").unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_literal_search_no_match_is_empty() {
        let graph = graph();
        insert(&graph, "n1", "my_func", "src/lib.rs");
        assert!(graph.literal_search_by_name("zzz_nothing").unwrap().is_empty());
    }

    #[test]
    fn test_fts_search_finds_indexed_content() {
        let graph = graph();
        let node = insert(&graph, "n1", "alerts_handler", "src/api.rs");
        graph
            .index_fts(&node, "handles incoming alert notifications")
            .unwrap();

        let results = graph.fts_search("\"alert\"", 10).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0.id, "n1");
    }

    #[test]
    fn test_fts_index_is_rebuilt_per_node() {
        let graph = graph();
        let node = insert(&graph, "n1", "handler", "src/api.rs");
        graph.index_fts(&node, "first generation text").unwrap();
        graph.index_fts(&node, "second generation text").unwrap();

        assert!(graph.fts_search("\"first\"", 10).unwrap().is_empty());
        assert!(!graph.fts_search("\"second\"", 10).unwrap().is_empty());
    }

    #[test]
    fn test_fts_search_respects_limit() {
        let graph = graph();
        for i in 0..5 {
            let node = insert(&graph, &format!("n{i}"), &format!("handler_{i}"), "src/api.rs");
            graph.index_fts(&node, "shared keyword everywhere").unwrap();
        }
        let results = graph.fts_search("\"shared\"", 3).unwrap();
        assert!(results.len() <= 3);
    }

    #[test]
    fn test_delete_nodes_for_file_removes_everything() {
        let graph = graph();
        let a = insert(&graph, "a", "fn_a", "src/a.rs");
        let b = insert(&graph, "b", "fn_b", "src/b.rs");
        graph.index_fts(&a, "alpha body").unwrap();
        let edge = Edge::builder(graph.project_id())
            .source(&a.id)
            .target(&b.id)
            .edge_type(EdgeType::Calls)
            .build();
        graph.add_edge(&edge).unwrap();

        graph.delete_nodes_for_file("src/a.rs").unwrap();

        let remaining = graph.get_all_nodes().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "fn_b");
        assert!(graph.get_neighbors("b").unwrap().is_empty());
        assert!(graph.fts_search("\"alpha\"", 10).unwrap().is_empty());
    }

    #[test]
    fn test_get_all_file_paths_only_file_nodes() {
        let graph = graph();
        let file_node = Node::builder(graph.project_id())
            .name("src/main.rs")
            .node_type(NodeType::File)
            .file_path("src/main.rs")
            .lines(1, 50)
            .build();
        graph.add_node(&file_node).unwrap();
        insert(&graph, "fn-1", "some_fn", "src/main.rs");

        let paths = graph.get_all_file_paths().unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths.contains("src/main.rs"));
    }

    #[test]
    fn test_project_scoping_isolates_graphs() {
        let hermes = Hermes::in_memory("project-a").unwrap();
        let graph_a = hermes.graph();
        let graph_b = KnowledgeGraph::new(hermes.db().clone(), "project-b");
        insert(&graph_a, "n1", "shared_name", "src/a.rs");

        assert!(graph_b.get_node("n1").unwrap().is_none());
        assert!(graph_b.literal_search_by_name("shared").unwrap().is_empty());
    }
}
