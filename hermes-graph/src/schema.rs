//! Store schema and migrations
//!
//! Every statement is idempotent, so `run_migrations` is safe to re-run on
//! each open. A failing statement surfaces as [`HermesError::Migration`]
//! carrying the statement that broke.

use rusqlite::Connection;

use crate::error::{HermesError, Result};

/// Ordered, idempotent schema statements. One statement per entry so a
/// failure can name the offender.
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS nodes (
        id           TEXT PRIMARY KEY,
        project_id   TEXT NOT NULL,
        name         TEXT NOT NULL,
        node_type    TEXT NOT NULL,
        file_path    TEXT,
        start_line   INTEGER,
        end_line     INTEGER,
        summary      TEXT,
        content_hash TEXT,
        created_at   TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at   TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_nodes_project ON nodes(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_name_lower ON nodes(LOWER(name))",
    "CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(project_id, node_type)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_file ON nodes(file_path)",
    "CREATE TABLE IF NOT EXISTS edges (
        id          TEXT PRIMARY KEY,
        project_id  TEXT NOT NULL,
        source_id   TEXT NOT NULL REFERENCES nodes(id),
        target_id   TEXT NOT NULL REFERENCES nodes(id),
        edge_type   TEXT NOT NULL,
        weight      REAL DEFAULT 1.0,
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(source_id, target_id, edge_type)
    )",
    "CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id)",
    "CREATE INDEX IF NOT EXISTS idx_edges_project ON edges(project_id)",
    "CREATE TABLE IF NOT EXISTS file_hashes (
        file_path    TEXT PRIMARY KEY,
        project_id   TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        indexed_at   TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS accounting (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id      TEXT NOT NULL,
        session_id      TEXT NOT NULL DEFAULT '',
        query_text      TEXT NOT NULL,
        pointer_tokens  INTEGER NOT NULL DEFAULT 0,
        fetched_tokens  INTEGER NOT NULL DEFAULT 0,
        traditional_est INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_accounting_session ON accounting(project_id, session_id)",
    "CREATE TABLE IF NOT EXISTS temporal_facts (
        id               TEXT PRIMARY KEY,
        project_id       TEXT NOT NULL,
        node_id          TEXT REFERENCES nodes(id),
        fact_type        TEXT NOT NULL,
        content          TEXT NOT NULL,
        valid_from       TEXT NOT NULL,
        valid_to         TEXT,
        superseded_by    TEXT,
        source_reference TEXT,
        created_at       TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_facts_project ON temporal_facts(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_facts_node ON temporal_facts(node_id)",
    "CREATE INDEX IF NOT EXISTS idx_facts_active
        ON temporal_facts(project_id, fact_type) WHERE valid_to IS NULL",
    "CREATE VIRTUAL TABLE IF NOT EXISTS fts_content USING fts5(
        node_id,
        project_id,
        name,
        content,
        file_path,
        tokenize='porter unicode61'
    )",
];

/// Create all tables, indexes, and the FTS virtual table.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    for statement in MIGRATIONS {
        conn.execute_batch(statement)
            .map_err(|source| HermesError::Migration {
                statement: statement.split_whitespace().collect::<Vec<_>>().join(" "),
                source,
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_without_error() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn test_fts_table_exists_after_migration() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='fts_content'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_all_core_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        for table in ["nodes", "edges", "file_hashes", "accounting", "temporal_facts"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }
}
