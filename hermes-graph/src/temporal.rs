//! Append-only temporal fact store
//!
//! Facts carry a validity interval: `valid_to` is null while the fact is
//! active, and invalidation can chain to the fact that superseded it. Facts
//! are never deleted, so the full history of a decision stays queryable.

use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::graph::Db;

/// Kinds of temporal facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    Architecture,
    ApiContract,
    Decision,
    ErrorPattern,
    Constraint,
    Learning,
}

impl FactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::ApiContract => "api_contract",
            Self::Decision => "decision",
            Self::ErrorPattern => "error_pattern",
            Self::Constraint => "constraint",
            Self::Learning => "learning",
        }
    }

    /// Lenient parse; unknown tags become `Decision`.
    pub fn parse(s: &str) -> Self {
        match s {
            "architecture" => Self::Architecture,
            "api_contract" => Self::ApiContract,
            "error_pattern" => Self::ErrorPattern,
            "constraint" => Self::Constraint,
            "learning" => Self::Learning,
            _ => Self::Decision,
        }
    }
}

/// A recorded fact with its validity interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalFact {
    pub id: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub fact_type: FactType,
    pub content: String,
    pub valid_from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
}

impl TemporalFact {
    /// A fact is active while `valid_to` is unset.
    pub fn is_active(&self) -> bool {
        self.valid_to.is_none()
    }
}

pub struct FactStore {
    db: Db,
    project_id: String,
}

impl FactStore {
    pub fn new(db: Db, project_id: &str) -> Self {
        Self {
            db,
            project_id: project_id.to_string(),
        }
    }

    /// Record a fact valid from now. Returns the new fact id.
    pub fn add_fact(
        &self,
        fact_type: FactType,
        content: &str,
        node_id: Option<&str>,
        source_reference: Option<&str>,
    ) -> Result<String> {
        let conn = self.db.lock();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO temporal_facts
             (id, project_id, node_id, fact_type, content, valid_from, source_reference)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                self.project_id,
                node_id,
                fact_type.as_str(),
                content,
                now,
                source_reference,
            ],
        )?;
        Ok(id)
    }

    /// Close a fact's validity interval, optionally linking its successor.
    pub fn invalidate_fact(&self, fact_id: &str, superseded_by: Option<&str>) -> Result<()> {
        let conn = self.db.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE temporal_facts SET valid_to = ?1, superseded_by = ?2
             WHERE id = ?3 AND project_id = ?4",
            params![now, superseded_by, fact_id, self.project_id],
        )?;
        Ok(())
    }

    /// Active facts (`valid_to IS NULL`), newest first, optionally filtered
    /// by type.
    pub fn get_active_facts(&self, fact_type: Option<FactType>) -> Result<Vec<TemporalFact>> {
        let conn = self.db.lock();
        let mut facts = Vec::new();
        match fact_type {
            Some(fact_type) => {
                let mut stmt = conn.prepare(
                    "SELECT id, project_id, node_id, fact_type, content, valid_from, valid_to, superseded_by, source_reference
                     FROM temporal_facts
                     WHERE project_id = ?1 AND valid_to IS NULL AND fact_type = ?2
                     ORDER BY valid_from DESC",
                )?;
                let rows = stmt.query_map(params![self.project_id, fact_type.as_str()], fact_from_row)?;
                for row in rows {
                    facts.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, project_id, node_id, fact_type, content, valid_from, valid_to, superseded_by, source_reference
                     FROM temporal_facts
                     WHERE project_id = ?1 AND valid_to IS NULL
                     ORDER BY valid_from DESC",
                )?;
                let rows = stmt.query_map(params![self.project_id], fact_from_row)?;
                for row in rows {
                    facts.push(row?);
                }
            }
        }
        Ok(facts)
    }

    /// Every fact ever recorded against a node, active or not, newest first.
    pub fn get_fact_history(&self, node_id: &str) -> Result<Vec<TemporalFact>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT id, project_id, node_id, fact_type, content, valid_from, valid_to, superseded_by, source_reference
             FROM temporal_facts
             WHERE project_id = ?1 AND node_id = ?2
             ORDER BY valid_from DESC",
        )?;
        let rows = stmt
            .query_map(params![self.project_id, node_id], fact_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn fact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TemporalFact> {
    Ok(TemporalFact {
        id: row.get(0)?,
        project_id: row.get(1)?,
        node_id: row.get(2)?,
        fact_type: FactType::parse(&row.get::<_, String>(3)?),
        content: row.get(4)?,
        valid_from: row.get(5)?,
        valid_to: row.get(6)?,
        superseded_by: row.get(7)?,
        source_reference: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hermes;

    fn store(hermes: &Hermes) -> FactStore {
        FactStore::new(hermes.db().clone(), hermes.project_id())
    }

    #[test]
    fn test_add_and_retrieve_fact() {
        let hermes = Hermes::in_memory("facts").unwrap();
        let facts = store(&hermes);

        let id = facts
            .add_fact(
                FactType::Architecture,
                "Search runs three tiers in fixed order",
                None,
                Some("initial design"),
            )
            .unwrap();

        let active = facts.get_active_facts(None).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, id);
        assert!(active[0].is_active());
        assert_eq!(active[0].source_reference.as_deref(), Some("initial design"));
    }

    #[test]
    fn test_invalidate_removes_from_active_set() {
        let hermes = Hermes::in_memory("facts-inv").unwrap();
        let facts = store(&hermes);

        let id = facts
            .add_fact(FactType::Decision, "Cache TTL is 60 seconds", None, None)
            .unwrap();
        facts.invalidate_fact(&id, None).unwrap();

        assert!(facts.get_active_facts(None).unwrap().is_empty());
    }

    #[test]
    fn test_supersession_chain() {
        let hermes = Hermes::in_memory("facts-chain").unwrap();
        let facts = store(&hermes);

        let old = facts
            .add_fact(FactType::Decision, "Use in-process vectors", None, None)
            .unwrap();
        let new = facts
            .add_fact(FactType::Decision, "Use the remote provider", None, None)
            .unwrap();
        facts.invalidate_fact(&old, Some(&new)).unwrap();

        let active = facts.get_active_facts(None).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, new);

        // The superseded fact keeps its chain link
        let conn = hermes.db().lock();
        let superseded_by: Option<String> = conn
            .query_row(
                "SELECT superseded_by FROM temporal_facts WHERE id = ?1",
                [&old],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(superseded_by.as_deref(), Some(new.as_str()));
    }

    #[test]
    fn test_filter_by_fact_type() {
        let hermes = Hermes::in_memory("facts-filter").unwrap();
        let facts = store(&hermes);

        facts
            .add_fact(FactType::Architecture, "Single SQLite file per project", None, None)
            .unwrap();
        facts
            .add_fact(FactType::Learning, "Porter stemming helps recall", None, None)
            .unwrap();

        let arch = facts.get_active_facts(Some(FactType::Architecture)).unwrap();
        assert_eq!(arch.len(), 1);
        assert_eq!(arch[0].fact_type, FactType::Architecture);
    }

    #[test]
    fn test_history_includes_invalidated_facts() {
        let hermes = Hermes::in_memory("facts-history").unwrap();
        let facts = store(&hermes);

        let id = facts
            .add_fact(FactType::Constraint, "Node n1 must stay stable", Some("n1"), None)
            .unwrap();
        facts.invalidate_fact(&id, None).unwrap();
        facts
            .add_fact(FactType::Constraint, "Node n1 was replaced", Some("n1"), None)
            .unwrap();

        let history = facts.get_fact_history("n1").unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|f| !f.is_active()));
    }

    #[test]
    fn test_unknown_fact_type_coerces_to_decision() {
        assert_eq!(FactType::parse("vibes"), FactType::Decision);
        assert_eq!(FactType::parse("api_contract"), FactType::ApiContract);
    }
}
