//! Per-query token accounting journal
//!
//! Append-only rows, one per search or fetch, aggregated with SQL sums.
//! Savings are always reported against the 15x "traditional RAG" estimate
//! and never go negative.

use std::time::Duration;

use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::Db;

/// Aggregated journal totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageTotals {
    pub total_queries: u64,
    pub pointer_tokens: u64,
    pub fetched_tokens: u64,
    pub traditional_estimate: u64,
    pub tokens_saved: u64,
    pub savings_pct: f64,
}

pub struct Accountant {
    db: Db,
    project_id: String,
    session_id: String,
}

impl Accountant {
    pub fn new(db: Db, project_id: &str, session_id: &str) -> Self {
        Self {
            db,
            project_id: project_id.to_string(),
            session_id: session_id.to_string(),
        }
    }

    /// Append one journal row.
    pub fn record_query(
        &self,
        query_text: &str,
        pointer_tokens: u64,
        fetched_tokens: u64,
        traditional_estimate: u64,
    ) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO accounting
             (project_id, session_id, query_text, pointer_tokens, fetched_tokens, traditional_est)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.project_id,
                self.session_id,
                query_text,
                pointer_tokens as i64,
                fetched_tokens as i64,
                traditional_estimate as i64,
            ],
        )?;
        Ok(())
    }

    /// Totals across the whole project.
    pub fn cumulative_totals(&self) -> Result<UsageTotals> {
        self.totals_since(None)
    }

    /// Totals across the project, optionally restricted to rows younger than
    /// the window.
    pub fn totals_since(&self, window: Option<Duration>) -> Result<UsageTotals> {
        let conn = self.db.lock();
        let sql = match window {
            Some(window) => format!(
                "SELECT COUNT(*),
                        COALESCE(SUM(pointer_tokens), 0),
                        COALESCE(SUM(fetched_tokens), 0),
                        COALESCE(SUM(traditional_est), 0)
                 FROM accounting
                 WHERE project_id = ?1
                   AND created_at >= datetime('now', '-{} seconds')",
                window.as_secs()
            ),
            None => "SELECT COUNT(*),
                            COALESCE(SUM(pointer_tokens), 0),
                            COALESCE(SUM(fetched_tokens), 0),
                            COALESCE(SUM(traditional_est), 0)
                     FROM accounting WHERE project_id = ?1"
                .to_string(),
        };
        let mut stmt = conn.prepare(&sql)?;
        let totals = stmt.query_row(params![self.project_id], totals_from_row)?;
        Ok(totals)
    }

    /// Totals for this process's session only.
    pub fn session_totals(&self) -> Result<UsageTotals> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT COUNT(*),
                    COALESCE(SUM(pointer_tokens), 0),
                    COALESCE(SUM(fetched_tokens), 0),
                    COALESCE(SUM(traditional_est), 0)
             FROM accounting WHERE project_id = ?1 AND session_id = ?2",
        )?;
        let totals = stmt.query_row(params![self.project_id, self.session_id], totals_from_row)?;
        Ok(totals)
    }
}

fn totals_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UsageTotals> {
    let total_queries: u64 = row.get(0)?;
    let pointer_tokens: u64 = row.get(1)?;
    let fetched_tokens: u64 = row.get(2)?;
    let traditional_estimate: u64 = row.get(3)?;
    let spent = pointer_tokens + fetched_tokens;
    let tokens_saved = traditional_estimate.saturating_sub(spent);
    let savings_pct = if traditional_estimate > 0 {
        tokens_saved as f64 / traditional_estimate as f64 * 100.0
    } else {
        0.0
    };
    Ok(UsageTotals {
        total_queries,
        pointer_tokens,
        fetched_tokens,
        traditional_estimate,
        tokens_saved,
        savings_pct,
    })
}

/// Parse a stats window: `"Nh"` hours, `"Nd"` days, `"all"` (or anything
/// unparsable) means no window.
pub fn parse_since_window(s: &str) -> Option<Duration> {
    match s.trim().to_lowercase().as_str() {
        "all" => None,
        s if s.ends_with('h') => {
            let hours: u64 = s.trim_end_matches('h').parse().ok()?;
            Some(Duration::from_secs(hours * 3600))
        }
        s if s.ends_with('d') => {
            let days: u64 = s.trim_end_matches('d').parse().ok()?;
            Some(Duration::from_secs(days * 86400))
        }
        _ => None,
    }
}
