//! One-shot CLI command handlers
//!
//! Each subcommand prints pretty JSON to stdout so output is pipeable into
//! jq or back into an agent harness. Search and fetch journal their token
//! accounting like the MCP tools do.

use std::path::Path;

use anyhow::{bail, Result};
use hermes_graph::{parse_since_window, FactType, Hermes};
use serde_json::json;

use crate::Command;

pub fn run(engine: &Hermes, project_root: &Path, command: Command) -> Result<()> {
    match command {
        Command::Index => index(engine, project_root),
        Command::Search { query } => search(engine, &query),
        Command::Fetch { node_id } => fetch(engine, &node_id),
        Command::Fact { fact_type, content } => fact(engine, &fact_type, &content),
        Command::Facts { filter } => facts(engine, filter.as_deref()),
        Command::Stats { since } => stats(engine, since.as_deref()),
    }
}

fn index(engine: &Hermes, project_root: &Path) -> Result<()> {
    let report = engine.pipeline().ingest_directory(project_root)?;
    engine.invalidate_caches();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn search(engine: &Hermes, query: &str) -> Result<()> {
    let response = engine.search_engine().search(query, 10)?;
    engine.accountant().record_query(
        query,
        response.accounting.pointer_tokens,
        0,
        response.accounting.traditional_rag_estimate,
    )?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn fetch(engine: &Hermes, node_id: &str) -> Result<()> {
    let Some(response) = engine.search_engine().fetch(node_id)? else {
        bail!("node not found: {node_id}");
    };
    engine.accountant().record_query(
        node_id,
        0,
        response.token_count,
        response.token_count * 15,
    )?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn fact(engine: &Hermes, fact_type: &str, content: &str) -> Result<()> {
    let id = engine
        .facts()
        .add_fact(FactType::parse(fact_type), content, None, None)?;
    println!("{}", json!({ "id": id, "status": "recorded" }));
    Ok(())
}

fn facts(engine: &Hermes, filter: Option<&str>) -> Result<()> {
    let facts = engine.facts().get_active_facts(filter.map(FactType::parse))?;
    println!("{}", serde_json::to_string_pretty(&facts)?);
    Ok(())
}

fn stats(engine: &Hermes, since: Option<&str>) -> Result<()> {
    let accountant = engine.accountant();
    let session = accountant.session_totals()?;
    let cumulative = accountant.totals_since(since.and_then(parse_since_window))?;

    let output = json!({
        "project_id": engine.project_id(),
        "since_filter": since.unwrap_or("all"),
        "session": totals_json(&session),
        "cumulative": totals_json(&cumulative),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn totals_json(totals: &hermes_graph::UsageTotals) -> serde_json::Value {
    json!({
        "total_queries": totals.total_queries,
        "pointer_tokens_used": totals.pointer_tokens,
        "fetched_tokens_used": totals.fetched_tokens,
        "actual_tokens_total": totals.pointer_tokens + totals.fetched_tokens,
        "traditional_rag_estimate": totals.traditional_estimate,
        "tokens_saved": totals.tokens_saved,
        "savings_pct": format!("{:.1}%", totals.savings_pct),
    })
}
