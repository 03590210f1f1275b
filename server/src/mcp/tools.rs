//! Tool catalog for the MCP surface
//!
//! Six tools: index, search, fetch, fact, facts, stats.

use std::collections::HashMap;

use super::protocol::{PropertySchema, Tool, ToolInputSchema};

/// All Hermes tools, in the order clients list them
pub fn all_tools() -> Vec<Tool> {
    vec![
        search_tool(),
        fetch_tool(),
        index_tool(),
        fact_tool(),
        facts_tool(),
        stats_tool(),
    ]
}

fn string_prop(description: &str) -> PropertySchema {
    PropertySchema {
        property_type: "string".to_string(),
        description: description.to_string(),
    }
}

fn schema(
    properties: Vec<(&str, PropertySchema)>,
    required: &[&str],
) -> ToolInputSchema {
    ToolInputSchema {
        schema_type: "object".to_string(),
        properties: properties
            .into_iter()
            .map(|(name, prop)| (name.to_string(), prop))
            .collect::<HashMap<_, _>>(),
        required: if required.is_empty() {
            None
        } else {
            Some(required.iter().map(|s| s.to_string()).collect())
        },
    }
}

fn search_tool() -> Tool {
    Tool {
        name: "hermes_search".to_string(),
        description: "Searches the codebase knowledge graph and returns compact pointers (path, line range, summary) instead of full content. USE WHEN: locating functions, types, or docs before reading them. Fetch only the pointers you actually need.".to_string(),
        input_schema: schema(
            vec![(
                "query",
                string_prop("Natural-language or keyword search query"),
            )],
            &["query"],
        ),
    }
}

fn fetch_tool() -> Tool {
    Tool {
        name: "hermes_fetch".to_string(),
        description: "Fetches full content for one knowledge-graph node by id. USE WHEN: a pointer from hermes_search looks relevant enough to read in full.".to_string(),
        input_schema: schema(
            vec![(
                "node_id",
                string_prop("Node id from a previous hermes_search result"),
            )],
            &["node_id"],
        ),
    }
}

fn index_tool() -> Tool {
    Tool {
        name: "hermes_index".to_string(),
        description: "Re-indexes the project into the knowledge graph. USE WHEN: files changed and search results look stale. Unchanged files are skipped by content hash.".to_string(),
        input_schema: schema(vec![], &[]),
    }
}

fn fact_tool() -> Tool {
    Tool {
        name: "hermes_fact".to_string(),
        description: "Records a persistent fact (decision, learning, constraint, ...) into the temporal store. USE WHEN: discovering context worth keeping for future sessions.".to_string(),
        input_schema: schema(
            vec![
                (
                    "fact_type",
                    string_prop("One of: architecture, api_contract, decision, error_pattern, constraint, learning"),
                ),
                ("content", string_prop("The fact to record")),
            ],
            &["fact_type", "content"],
        ),
    }
}

fn facts_tool() -> Tool {
    Tool {
        name: "hermes_facts".to_string(),
        description: "Lists active facts from the temporal store, optionally filtered by type. USE WHEN: recalling past decisions before starting a task.".to_string(),
        input_schema: schema(
            vec![(
                "fact_type",
                string_prop("Optional filter type (omit for all)"),
            )],
            &[],
        ),
    }
}

fn stats_tool() -> Tool {
    Tool {
        name: "hermes_stats".to_string(),
        description: "Returns session and cumulative token-savings statistics from the accounting journal.".to_string(),
        input_schema: schema(
            vec![(
                "since",
                string_prop("Optional window: Nh, Nd, or all (default all)"),
            )],
            &[],
        ),
    }
}
