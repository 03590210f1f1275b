//! MCP server implementation
//!
//! A synchronous stdio loop: one JSON-RPC message per line in, one response
//! per line out. Notifications are consumed without replies. Tool calls
//! dispatch into the engine; user-visible flows degrade to well-formed error
//! responses rather than killing the loop.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use hermes_graph::{parse_since_window, FactType, Hermes, UsageTotals};
use serde_json::{json, Value};

use super::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolCallResult,
};
use super::tools::all_tools;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "hermes";

pub struct McpServer {
    engine: Hermes,
    project_root: PathBuf,
}

/// Run the stdio loop until the client disconnects.
pub fn serve(engine: Hermes, project_root: PathBuf) -> anyhow::Result<()> {
    McpServer::new(engine, project_root).run()
}

impl McpServer {
    pub fn new(engine: Hermes, project_root: PathBuf) -> Self {
        Self {
            engine,
            project_root,
        }
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut out = stdout.lock();

        tracing::info!("MCP server listening on stdio");

        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(e) => {
                    let response = JsonRpcResponse::error(
                        None,
                        JsonRpcError::parse_error(format!("parse error: {e}")),
                    );
                    write_response(&mut out, &response)?;
                    continue;
                }
            };

            if request.method.starts_with("notifications/") {
                continue;
            }

            let response = self.handle(request);
            write_response(&mut out, &response)?;
        }

        tracing::info!("client disconnected");
        Ok(())
    }

    fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!("handling {}", request.method);
        let id = request.id.clone();
        match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": all_tools() })),
            "tools/call" => self.tools_call(id, request.params),
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
        })
    }

    fn tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            _ => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("tools/call requires {name, arguments}"),
                )
            }
        };

        let arguments = params.arguments.unwrap_or(Value::Null);
        match self.dispatch_tool(&params.name, &arguments) {
            Ok(text) => {
                JsonRpcResponse::success(id, json!(ToolCallResult::text(text)))
            }
            Err(error) => JsonRpcResponse::error(id, error),
        }
    }

    fn dispatch_tool(&self, name: &str, args: &Value) -> Result<String, JsonRpcError> {
        match name {
            "hermes_search" => {
                let query = args["query"].as_str().unwrap_or("");
                if query.is_empty() {
                    return Err(JsonRpcError::invalid_params("hermes_search requires 'query'"));
                }
                self.tool_search(query).map_err(internal)
            }
            "hermes_fetch" => {
                let node_id = args["node_id"].as_str().unwrap_or("");
                if node_id.is_empty() {
                    return Err(JsonRpcError::invalid_params("hermes_fetch requires 'node_id'"));
                }
                self.tool_fetch(node_id)
            }
            "hermes_index" => self.tool_index().map_err(internal),
            "hermes_fact" => {
                let fact_type = args["fact_type"].as_str().unwrap_or("");
                let content = args["content"].as_str().unwrap_or("");
                if fact_type.is_empty() || content.is_empty() {
                    return Err(JsonRpcError::invalid_params(
                        "hermes_fact requires 'fact_type' and 'content'",
                    ));
                }
                self.tool_fact(fact_type, content).map_err(internal)
            }
            "hermes_facts" => self
                .tool_facts(args["fact_type"].as_str())
                .map_err(internal),
            "hermes_stats" => self.tool_stats(args["since"].as_str()).map_err(internal),
            other => Err(JsonRpcError::invalid_params(format!("unknown tool: {other}"))),
        }
    }

    fn tool_search(&self, query: &str) -> hermes_graph::Result<String> {
        let response = self.engine.search_engine().search(query, 10)?;
        self.engine.accountant().record_query(
            query,
            response.accounting.pointer_tokens,
            0,
            response.accounting.traditional_rag_estimate,
        )?;
        Ok(serde_json::to_string_pretty(&response)?)
    }

    fn tool_fetch(&self, node_id: &str) -> Result<String, JsonRpcError> {
        let fetched = self
            .engine
            .search_engine()
            .fetch(node_id)
            .map_err(internal)?;
        let Some(response) = fetched else {
            return Err(JsonRpcError::invalid_params(format!("node not found: {node_id}")));
        };
        self.engine
            .accountant()
            .record_query(node_id, 0, response.token_count, response.token_count * 15)
            .map_err(internal)?;
        serde_json::to_string_pretty(&response).map_err(|e| internal(e.into()))
    }

    fn tool_index(&self) -> hermes_graph::Result<String> {
        let report = self.engine.pipeline().ingest_directory(&self.project_root)?;
        self.engine.invalidate_caches();
        tracing::info!("indexed on request: {report}");
        Ok(serde_json::to_string_pretty(&report)?)
    }

    fn tool_fact(&self, fact_type: &str, content: &str) -> hermes_graph::Result<String> {
        let id = self
            .engine
            .facts()
            .add_fact(FactType::parse(fact_type), content, None, None)?;
        Ok(serde_json::to_string_pretty(&json!({ "id": id, "status": "recorded" }))?)
    }

    fn tool_facts(&self, filter: Option<&str>) -> hermes_graph::Result<String> {
        let facts = self
            .engine
            .facts()
            .get_active_facts(filter.map(FactType::parse))?;
        Ok(serde_json::to_string_pretty(&facts)?)
    }

    fn tool_stats(&self, since: Option<&str>) -> hermes_graph::Result<String> {
        let accountant = self.engine.accountant();
        let session = accountant.session_totals()?;
        let cumulative = accountant.totals_since(since.and_then(parse_since_window))?;
        Ok(serde_json::to_string_pretty(&json!({
            "since_filter": since.unwrap_or("all"),
            "session": totals_json(&session),
            "cumulative": totals_json(&cumulative),
        }))?)
    }
}

fn totals_json(totals: &UsageTotals) -> Value {
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

fn internal(e: hermes_graph::HermesError) -> JsonRpcError {
    JsonRpcError::internal_error(e.to_string())
}

fn write_response(out: &mut impl Write, response: &JsonRpcResponse) -> io::Result<()> {
    let payload = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(out, "{payload}")?;
    out.flush()
}
