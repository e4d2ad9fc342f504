use chrono::Utc;
use serde::Serialize;

use crate::handlers::{json_text, run_store};
use crate::protocol::ToolResult;
use crate::state::ServerState;
use crate::store::StoreStats;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database_path: String,
    statistics: StoreStats,
    server_time: String,
}

/// Handle an `agent_knowledge_health` tool call.
pub async fn handle(state: &ServerState) -> ToolResult {
    let outcome = match run_store(state, "read statistics", |store| store.stats()).await {
        Ok(statistics) => json_text(&HealthResponse {
            status: "healthy",
            database_path: state.store.path().display().to_string(),
            statistics,
            server_time: Utc::now().to_rfc3339(),
        }),
        Err(err) => Err(err),
    };

    match outcome {
        Ok(json) => ToolResult::text(json),
        Err(mcp_err) => mcp_err.into(),
    }
}
