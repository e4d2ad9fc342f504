use serde::Serialize;
use tracing::info;

use crate::handlers::{json_text, run_store};
use crate::protocol::{McpErrorResponse, ShareParams, ToolResult};
use crate::state::ServerState;
use crate::store::{KnowledgeEntry, NewEntry};
use crate::validation;

#[derive(Debug, Serialize)]
struct ShareResponse {
    status: &'static str,
    message: &'static str,
    entry: KnowledgeEntry,
}

/// Handle an `agent_knowledge_share` tool call.
pub async fn handle(params: ShareParams, state: &ServerState) -> ToolResult {
    match share(params, state).await {
        Ok(json) => ToolResult::text(json),
        Err(mcp_err) => mcp_err.into(),
    }
}

async fn share(params: ShareParams, state: &ServerState) -> Result<String, McpErrorResponse> {
    validation::agent(&params.agent)?;
    validation::feature(&params.feature)?;
    validation::summary(&params.summary)?;
    validation::branch(params.branch.as_deref())?;

    let mut new = NewEntry::new(params.agent.trim(), params.feature, params.summary.trim());
    new.branch = params.branch;
    new.metadata = params.metadata;

    let entry = run_store(state, "share knowledge", move |store| store.create(new)).await?;
    info!(id = %entry.id, agent = %entry.agent, feature = %entry.feature, "knowledge shared");

    json_text(&ShareResponse {
        status: "success",
        message: "Knowledge shared successfully",
        entry,
    })
}
