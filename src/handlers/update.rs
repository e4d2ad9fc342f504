use serde::Serialize;
use tracing::info;

use crate::handlers::{json_text, run_store};
use crate::protocol::{McpErrorResponse, ToolResult, UpdateParams};
use crate::state::ServerState;
use crate::store::KnowledgeEntry;
use crate::validation;

#[derive(Debug, Serialize)]
struct UpdateResponse {
    status: &'static str,
    entry: KnowledgeEntry,
}

/// Handle an `agent_knowledge_update` tool call.
///
/// Agent, feature and branch of the entry are never changed. Omitting
/// `metadata` keeps the stored value.
pub async fn handle(params: UpdateParams, state: &ServerState) -> ToolResult {
    match update(params, state).await {
        Ok(json) => ToolResult::text(json),
        Err(mcp_err) => mcp_err.into(),
    }
}

async fn update(params: UpdateParams, state: &ServerState) -> Result<String, McpErrorResponse> {
    validation::id(&params.id)?;
    validation::summary(&params.summary)?;

    let id = params.id.clone();
    let summary = params.summary.trim().to_string();
    let metadata = params.metadata;
    let updated = run_store(state, "update entry", move |store| {
        store.update(&id, &summary, metadata)
    })
    .await?;

    let Some(entry) = updated else {
        return Err(McpErrorResponse::not_found(format!(
            "Entry with id {} not found",
            params.id
        )));
    };
    info!(id = %entry.id, feature = %entry.feature, "entry updated");

    json_text(&UpdateResponse {
        status: "updated",
        entry,
    })
}
