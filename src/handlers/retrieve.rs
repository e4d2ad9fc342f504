use tracing::info;

use crate::format::{self, EntryPage};
use crate::handlers::run_store;
use crate::protocol::{McpErrorResponse, RetrieveParams, ToolResult};
use crate::state::ServerState;
use crate::store::{EntryFilter, Page};

/// Handle an `agent_knowledge_retrieve` tool call.
///
/// Filters are exact matches and ANDed; results come newest first. The page
/// is cut by the store, then rendered and clipped to the character budget.
pub async fn handle(params: RetrieveParams, state: &ServerState) -> ToolResult {
    match retrieve(params, state).await {
        Ok(text) => ToolResult::text(text),
        Err(mcp_err) => mcp_err.into(),
    }
}

async fn retrieve(params: RetrieveParams, state: &ServerState) -> Result<String, McpErrorResponse> {
    let filter = EntryFilter {
        feature: params.feature,
        agent: params.agent,
        branch: params.branch,
        since: None,
    };
    let page = Page::new(
        params.limit.unwrap_or(state.config.default_limit),
        params.offset,
    );
    let title = title_for(&filter);

    let query = filter.clone();
    let (total, entries) =
        run_store(state, "retrieve knowledge", move |store| store.page(&query, page)).await?;

    info!(
        returned = entries.len(),
        total,
        feature = filter.feature.as_deref().unwrap_or("*"),
        agent = filter.agent.as_deref().unwrap_or("*"),
        branch = filter.branch.as_deref().unwrap_or("*"),
        "knowledge retrieved"
    );

    let page = EntryPage {
        title: &title,
        entries: &entries,
        total,
        offset: page.offset,
    };
    Ok(format::render(
        &page,
        params.response_format,
        state.config.character_limit,
    ))
}

fn title_for(filter: &EntryFilter) -> String {
    let mut parts = Vec::new();
    if let Some(feature) = &filter.feature {
        parts.push(format!("feature `{feature}`"));
    }
    if let Some(agent) = &filter.agent {
        parts.push(format!("agent `{agent}`"));
    }
    if let Some(branch) = &filter.branch {
        parts.push(format!("branch `{branch}`"));
    }
    if parts.is_empty() {
        "Knowledge: all features".to_string()
    } else {
        format!("Knowledge: {}", parts.join(", "))
    }
}
