use chrono::{Duration, Utc};
use tracing::info;

use crate::format::{self, EntryPage};
use crate::handlers::run_store;
use crate::protocol::{McpErrorResponse, RecentParams, ToolResult};
use crate::state::ServerState;
use crate::store::{EntryFilter, Page};

/// Handle an `agent_knowledge_recent` tool call: entries from every feature
/// newer than `hours` ago, newest first.
pub async fn handle(params: RecentParams, state: &ServerState) -> ToolResult {
    match recent(params, state).await {
        Ok(text) => ToolResult::text(text),
        Err(mcp_err) => mcp_err.into(),
    }
}

async fn recent(params: RecentParams, state: &ServerState) -> Result<String, McpErrorResponse> {
    let filter = EntryFilter {
        since: Some(Utc::now() - Duration::hours(i64::from(params.hours))),
        ..EntryFilter::default()
    };
    let page = Page::new(params.limit, 0);

    let (total, entries) =
        run_store(state, "get recent knowledge", move |store| store.page(&filter, page)).await?;

    info!(returned = entries.len(), hours = params.hours, "recent knowledge retrieved");

    let title = format!("Recent knowledge (last {} hours)", params.hours);
    let page = EntryPage {
        title: &title,
        entries: &entries,
        total,
        offset: 0,
    };
    Ok(format::render(
        &page,
        params.response_format,
        state.config.character_limit,
    ))
}
