use serde::Serialize;
use tracing::info;

use crate::handlers::{json_text, run_store};
use crate::protocol::{
    DeleteAllParams, DeleteFeatureParams, DeleteParams, McpErrorCode, McpErrorResponse, ToolResult,
};
use crate::state::ServerState;
use crate::validation;

#[derive(Debug, Serialize)]
struct DeleteResponse {
    status: &'static str,
    id: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct BulkDeleteResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature: Option<String>,
    count: usize,
    message: String,
}

fn into_result(outcome: Result<String, McpErrorResponse>) -> ToolResult {
    match outcome {
        Ok(json) => ToolResult::text(json),
        Err(mcp_err) => mcp_err.into(),
    }
}

/// Handle an `agent_knowledge_delete` tool call.
pub async fn handle(params: DeleteParams, state: &ServerState) -> ToolResult {
    into_result(delete(params, state).await)
}

/// Handle an `agent_knowledge_delete_feature` tool call.
///
/// Refuses to run unless `confirm` is true. Zero matches is success.
pub async fn handle_feature(params: DeleteFeatureParams, state: &ServerState) -> ToolResult {
    into_result(delete_feature(params, state).await)
}

/// Handle an `agent_knowledge_delete_all` tool call.
///
/// Refuses to run unless `confirm` is true. An empty store is success.
pub async fn handle_all(params: DeleteAllParams, state: &ServerState) -> ToolResult {
    into_result(delete_all(params, state).await)
}

async fn delete(params: DeleteParams, state: &ServerState) -> Result<String, McpErrorResponse> {
    validation::id(&params.id)?;

    let id = params.id.clone();
    let existed = run_store(state, "delete entry", move |store| store.delete(&id)).await?;
    if !existed {
        return Err(McpErrorResponse::not_found(format!(
            "Entry with id {} not found",
            params.id
        )));
    }
    info!(id = %params.id, "entry deleted");

    json_text(&DeleteResponse {
        status: "deleted",
        message: format!("Knowledge entry {} deleted successfully", params.id),
        id: params.id,
    })
}

async fn delete_feature(
    params: DeleteFeatureParams,
    state: &ServerState,
) -> Result<String, McpErrorResponse> {
    if !params.confirm {
        return Err(McpErrorResponse::new(
            McpErrorCode::ConfirmationRequired,
            format!(
                "Confirmation required. Pass confirm: true to delete all entries for feature '{}'",
                params.feature
            ),
        ));
    }

    let feature = params.feature.clone();
    let count = run_store(state, "delete feature entries", move |store| {
        store.delete_by_feature(&feature)
    })
    .await?;

    let response = if count == 0 {
        BulkDeleteResponse {
            status: "no_action",
            count,
            message: format!("No entries found for feature '{}'", params.feature),
            feature: Some(params.feature),
        }
    } else {
        info!(feature = %params.feature, count, "feature entries deleted");
        BulkDeleteResponse {
            status: "deleted",
            count,
            message: format!("Deleted {count} entries for feature '{}'", params.feature),
            feature: Some(params.feature),
        }
    };
    json_text(&response)
}

async fn delete_all(params: DeleteAllParams, state: &ServerState) -> Result<String, McpErrorResponse> {
    if !params.confirm {
        return Err(McpErrorResponse::new(
            McpErrorCode::ConfirmationRequired,
            "Confirmation required. Pass confirm: true to delete every entry",
        ));
    }

    let count = run_store(state, "delete all entries", |store| store.delete_all()).await?;

    let response = if count == 0 {
        BulkDeleteResponse {
            status: "no_action",
            feature: None,
            count,
            message: "Database is already empty".to_string(),
        }
    } else {
        info!(count, "all entries deleted");
        BulkDeleteResponse {
            status: "deleted",
            feature: None,
            count,
            message: format!("Deleted all {count} entries. Database is now empty."),
        }
    };
    json_text(&response)
}
