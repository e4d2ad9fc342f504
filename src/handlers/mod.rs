pub mod delete;
pub mod health;
pub mod recent;
pub mod resources;
pub mod retrieve;
pub mod share;
pub mod update;

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::protocol::{
    DeleteAllParams, DeleteFeatureParams, DeleteParams, InitializeParams, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, McpErrorCode, McpErrorResponse, ReadResourceParams,
    RecentParams, RetrieveParams, ShareParams, ToolCallParams, ToolResult, UpdateParams,
};
use crate::schema::{self, SchemaValidationError};
use crate::state::ServerState;
use crate::store::{KnowledgeStore, StoreError};
use crate::tools;

/// MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Dispatch a JSON-RPC request to the appropriate handler.
///
/// Returns `None` for notifications (no response required).
pub async fn dispatch(req: &JsonRpcRequest, state: &ServerState) -> Option<JsonRpcResponse> {
    match req.method.as_str() {
        "initialize" => {
            if let Some(params) = req
                .params
                .clone()
                .and_then(|v| serde_json::from_value::<InitializeParams>(v).ok())
            {
                let client = params.client_info.as_ref();
                info!(
                    protocol = params.protocol_version.as_deref().unwrap_or("unspecified"),
                    client = client.and_then(|c| c.name.as_deref()).unwrap_or("unknown"),
                    client_version = client.and_then(|c| c.version.as_deref()).unwrap_or("unknown"),
                    "client initializing"
                );
            }
            let result = serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                    "resources": {}
                },
                "serverInfo": {
                    "name": "agent-knowledge-server",
                    "version": env!("CARGO_PKG_VERSION")
                }
            });
            Some(JsonRpcResponse::success(req.id.clone(), result))
        }

        method if method.starts_with("notifications/") => None,

        "ping" => Some(JsonRpcResponse::success(req.id.clone(), serde_json::json!({}))),

        "tools/list" => {
            let result = serde_json::json!({ "tools": tools::catalog() });
            Some(JsonRpcResponse::success(req.id.clone(), result))
        }

        "tools/call" => {
            let params: ToolCallParams = match &req.params {
                Some(v) => match serde_json::from_value(v.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        return Some(JsonRpcResponse::error(
                            req.id.clone(),
                            JsonRpcError::invalid_params(format!(
                                "Invalid tools/call params: {e}"
                            )),
                        ));
                    }
                },
                None => {
                    return Some(JsonRpcResponse::error(
                        req.id.clone(),
                        JsonRpcError::invalid_params("Missing params for tools/call"),
                    ));
                }
            };

            let tool_result = dispatch_tool_call(&params, state).await;
            let result_json = serde_json::to_value(&tool_result).expect("ToolResult must serialize to JSON Value");
            Some(JsonRpcResponse::success(req.id.clone(), result_json))
        }

        "resources/list" => Some(respond(req, resources::list(state).await)),

        "resources/templates/list" => {
            Some(JsonRpcResponse::success(req.id.clone(), resources::templates()))
        }

        "resources/read" => {
            let params: ReadResourceParams = match req
                .params
                .clone()
                .map(serde_json::from_value::<ReadResourceParams>)
                .transpose()
            {
                Ok(Some(p)) => p,
                Ok(None) => {
                    return Some(JsonRpcResponse::error(
                        req.id.clone(),
                        JsonRpcError::invalid_params("Missing params for resources/read"),
                    ));
                }
                Err(e) => {
                    return Some(JsonRpcResponse::error(
                        req.id.clone(),
                        JsonRpcError::invalid_params(format!("Invalid resources/read params: {e}")),
                    ));
                }
            };
            Some(respond(req, resources::read(&params.uri, state).await))
        }

        _ => Some(JsonRpcResponse::error(
            req.id.clone(),
            JsonRpcError::method_not_found(&req.method),
        )),
    }
}

fn respond(req: &JsonRpcRequest, outcome: Result<Value, McpErrorResponse>) -> JsonRpcResponse {
    match outcome {
        Ok(result) => JsonRpcResponse::success(req.id.clone(), result),
        Err(err) => JsonRpcResponse::error(req.id.clone(), err.into()),
    }
}

async fn dispatch_tool_call(params: &ToolCallParams, state: &ServerState) -> ToolResult {
    let name = params.name.as_str();
    let args = &params.arguments;
    debug!(tool = name, "tool call");

    match name {
        tools::SHARE => with_arguments(name, args, |p: ShareParams| share::handle(p, state)).await,
        tools::RETRIEVE => {
            with_arguments(name, args, |p: RetrieveParams| retrieve::handle(p, state)).await
        }
        tools::RECENT => with_arguments(name, args, |p: RecentParams| recent::handle(p, state)).await,
        tools::UPDATE => with_arguments(name, args, |p: UpdateParams| update::handle(p, state)).await,
        tools::DELETE => with_arguments(name, args, |p: DeleteParams| delete::handle(p, state)).await,
        tools::DELETE_FEATURE => {
            with_arguments(name, args, |p: DeleteFeatureParams| {
                delete::handle_feature(p, state)
            })
            .await
        }
        tools::DELETE_ALL => {
            with_arguments(name, args, |p: DeleteAllParams| delete::handle_all(p, state)).await
        }
        tools::HEALTH => health::handle(state).await,

        _ => ToolResult::error(format!("Unknown tool: {}", params.name)),
    }
}

async fn with_arguments<T, F, Fut>(tool: &str, arguments: &Option<Value>, handler: F) -> ToolResult
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = ToolResult>,
{
    match parse_arguments(tool, arguments) {
        Ok(params) => handler(params).await,
        Err(err) => err.into(),
    }
}

/// Check `arguments` against the tool's advertised schema, then deserialize.
pub fn parse_arguments<T: DeserializeOwned>(
    tool: &str,
    arguments: &Option<Value>,
) -> Result<T, McpErrorResponse> {
    let schema = tools::input_schema(tool)
        .ok_or_else(|| McpErrorResponse::invalid_params(format!("Unknown tool: {tool}")))?;
    let args = arguments
        .clone()
        .unwrap_or_else(|| Value::Object(Default::default()));

    schema::validate_value(&schema, &args).map_err(|e| match e {
        SchemaValidationError::ValidationFailed(violations) => McpErrorResponse::invalid_params(
            format!("Invalid arguments for {tool}: {}", violations.join("; ")),
        ),
        other => {
            error!(tool, error = %other, "tool schema is unusable");
            McpErrorResponse::canonical(McpErrorCode::InternalError)
        }
    })?;

    serde_json::from_value(args).map_err(|e| {
        McpErrorResponse::invalid_params(format!("Invalid arguments for {tool}: {e}"))
    })
}

/// Run a store operation on the blocking pool under the configured timeout.
///
/// Storage failures become `storage_error` responses naming the operation;
/// join failures and timeouts become `internal_error`.
pub(crate) async fn run_store<T, F>(
    state: &ServerState,
    operation: &'static str,
    f: F,
) -> Result<T, McpErrorResponse>
where
    T: Send + 'static,
    F: FnOnce(&KnowledgeStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = state.store.clone();
    let timeout = state.config.tool_timeout;
    let task = tokio::task::spawn_blocking(move || f(&store));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(store_err))) => {
            error!(operation, error = %store_err, "store operation failed");
            Err(McpErrorResponse::new(
                McpErrorCode::StorageError,
                format!("Failed to {operation}: {store_err}"),
            ))
        }
        Ok(Err(join_err)) => {
            error!(operation, error = %join_err, "task join error");
            Err(McpErrorResponse::canonical(McpErrorCode::InternalError))
        }
        Err(_) => {
            error!(operation, seconds = timeout.as_secs(), "operation timed out");
            Err(McpErrorResponse::canonical(McpErrorCode::InternalError))
        }
    }
}

/// Serialize a handler payload into a text tool result.
pub(crate) fn json_text<T: serde::Serialize>(payload: &T) -> Result<String, McpErrorResponse> {
    serde_json::to_string(payload).map_err(|e| {
        error!(error = %e, "serialization failed");
        McpErrorResponse::canonical(McpErrorCode::InternalError)
    })
}
