//! Integration tests for tool and resource handlers.
//!
//! Tests go through `handlers::dispatch` with a store in a temporary
//! directory, the same path a stdio client exercises.

use std::path::Path;

use agent_knowledge_server::config::ServerConfig;
use agent_knowledge_server::handlers;
use agent_knowledge_server::protocol::{JsonRpcRequest, RpcId};
use agent_knowledge_server::state::ServerState;
use serde_json::{json, Value};

fn test_state(root: &Path) -> ServerState {
    ServerState::open(ServerConfig::with_db_path(root.join("kb").join("knowledge.db"))).unwrap()
}

fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: Some(RpcId::Number(1)),
        method: method.into(),
        params,
    }
}

/// Outcome of a `tools/call`: whether it failed, and its text content.
struct ToolOutcome {
    is_error: bool,
    text: String,
}

impl ToolOutcome {
    fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap()
    }

    fn error_code(&self) -> String {
        assert!(self.is_error, "expected a tool error, got: {}", self.text);
        self.json()["error"]["code"].as_str().unwrap().to_string()
    }
}

async fn call(state: &ServerState, tool: &str, arguments: Value) -> ToolOutcome {
    let req = request(
        "tools/call",
        Some(json!({ "name": tool, "arguments": arguments })),
    );
    let response = handlers::dispatch(&req, state).await.unwrap();
    let result = response.result.expect("tools/call always returns a result");
    ToolOutcome {
        is_error: result.get("isError").and_then(Value::as_bool).unwrap_or(false),
        text: result["content"][0]["text"].as_str().unwrap().to_string(),
    }
}

async fn share(state: &ServerState, agent: &str, feature: &str, summary: &str) -> Value {
    let outcome = call(
        state,
        "agent_knowledge_share",
        json!({ "agent": agent, "feature": feature, "summary": summary }),
    )
    .await;
    assert!(!outcome.is_error, "share failed: {}", outcome.text);
    outcome.json()["entry"].clone()
}

// ---------------------------------------------------------------------------
// protocol surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initialize_advertises_tools_and_resources() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());

    let req = request(
        "initialize",
        Some(json!({
            "protocolVersion": "2024-11-05",
            "clientInfo": { "name": "test-client", "version": "0.0.1" }
        })),
    );
    let result = handlers::dispatch(&req, &state).await.unwrap().result.unwrap();
    assert_eq!(result["serverInfo"]["name"], "agent-knowledge-server");
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"]["resources"].is_object());
}

#[tokio::test]
async fn notifications_get_no_response() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());

    let mut req = request("notifications/initialized", None);
    req.id = None;
    assert!(handlers::dispatch(&req, &state).await.is_none());
}

#[tokio::test]
async fn dispatch_tools_list_advertises_all_tools() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());

    let response = handlers::dispatch(&request("tools/list", None), &state).await.unwrap();
    let result = response.result.unwrap();
    let tools = result["tools"].as_array().unwrap();

    let tool_names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for expected in [
        "agent_knowledge_share",
        "agent_knowledge_retrieve",
        "agent_knowledge_recent",
        "agent_knowledge_update",
        "agent_knowledge_delete",
        "agent_knowledge_delete_feature",
        "agent_knowledge_delete_all",
        "agent_knowledge_health",
    ] {
        assert!(tool_names.contains(&expected), "Should advertise {expected}");
    }
    assert_eq!(tools.len(), 8, "Should advertise exactly 8 tools");
}

#[tokio::test]
async fn unknown_tool_and_method_are_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());

    let outcome = call(&state, "agent_knowledge_search", json!({})).await;
    assert!(outcome.is_error);
    assert!(outcome.text.contains("Unknown tool"));

    let response = handlers::dispatch(&request("prompts/list", None), &state).await.unwrap();
    assert_eq!(response.error.unwrap().code, -32601);
}

// ---------------------------------------------------------------------------
// share / retrieve
// ---------------------------------------------------------------------------

#[tokio::test]
async fn share_then_retrieve_as_json() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());

    let outcome = call(
        &state,
        "agent_knowledge_share",
        json!({
            "agent": "backend-agent",
            "feature": "user-auth",
            "summary": "CREATED POST /api/auth/login - returns {token}",
            "branch": "feature/user-auth",
            "metadata": { "endpoint": "/api/auth/login" }
        }),
    )
    .await;
    assert!(!outcome.is_error, "{}", outcome.text);
    let shared = outcome.json();
    assert_eq!(shared["status"], "success");
    let id = shared["entry"]["id"].as_str().unwrap().to_string();

    let outcome = call(
        &state,
        "agent_knowledge_retrieve",
        json!({ "feature": "user-auth", "response_format": "json" }),
    )
    .await;
    assert!(!outcome.is_error);
    let page = outcome.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["has_more"], false);
    let entry = &page["entries"][0];
    assert_eq!(entry["id"], id.as_str());
    assert_eq!(entry["agent"], "backend-agent");
    assert_eq!(entry["branch"], "feature/user-auth");
    assert_eq!(entry["metadata"]["endpoint"], "/api/auth/login");
}

#[tokio::test]
async fn retrieve_defaults_to_markdown() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    share(&state, "backend", "user-auth", "CREATED POST /login").await;

    let outcome = call(&state, "agent_knowledge_retrieve", json!({ "agent": "backend" })).await;
    assert!(!outcome.is_error);
    assert!(outcome.text.starts_with("# Knowledge: agent `backend`"));
    assert!(outcome.text.contains("CREATED POST /login"));
}

#[tokio::test]
async fn share_rejects_non_slug_feature_and_short_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());

    let outcome = call(
        &state,
        "agent_knowledge_share",
        json!({ "agent": "backend", "feature": "User Auth", "summary": "CREATED POST /login" }),
    )
    .await;
    assert_eq!(outcome.error_code(), "invalid_params");

    let outcome = call(
        &state,
        "agent_knowledge_share",
        json!({ "agent": "backend", "feature": "user-auth", "summary": "short" }),
    )
    .await;
    assert_eq!(outcome.error_code(), "invalid_params");

    let outcome = call(
        &state,
        "agent_knowledge_share",
        json!({ "agent": "backend", "feature": "user-auth" }),
    )
    .await;
    assert_eq!(outcome.error_code(), "invalid_params");

    assert_eq!(state.store.stats().unwrap().total_entries, 0, "rejected input never reaches the store");
}

#[tokio::test]
async fn schema_rejects_out_of_range_and_unknown_arguments() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());

    for args in [
        json!({ "limit": 0 }),
        json!({ "limit": 101 }),
        json!({ "offset": -1 }),
        json!({ "response_format": "xml" }),
        json!({ "feature": 42 }),
        json!({ "query": "login" }),
    ] {
        let outcome = call(&state, "agent_knowledge_retrieve", args.clone()).await;
        assert_eq!(outcome.error_code(), "invalid_params", "args {args} should be rejected");
    }
}

#[tokio::test]
async fn retrieve_paginates_with_offset() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    for n in 0..3 {
        share(&state, "backend", "search-feature", &format!("INDEXED shard number {n}")).await;
    }

    let first = call(
        &state,
        "agent_knowledge_retrieve",
        json!({ "feature": "search-feature", "limit": 2, "response_format": "json" }),
    )
    .await
    .json();
    assert_eq!(first["count"], 2);
    assert_eq!(first["has_more"], true);
    assert_eq!(first["next_offset"], 2);

    let second = call(
        &state,
        "agent_knowledge_retrieve",
        json!({ "feature": "search-feature", "limit": 2, "offset": 2, "response_format": "json" }),
    )
    .await
    .json();
    assert_eq!(second["count"], 1);
    assert_eq!(second["has_more"], false);

    let mut seen: Vec<Value> = first["entries"].as_array().unwrap().clone();
    seen.extend(second["entries"].as_array().unwrap().iter().cloned());
    let ids: std::collections::HashSet<_> = seen.iter().map(|e| e["id"].clone().to_string()).collect();
    assert_eq!(ids.len(), 3, "pages must not overlap");
}

#[tokio::test]
async fn oversized_markdown_is_truncated_with_note() {
    let tmp = tempfile::tempdir().unwrap();
    let mut state = test_state(tmp.path());
    state.config.character_limit = 300;

    for n in 0..5 {
        share(
            &state,
            "backend",
            "user-auth",
            &format!("DOCUMENTED login flow step {n} {}", "detail ".repeat(20)),
        )
        .await;
    }

    let outcome = call(&state, "agent_knowledge_retrieve", json!({ "feature": "user-auth" })).await;
    assert!(!outcome.is_error);
    assert!(outcome.text.contains("Response truncated"));
}

#[tokio::test]
async fn recent_lists_entries_from_every_feature() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    share(&state, "backend", "user-auth", "CREATED POST /login").await;
    share(&state, "frontend", "admin-dashboard", "CREATED dashboard shell").await;

    let page = call(
        &state,
        "agent_knowledge_recent",
        json!({ "hours": 1, "response_format": "json" }),
    )
    .await
    .json();
    assert_eq!(page["total"], 2);

    let outcome = call(&state, "agent_knowledge_recent", json!({ "hours": 500 })).await;
    assert_eq!(outcome.error_code(), "invalid_params");
}

// ---------------------------------------------------------------------------
// update / delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_preserves_metadata_unless_supplied() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());

    let shared = call(
        &state,
        "agent_knowledge_share",
        json!({
            "agent": "backend",
            "feature": "user-auth",
            "summary": "CREATED POST /login",
            "metadata": { "status": 200 }
        }),
    )
    .await
    .json();
    let id = shared["entry"]["id"].as_str().unwrap().to_string();

    let updated = call(
        &state,
        "agent_knowledge_update",
        json!({ "id": id, "summary": "CREATED POST /login v2" }),
    )
    .await
    .json();
    assert_eq!(updated["status"], "updated");
    assert_eq!(updated["entry"]["summary"], "CREATED POST /login v2");
    assert_eq!(updated["entry"]["metadata"]["status"], 200);
    assert_eq!(updated["entry"]["agent"], "backend");

    let cleared = call(
        &state,
        "agent_knowledge_update",
        json!({ "id": id, "summary": "CREATED POST /login v3", "metadata": {} }),
    )
    .await
    .json();
    assert!(cleared["entry"]["metadata"].is_null());
}

#[tokio::test]
async fn update_and_delete_unknown_id_are_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());

    let outcome = call(
        &state,
        "agent_knowledge_update",
        json!({ "id": "missing", "summary": "CREATED something new" }),
    )
    .await;
    assert_eq!(outcome.error_code(), "not_found");

    let outcome = call(&state, "agent_knowledge_delete", json!({ "id": "missing" })).await;
    assert_eq!(outcome.error_code(), "not_found");
}

#[tokio::test]
async fn delete_removes_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    let entry = share(&state, "backend", "user-auth", "CREATED POST /login").await;
    let id = entry["id"].as_str().unwrap();

    let outcome = call(&state, "agent_knowledge_delete", json!({ "id": id })).await;
    assert!(!outcome.is_error);
    assert_eq!(outcome.json()["status"], "deleted");
    assert!(state.store.get(id).unwrap().is_none());
}

#[tokio::test]
async fn delete_feature_requires_confirmation_and_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    share(&state, "backend", "user-auth", "CREATED POST /login").await;
    share(&state, "frontend", "user-auth", "CREATED Login form").await;
    share(&state, "backend", "payment-api", "CREATED POST /charge").await;

    let outcome = call(&state, "agent_knowledge_delete_feature", json!({ "feature": "user-auth" })).await;
    assert_eq!(outcome.error_code(), "confirmation_required");
    assert_eq!(state.store.stats().unwrap().total_entries, 3);

    let args = json!({ "feature": "user-auth", "confirm": true });
    let deleted = call(&state, "agent_knowledge_delete_feature", args.clone()).await.json();
    assert_eq!(deleted["status"], "deleted");
    assert_eq!(deleted["count"], 2);

    let again = call(&state, "agent_knowledge_delete_feature", args).await.json();
    assert_eq!(again["status"], "no_action");
    assert_eq!(again["count"], 0);
    assert_eq!(state.store.stats().unwrap().total_entries, 1);
}

#[tokio::test]
async fn delete_all_requires_confirmation() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    share(&state, "backend", "user-auth", "CREATED POST /login").await;

    let outcome = call(&state, "agent_knowledge_delete_all", json!({})).await;
    assert_eq!(outcome.error_code(), "confirmation_required");

    let deleted = call(&state, "agent_knowledge_delete_all", json!({ "confirm": true })).await.json();
    assert_eq!(deleted["count"], 1);

    let again = call(&state, "agent_knowledge_delete_all", json!({ "confirm": true })).await.json();
    assert_eq!(again["status"], "no_action");
}

#[tokio::test]
async fn health_reports_statistics() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    share(&state, "backend", "user-auth", "CREATED POST /login").await;
    share(&state, "frontend", "user-auth", "CREATED Login form").await;

    let health = call(&state, "agent_knowledge_health", json!({})).await.json();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["statistics"]["total_entries"], 2);
    assert_eq!(health["statistics"]["total_features"], 1);
    assert_eq!(health["statistics"]["total_agents"], 2);
}

// ---------------------------------------------------------------------------
// resources
// ---------------------------------------------------------------------------

async fn read_resource(state: &ServerState, uri: &str) -> Result<Value, Value> {
    let req = request("resources/read", Some(json!({ "uri": uri })));
    let response = handlers::dispatch(&req, state).await.unwrap();
    match response.error {
        Some(err) => Err(serde_json::to_value(err).unwrap()),
        None => {
            let result = response.result.unwrap();
            assert_eq!(result["contents"][0]["uri"], uri);
            let text = result["contents"][0]["text"].as_str().unwrap();
            Ok(serde_json::from_str(text).unwrap())
        }
    }
}

#[tokio::test]
async fn resources_expose_features_and_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    let entry = share(&state, "backend", "user-auth", "CREATED POST /login").await;
    share(&state, "frontend", "user-auth", "CREATED Login form").await;
    let id = entry["id"].as_str().unwrap();

    let features = read_resource(&state, "knowledge://features").await.unwrap();
    assert_eq!(features[0]["feature"], "user-auth");
    assert_eq!(features[0]["count"], 2);
    assert_eq!(features[0]["contributing_agents"], json!(["backend", "frontend"]));

    let page = read_resource(&state, "knowledge://user-auth").await.unwrap();
    assert_eq!(page["total"], 2);
    assert_eq!(page["has_more"], false);
    assert_eq!(page["entries"].as_array().unwrap().len(), 2);

    let single = read_resource(&state, &format!("knowledge://user-auth/{id}")).await.unwrap();
    assert_eq!(single["summary"], "CREATED POST /login");

    let err = read_resource(&state, &format!("knowledge://payment-api/{id}")).await.unwrap_err();
    assert_eq!(err["code"], -32602);
    assert_eq!(err["data"]["error"]["code"], "not_found");

    let err = read_resource(&state, "file:///etc/passwd").await.unwrap_err();
    assert_eq!(err["data"]["error"]["code"], "invalid_params");
}

#[tokio::test]
async fn feature_resource_stays_within_character_budget() {
    let tmp = tempfile::tempdir().unwrap();
    let mut state = test_state(tmp.path());
    state.config.character_limit = 2_000;

    for n in 0..10 {
        share(
            &state,
            "backend",
            "user-auth",
            &format!("DOCUMENTED login flow step {n} {}", "detail ".repeat(40)),
        )
        .await;
    }

    let req = request("resources/read", Some(json!({ "uri": "knowledge://user-auth" })));
    let result = handlers::dispatch(&req, &state).await.unwrap().result.unwrap();
    let text = result["contents"][0]["text"].as_str().unwrap();
    assert!(text.chars().count() <= 2_000);

    let page: Value = serde_json::from_str(text).unwrap();
    assert_eq!(page["total"], 10);
    assert_eq!(page["truncated"], true);
    let shown = page["count"].as_u64().unwrap();
    assert!(shown < 10);
    assert_eq!(page["next_offset"], shown);
}

#[tokio::test]
async fn corrupt_row_surfaces_as_storage_error_naming_the_operation() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    let entry = share(&state, "backend", "user-auth", "CREATED POST /login").await;

    let conn = rusqlite::Connection::open(state.store.path()).unwrap();
    conn.execute(
        "UPDATE knowledge SET metadata = '[1]' WHERE id = ?1",
        [entry["id"].as_str().unwrap()],
    )
    .unwrap();
    drop(conn);

    let outcome = call(&state, "agent_knowledge_retrieve", json!({ "feature": "user-auth" })).await;
    assert_eq!(outcome.error_code(), "storage_error");
    let message = outcome.json()["error"]["message"].as_str().unwrap().to_string();
    assert!(
        message.starts_with("Failed to retrieve knowledge"),
        "unexpected message: {message}"
    );
    assert!(message.contains("corrupt"));
}

#[tokio::test]
async fn resources_list_includes_each_feature() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    share(&state, "backend", "user-auth", "CREATED POST /login").await;

    let result = handlers::dispatch(&request("resources/list", None), &state)
        .await
        .unwrap()
        .result
        .unwrap();
    let uris: Vec<&str> = result["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uri"].as_str().unwrap())
        .collect();
    assert_eq!(uris, ["knowledge://features", "knowledge://user-auth"]);

    let templates = handlers::dispatch(&request("resources/templates/list", None), &state)
        .await
        .unwrap()
        .result
        .unwrap();
    assert_eq!(templates["resourceTemplates"].as_array().unwrap().len(), 2);
}
