use serde::{Deserialize, Serialize};

use crate::format::ResponseFormat;
use crate::store::Metadata;

/// JSON-RPC 2.0 ID: may be a number or string per spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    Str(String),
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<RpcId>,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

/// Parameters for `agent_knowledge_share`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareParams {
    pub agent: String,
    pub feature: String,
    pub summary: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Parameters for `agent_knowledge_retrieve`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrieveParams {
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    /// Falls back to the configured default page size.
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// Parameters for `agent_knowledge_recent`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentParams {
    #[serde(default = "default_recent_hours")]
    pub hours: u32,
    #[serde(default = "default_recent_limit")]
    pub limit: usize,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

fn default_recent_hours() -> u32 {
    24
}

fn default_recent_limit() -> usize {
    20
}

/// Parameters for `agent_knowledge_update`.
///
/// A missing or `null` `metadata` keeps what is stored; `{}` clears it.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateParams {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Parameters for `agent_knowledge_delete`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteParams {
    pub id: String,
}

/// Parameters for `agent_knowledge_delete_feature`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteFeatureParams {
    pub feature: String,
    #[serde(default)]
    pub confirm: bool,
}

/// Parameters for `agent_knowledge_delete_all`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteAllParams {
    #[serde(default)]
    pub confirm: bool,
}

/// Parameters for `resources/read`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceParams {
    pub uri: String,
}

/// MCP `initialize` params.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(rename = "clientInfo")]
    pub client_info: Option<ClientInfo>,
}

/// Client information sent during `initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}
