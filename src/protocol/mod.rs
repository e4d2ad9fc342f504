pub mod request;
pub mod response;

pub use request::{
    DeleteAllParams, DeleteFeatureParams, DeleteParams, InitializeParams, JsonRpcRequest,
    ReadResourceParams, RecentParams, RetrieveParams, RpcId, ShareParams, ToolCallParams,
    UpdateParams,
};
pub use response::{
    JsonRpcError, JsonRpcResponse, McpError, McpErrorCode, McpErrorResponse, ResourceContents,
    ToolResult, ToolResultContent,
};
