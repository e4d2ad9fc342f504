//! Catalog of advertised tools and their input schemas.
//!
//! The same schemas are returned by `tools/list` and enforced on every
//! `tools/call`, so clients and server cannot disagree about arguments.

use serde_json::{json, Value};

use crate::config::MAX_LIMIT;
use crate::validation::{MAX_AGENT_LEN, MAX_BRANCH_LEN, MAX_FEATURE_LEN, MAX_SUMMARY_LEN};

pub const SHARE: &str = "agent_knowledge_share";
pub const RETRIEVE: &str = "agent_knowledge_retrieve";
pub const RECENT: &str = "agent_knowledge_recent";
pub const UPDATE: &str = "agent_knowledge_update";
pub const DELETE: &str = "agent_knowledge_delete";
pub const DELETE_FEATURE: &str = "agent_knowledge_delete_feature";
pub const DELETE_ALL: &str = "agent_knowledge_delete_all";
pub const HEALTH: &str = "agent_knowledge_health";

/// Upper bound for the `hours` look-back of `agent_knowledge_recent` (one week).
pub const MAX_RECENT_HOURS: u32 = 168;

fn response_format_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["markdown", "json"],
        "description": "Output format: human-readable markdown (default) or structured json"
    })
}

fn metadata_schema() -> Value {
    json!({
        "type": ["object", "null"],
        "description": "Optional structured data (endpoints, schemas, decisions)"
    })
}

/// Every tool definition, in the order `tools/list` reports them.
pub fn catalog() -> Vec<Value> {
    vec![
        json!({
            "name": SHARE,
            "description": "Share new knowledge about a feature so other agents can find it",
            "inputSchema": {
                "type": "object",
                "required": ["agent", "feature", "summary"],
                "additionalProperties": false,
                "properties": {
                    "agent": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": MAX_AGENT_LEN,
                        "description": "Name of the sharing agent, e.g. 'backend-agent'"
                    },
                    "feature": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": MAX_FEATURE_LEN,
                        "description": "Feature slug (lowercase, hyphen-separated), e.g. 'user-auth'"
                    },
                    "summary": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": MAX_SUMMARY_LEN,
                        "description": "What was implemented or learned, e.g. 'CREATED POST /login - returns {token}'"
                    },
                    "branch": {
                        "type": ["string", "null"],
                        "maxLength": MAX_BRANCH_LEN,
                        "description": "Optional git branch name"
                    },
                    "metadata": metadata_schema()
                }
            }
        }),
        json!({
            "name": RETRIEVE,
            "description": "Retrieve knowledge entries, newest first, filtered by feature, agent or branch",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "feature": { "type": "string", "description": "Exact feature name" },
                    "agent": { "type": "string", "description": "Exact agent name" },
                    "branch": { "type": "string", "description": "Exact git branch" },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_LIMIT,
                        "description": "Maximum number of entries to return"
                    },
                    "offset": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Number of entries to skip, for pagination"
                    },
                    "response_format": response_format_schema()
                }
            }
        }),
        json!({
            "name": RECENT,
            "description": "List knowledge shared across all features within the last N hours",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "hours": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_RECENT_HOURS,
                        "description": "Look-back window in hours (default 24)"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_LIMIT,
                        "description": "Maximum number of entries to return (default 20)"
                    },
                    "response_format": response_format_schema()
                }
            }
        }),
        json!({
            "name": UPDATE,
            "description": "Replace the summary (and optionally the metadata) of an existing entry",
            "inputSchema": {
                "type": "object",
                "required": ["id", "summary"],
                "additionalProperties": false,
                "properties": {
                    "id": { "type": "string", "minLength": 1, "description": "Entry id" },
                    "summary": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": MAX_SUMMARY_LEN,
                        "description": "New summary text"
                    },
                    "metadata": metadata_schema()
                }
            }
        }),
        json!({
            "name": DELETE,
            "description": "Delete one knowledge entry by id",
            "inputSchema": {
                "type": "object",
                "required": ["id"],
                "additionalProperties": false,
                "properties": {
                    "id": { "type": "string", "minLength": 1, "description": "Entry id" }
                }
            }
        }),
        json!({
            "name": DELETE_FEATURE,
            "description": "Delete every entry of a feature (requires confirm: true)",
            "inputSchema": {
                "type": "object",
                "required": ["feature"],
                "additionalProperties": false,
                "properties": {
                    "feature": { "type": "string", "minLength": 1, "description": "Feature name" },
                    "confirm": { "type": "boolean", "description": "Must be true to proceed" }
                }
            }
        }),
        json!({
            "name": DELETE_ALL,
            "description": "Delete every knowledge entry (requires confirm: true)",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "confirm": { "type": "boolean", "description": "Must be true to proceed" }
                }
            }
        }),
        json!({
            "name": HEALTH,
            "description": "Report store status and corpus statistics",
            "inputSchema": {
                "type": "object",
                "additionalProperties": false,
                "properties": {}
            }
        }),
    ]
}

/// Input schema of the named tool, if it exists.
pub fn input_schema(name: &str) -> Option<Value> {
    catalog()
        .into_iter()
        .find(|tool| tool["name"] == name)
        .map(|mut tool| tool["inputSchema"].take())
}
