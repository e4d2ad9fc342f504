//! Read-only `knowledge://` resources for discovery without a tool call.
//!
//! - `knowledge://features`: feature summaries, most recent first
//! - `knowledge://{feature}`: entries of one feature, newest first, as many
//!   as fit the character budget
//! - `knowledge://{feature}/{id}`: a single entry

use serde_json::{json, Value};

use crate::format::{self, EntryPage};
use crate::handlers::{json_text, run_store};
use crate::protocol::{McpErrorResponse, ResourceContents};
use crate::state::ServerState;
use crate::store::{EntryFilter, FeatureOrder, Page};

const SCHEME: &str = "knowledge://";
const FEATURES_URI: &str = "knowledge://features";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePath {
    Features,
    Feature(String),
    Entry { feature: String, id: String },
}

impl ResourcePath {
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(SCHEME)?;
        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            ["features"] => Some(Self::Features),
            [feature] if !feature.is_empty() => Some(Self::Feature(feature.to_string())),
            [feature, id] if !feature.is_empty() && !id.is_empty() => Some(Self::Entry {
                feature: feature.to_string(),
                id: id.to_string(),
            }),
            _ => None,
        }
    }
}

/// `resources/list`: the feature index plus one resource per known feature.
pub async fn list(state: &ServerState) -> Result<Value, McpErrorResponse> {
    let summaries = run_store(state, "list features", |store| {
        store.feature_summaries(FeatureOrder::ByRecency)
    })
    .await?;

    let mut resources = vec![json!({
        "uri": FEATURES_URI,
        "name": "Knowledge features",
        "description": "Every feature with entry count, latest update and contributing agents",
        "mimeType": "application/json"
    })];
    resources.extend(summaries.iter().map(|s| {
        json!({
            "uri": format!("{SCHEME}{}", s.feature),
            "name": s.feature,
            "description": format!(
                "{} entries from {}",
                s.count,
                s.contributing_agents.join(", ")
            ),
            "mimeType": "application/json"
        })
    }));

    Ok(json!({ "resources": resources }))
}

/// `resources/templates/list`.
pub fn templates() -> Value {
    json!({
        "resourceTemplates": [
            {
                "uriTemplate": "knowledge://{feature}",
                "name": "Feature knowledge",
                "description": "All entries shared under a feature, newest first",
                "mimeType": "application/json"
            },
            {
                "uriTemplate": "knowledge://{feature}/{id}",
                "name": "Knowledge entry",
                "description": "A single knowledge entry",
                "mimeType": "application/json"
            }
        ]
    })
}

/// `resources/read`.
pub async fn read(uri: &str, state: &ServerState) -> Result<Value, McpErrorResponse> {
    let path = ResourcePath::parse(uri)
        .ok_or_else(|| McpErrorResponse::invalid_params(format!("Unknown resource URI: {uri}")))?;

    let text = match path {
        ResourcePath::Features => {
            let summaries = run_store(state, "list features", |store| {
                store.feature_summaries(FeatureOrder::ByRecency)
            })
            .await?;
            json_text(&summaries)?
        }
        ResourcePath::Feature(feature) => {
            let (total, entries) = run_store(state, "read feature", move |store| {
                store.page(&EntryFilter::feature(feature), Page::all())
            })
            .await?;
            let page = EntryPage {
                title: uri,
                entries: &entries,
                total,
                offset: 0,
            };
            format::json_within(&page, state.config.character_limit)
        }
        ResourcePath::Entry { feature, id } => {
            let lookup = id.clone();
            let entry = run_store(state, "read entry", move |store| store.get(&lookup))
                .await?
                .filter(|entry| entry.feature == feature)
                .ok_or_else(|| {
                    McpErrorResponse::not_found(format!(
                        "Entry {id} not found in feature '{feature}'"
                    ))
                })?;
            json_text(&entry)?
        }
    };

    Ok(json!({ "contents": [ResourceContents::json(uri, text)] }))
}
