use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form structured data attached to an entry.
pub type Metadata = Map<String, Value>;

/// One unit of shared knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub agent: String,
    pub feature: String,
    pub summary: String,
    pub branch: Option<String>,
    pub metadata: Option<Metadata>,
    pub timestamp: DateTime<Utc>,
}

/// Input to [`KnowledgeStore::create`](super::KnowledgeStore::create).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEntry {
    pub agent: String,
    pub feature: String,
    pub summary: String,
    pub branch: Option<String>,
    pub metadata: Option<Metadata>,
}

impl NewEntry {
    pub fn new(
        agent: impl Into<String>,
        feature: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            agent: agent.into(),
            feature: feature.into(),
            summary: summary.into(),
            branch: None,
            metadata: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Exact-match filters for [`KnowledgeStore::list`](super::KnowledgeStore::list).
///
/// All present fields are ANDed. `since` keeps entries strictly newer than
/// the given instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub feature: Option<String>,
    pub agent: Option<String>,
    pub branch: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn feature(feature: impl Into<String>) -> Self {
        Self {
            feature: Some(feature.into()),
            ..Self::default()
        }
    }

    pub fn agent(agent: impl Into<String>) -> Self {
        Self {
            agent: Some(agent.into()),
            ..Self::default()
        }
    }
}

/// A slice of an ordered result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// `None` means "to the end".
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }
}

/// Per-feature aggregate used for discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub feature: String,
    pub count: usize,
    pub latest_timestamp: DateTime<Utc>,
    pub contributing_agents: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureOrder {
    /// Feature name ascending.
    ByName,
    /// Most recently touched feature first.
    ByRecency,
}

/// Corpus-wide counters reported by the health tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_entries: usize,
    pub total_features: usize,
    pub total_agents: usize,
}
