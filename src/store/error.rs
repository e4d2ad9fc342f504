use std::path::PathBuf;

/// Failure of the persistence layer itself.
///
/// Every variant names the store operation that was being attempted so the
/// adapter can turn it into an actionable message. "Nothing matched" is never
/// represented here: lookups return `Option`, deletes return counts.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot prepare database directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation}: sqlite error: {source}")]
    Sqlite {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{operation}: stored row {id} is corrupt: {detail}")]
    Corrupt {
        operation: &'static str,
        id: String,
        detail: String,
    },

    #[error("{operation}: cannot serialize metadata: {source}")]
    Metadata {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("database schema version {found} does not match expected {expected}")]
    SchemaMismatch { expected: String, found: String },

    #[error("{operation}: database connection lock poisoned")]
    LockPoisoned { operation: &'static str },
}

impl StoreError {
    /// Name of the store operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Sqlite { operation, .. }
            | Self::Corrupt { operation, .. }
            | Self::Metadata { operation, .. }
            | Self::LockPoisoned { operation } => *operation,
            Self::Io { .. } | Self::SchemaMismatch { .. } => "open",
        }
    }
}

/// Build a `map_err` adapter that tags a rusqlite error with an operation.
pub(crate) fn sql(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |source| StoreError::Sqlite { operation, source }
}
