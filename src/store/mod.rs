//! SQLite-backed knowledge store.
//!
//! One table, `knowledge`, keyed by an opaque UUID. A hidden `seq` column
//! (AUTOINCREMENT, never reused) records insertion order and breaks
//! timestamp ties so list ordering is stable for a given dataset.

mod entry;
mod error;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

pub use entry::{
    EntryFilter, FeatureOrder, FeatureSummary, KnowledgeEntry, Metadata, NewEntry, Page,
    StoreStats,
};
pub use error::StoreError;

use error::sql;

/// Version written to the `meta` table on first open.
pub const SCHEMA_VERSION: &str = "1";

/// How long a writer waits on another process's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ENTRY_COLUMNS: &str = "id, agent, feature, summary, branch, metadata, timestamp";

/// Durable store of [`KnowledgeEntry`] records.
///
/// Owns a single connection for its whole lifetime. Open it once at startup,
/// share it behind an `Arc`, and call [`close`](Self::close) on shutdown.
pub struct KnowledgeStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl KnowledgeStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Missing parent directories are created. The schema is created if
    /// absent; an existing file written by a different schema version is
    /// rejected.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path).map_err(sql("open"))?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(sql("open"))?;
        migrate(&conn)?;

        debug!(path = %path.display(), "knowledge store opened");
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the underlying file handle.
    pub fn close(self) -> Result<(), StoreError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| StoreError::LockPoisoned { operation: "close" })?;
        conn.close().map_err(|(_, source)| StoreError::Sqlite {
            operation: "close",
            source,
        })?;
        debug!(path = %self.path.display(), "knowledge store closed");
        Ok(())
    }

    /// Persist a new entry and return it exactly as stored.
    pub fn create(&self, new: NewEntry) -> Result<KnowledgeEntry, StoreError> {
        let entry = KnowledgeEntry {
            id: Uuid::new_v4().simple().to_string(),
            agent: new.agent,
            feature: new.feature,
            summary: new.summary,
            branch: new.branch,
            metadata: normalize_metadata(new.metadata),
            timestamp: now(),
        };
        let metadata = encode_metadata(entry.metadata.as_ref(), "create")?;

        let conn = self.lock("create")?;
        conn.execute(
            "INSERT INTO knowledge (id, agent, feature, summary, branch, metadata, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.agent,
                entry.feature,
                entry.summary,
                entry.branch,
                metadata,
                encode_timestamp(&entry.timestamp),
            ],
        )
        .map_err(sql("create"))?;

        debug!(id = %entry.id, feature = %entry.feature, agent = %entry.agent, "entry created");
        Ok(entry)
    }

    /// Entries matching `filter`, newest first, sliced by `page`.
    pub fn list(&self, filter: &EntryFilter, page: Page) -> Result<Vec<KnowledgeEntry>, StoreError> {
        let conn = self.lock("list")?;
        select_page(&conn, filter, page, "list")
    }

    /// Number of entries matching `filter`.
    pub fn count(&self, filter: &EntryFilter) -> Result<usize, StoreError> {
        let conn = self.lock("count")?;
        count_matching(&conn, filter, "count")
    }

    /// Total matches for `filter` together with one page of them.
    ///
    /// Both reads share one transaction, so the total always describes the
    /// same snapshot as the page even while other processes write.
    pub fn page(
        &self,
        filter: &EntryFilter,
        page: Page,
    ) -> Result<(usize, Vec<KnowledgeEntry>), StoreError> {
        const OP: &str = "page";

        let mut conn = self.lock(OP)?;
        let tx = conn.transaction().map_err(sql(OP))?;
        let total = count_matching(&tx, filter, OP)?;
        let entries = select_page(&tx, filter, page, OP)?;
        tx.commit().map_err(sql(OP))?;
        Ok((total, entries))
    }

    pub fn get(&self, id: &str) -> Result<Option<KnowledgeEntry>, StoreError> {
        let conn = self.lock("get")?;
        select_by_id(&conn, id, "get")
    }

    /// Replace the summary and, when `metadata` is `Some`, the metadata.
    ///
    /// An empty metadata map clears the stored metadata. The timestamp is
    /// refreshed; id, agent, feature and branch are never altered. Returns
    /// `Ok(None)` when no entry has this id.
    pub fn update(
        &self,
        id: &str,
        summary: &str,
        metadata: Option<Metadata>,
    ) -> Result<Option<KnowledgeEntry>, StoreError> {
        let mut conn = self.lock("update")?;
        let tx = conn.transaction().map_err(sql("update"))?;

        let Some(mut entry) = select_by_id(&tx, id, "update")? else {
            return Ok(None);
        };

        entry.summary = summary.to_string();
        if let Some(metadata) = metadata {
            entry.metadata = normalize_metadata(Some(metadata));
        }
        entry.timestamp = now();

        tx.execute(
            "UPDATE knowledge SET summary = ?1, metadata = ?2, timestamp = ?3 WHERE id = ?4",
            params![
                entry.summary,
                encode_metadata(entry.metadata.as_ref(), "update")?,
                encode_timestamp(&entry.timestamp),
                entry.id,
            ],
        )
        .map_err(sql("update"))?;
        tx.commit().map_err(sql("update"))?;

        debug!(id = %entry.id, "entry updated");
        Ok(Some(entry))
    }

    /// Remove one entry. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.lock("delete")?;
        let removed = conn
            .execute("DELETE FROM knowledge WHERE id = ?1", params![id])
            .map_err(sql("delete"))?;
        Ok(removed > 0)
    }

    /// Remove every entry filed under `feature`. Returns how many were removed.
    pub fn delete_by_feature(&self, feature: &str) -> Result<usize, StoreError> {
        let conn = self.lock("delete_by_feature")?;
        let removed = conn
            .execute("DELETE FROM knowledge WHERE feature = ?1", params![feature])
            .map_err(sql("delete_by_feature"))?;
        debug!(feature, removed, "feature entries deleted");
        Ok(removed)
    }

    /// Remove every entry. Returns how many were removed.
    pub fn delete_all(&self) -> Result<usize, StoreError> {
        let conn = self.lock("delete_all")?;
        let removed = conn
            .execute("DELETE FROM knowledge", [])
            .map_err(sql("delete_all"))?;
        debug!(removed, "all entries deleted");
        Ok(removed)
    }

    /// Per-feature counts, latest timestamp and contributing agents.
    pub fn feature_summaries(&self, order: FeatureOrder) -> Result<Vec<FeatureSummary>, StoreError> {
        const OP: &str = "feature_summaries";

        let mut conn = self.lock(OP)?;
        let tx = conn.transaction().map_err(sql(OP))?;

        let mut agents: BTreeMap<String, Vec<String>> = BTreeMap::new();
        {
            let mut stmt = tx
                .prepare("SELECT DISTINCT feature, agent FROM knowledge ORDER BY feature, agent")
                .map_err(sql(OP))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(sql(OP))?;
            for row in rows {
                let (feature, agent) = row.map_err(sql(OP))?;
                agents.entry(feature).or_default().push(agent);
            }
        }

        let mut summaries = Vec::new();
        {
            let mut stmt = tx
                .prepare(
                    "SELECT feature, COUNT(*), MAX(timestamp) FROM knowledge
                     GROUP BY feature ORDER BY feature",
                )
                .map_err(sql(OP))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(sql(OP))?;
            for row in rows {
                let (feature, count, latest) = row.map_err(sql(OP))?;
                let latest_timestamp = decode_timestamp(&latest).map_err(|detail| {
                    StoreError::Corrupt {
                        operation: OP,
                        id: format!("feature:{feature}"),
                        detail,
                    }
                })?;
                let contributing_agents = agents.remove(&feature).unwrap_or_default();
                summaries.push(FeatureSummary {
                    feature,
                    count: to_usize(count),
                    latest_timestamp,
                    contributing_agents,
                });
            }
        }
        tx.commit().map_err(sql(OP))?;

        if order == FeatureOrder::ByRecency {
            summaries.sort_by(|a, b| {
                b.latest_timestamp
                    .cmp(&a.latest_timestamp)
                    .then_with(|| a.feature.cmp(&b.feature))
            });
        }
        Ok(summaries)
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.lock("stats")?;
        conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT feature), COUNT(DISTINCT agent) FROM knowledge",
            [],
            |row| {
                Ok(StoreStats {
                    total_entries: to_usize(row.get(0)?),
                    total_features: to_usize(row.get(1)?),
                    total_agents: to_usize(row.get(2)?),
                })
            },
        )
        .map_err(sql("stats"))
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::LockPoisoned { operation })
    }
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS knowledge (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            agent TEXT NOT NULL,
            feature TEXT NOT NULL,
            summary TEXT NOT NULL,
            branch TEXT,
            metadata TEXT,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_knowledge_feature ON knowledge(feature);
        CREATE INDEX IF NOT EXISTS idx_knowledge_agent ON knowledge(agent);
        CREATE INDEX IF NOT EXISTS idx_knowledge_timestamp ON knowledge(timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_knowledge_feature_timestamp
            ON knowledge(feature, timestamp DESC);
        "#,
    )
    .map_err(sql("open"))?;

    conn.execute(
        "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION],
    )
    .map_err(sql("open"))?;

    let found: String = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .map_err(sql("open"))?;
    if found != SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            expected: SCHEMA_VERSION.to_string(),
            found,
        });
    }
    Ok(())
}

fn select_page(
    conn: &Connection,
    filter: &EntryFilter,
    page: Page,
    operation: &'static str,
) -> Result<Vec<KnowledgeEntry>, StoreError> {
    let (clause, mut values) = where_clause(filter);
    let limit = page.limit.map_or(-1, clamp_i64);
    values.push(SqlValue::Integer(limit));
    values.push(SqlValue::Integer(clamp_i64(page.offset)));

    let query = format!(
        "SELECT {ENTRY_COLUMNS} FROM knowledge{clause}
         ORDER BY timestamp DESC, seq DESC
         LIMIT ? OFFSET ?"
    );

    let mut stmt = conn.prepare(&query).map_err(sql(operation))?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), RawRow::from_row)
        .map_err(sql(operation))?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row.map_err(sql(operation))?.into_entry(operation)?);
    }
    Ok(entries)
}

fn count_matching(
    conn: &Connection,
    filter: &EntryFilter,
    operation: &'static str,
) -> Result<usize, StoreError> {
    let (clause, values) = where_clause(filter);
    let query = format!("SELECT COUNT(*) FROM knowledge{clause}");
    let count: i64 = conn
        .query_row(&query, params_from_iter(values.iter()), |row| row.get(0))
        .map_err(sql(operation))?;
    Ok(to_usize(count))
}

fn select_by_id(
    conn: &Connection,
    id: &str,
    operation: &'static str,
) -> Result<Option<KnowledgeEntry>, StoreError> {
    let query = format!("SELECT {ENTRY_COLUMNS} FROM knowledge WHERE id = ?1");
    conn.query_row(&query, params![id], RawRow::from_row)
        .optional()
        .map_err(sql(operation))?
        .map(|raw| raw.into_entry(operation))
        .transpose()
}

fn where_clause(filter: &EntryFilter) -> (String, Vec<SqlValue>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(feature) = &filter.feature {
        conditions.push("feature = ?");
        values.push(SqlValue::Text(feature.clone()));
    }
    if let Some(agent) = &filter.agent {
        conditions.push("agent = ?");
        values.push(SqlValue::Text(agent.clone()));
    }
    if let Some(branch) = &filter.branch {
        conditions.push("branch = ?");
        values.push(SqlValue::Text(branch.clone()));
    }
    if let Some(since) = &filter.since {
        conditions.push("timestamp > ?");
        values.push(SqlValue::Text(encode_timestamp(since)));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

/// Columns as they sit on disk, before timestamp and metadata are decoded.
struct RawRow {
    id: String,
    agent: String,
    feature: String,
    summary: String,
    branch: Option<String>,
    metadata: Option<String>,
    timestamp: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            agent: row.get(1)?,
            feature: row.get(2)?,
            summary: row.get(3)?,
            branch: row.get(4)?,
            metadata: row.get(5)?,
            timestamp: row.get(6)?,
        })
    }

    fn into_entry(self, operation: &'static str) -> Result<KnowledgeEntry, StoreError> {
        let timestamp = decode_timestamp(&self.timestamp).map_err(|detail| StoreError::Corrupt {
            operation,
            id: self.id.clone(),
            detail,
        })?;

        let metadata = match self.metadata.as_deref() {
            None => None,
            Some(raw) => Some(serde_json::from_str::<Metadata>(raw).map_err(|e| {
                StoreError::Corrupt {
                    operation,
                    id: self.id.clone(),
                    detail: format!("metadata is not a JSON object: {e}"),
                }
            })?),
        };

        Ok(KnowledgeEntry {
            id: self.id,
            agent: self.agent,
            feature: self.feature,
            summary: self.summary,
            branch: self.branch,
            metadata,
            timestamp,
        })
    }
}

/// Current time at the precision the database keeps.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so that text order equals chronological order.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
}

fn normalize_metadata(metadata: Option<Metadata>) -> Option<Metadata> {
    metadata.filter(|m| !m.is_empty())
}

fn encode_metadata(
    metadata: Option<&Metadata>,
    operation: &'static str,
) -> Result<Option<String>, StoreError> {
    metadata
        .map(serde_json::to_string)
        .transpose()
        .map_err(|source| StoreError::Metadata { operation, source })
}

fn clamp_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
