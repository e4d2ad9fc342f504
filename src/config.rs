use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for tool operations (30 seconds).
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Default page size for `agent_knowledge_retrieve`.
pub const DEFAULT_LIMIT: usize = 10;

/// Hard upper bound on any page size.
pub const MAX_LIMIT: usize = 100;

/// Default character budget for a single tool response.
pub const DEFAULT_CHARACTER_LIMIT: usize = 25_000;

/// Database location relative to `$HOME` when `KNOWLEDGE_DB_PATH` is unset.
const DEFAULT_DB_RELATIVE: &str = ".agent_knowledge/knowledge.db";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("KNOWLEDGE_DB_PATH is not set and HOME is unavailable to derive a default")]
    NoDatabasePath,
    #[error("{name} must be a positive integer, got {value:?}")]
    NotPositive { name: &'static str, value: String },
    #[error("{name} must be at most {max}, got {value}")]
    TooLarge { name: &'static str, value: usize, max: usize },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub tool_timeout: Duration,
    pub default_limit: usize,
    pub character_limit: usize,
}

impl ServerConfig {
    /// Load configuration from environment.
    ///
    /// - `KNOWLEDGE_DB_PATH` (optional, default `$HOME/.agent_knowledge/knowledge.db`)
    /// - `KNOWLEDGE_TOOL_TIMEOUT_SECS` (optional, default 30): max seconds per tool call
    /// - `KNOWLEDGE_DEFAULT_LIMIT` (optional, default 10, at most 100)
    /// - `KNOWLEDGE_CHARACTER_LIMIT` (optional, default 25000): response size budget
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = match lookup("KNOWLEDGE_DB_PATH").filter(|v| !v.trim().is_empty()) {
            Some(path) => expand_home(&path, lookup("HOME"))?,
            None => lookup("HOME")
                .filter(|home| !home.is_empty())
                .map(|home| PathBuf::from(home).join(DEFAULT_DB_RELATIVE))
                .ok_or(ConfigError::NoDatabasePath)?,
        };

        let tool_timeout_secs = positive(&lookup, "KNOWLEDGE_TOOL_TIMEOUT_SECS")?
            .map_or(DEFAULT_TOOL_TIMEOUT_SECS, |v| v as u64);

        let default_limit = positive(&lookup, "KNOWLEDGE_DEFAULT_LIMIT")?.unwrap_or(DEFAULT_LIMIT);
        if default_limit > MAX_LIMIT {
            return Err(ConfigError::TooLarge {
                name: "KNOWLEDGE_DEFAULT_LIMIT",
                value: default_limit,
                max: MAX_LIMIT,
            });
        }

        let character_limit =
            positive(&lookup, "KNOWLEDGE_CHARACTER_LIMIT")?.unwrap_or(DEFAULT_CHARACTER_LIMIT);

        Ok(Self {
            db_path,
            tool_timeout: Duration::from_secs(tool_timeout_secs),
            default_limit,
            character_limit,
        })
    }

    /// Defaults suitable for tests: the database lives at `db_path`.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            default_limit: DEFAULT_LIMIT,
            character_limit: DEFAULT_CHARACTER_LIMIT,
        }
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<usize>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(ConfigError::NotPositive { name, value }),
        },
    }
}

fn expand_home(path: &str, home: Option<String>) -> Result<PathBuf, ConfigError> {
    match path.strip_prefix("~/") {
        Some(rest) => home
            .filter(|h| !h.is_empty())
            .map(|h| PathBuf::from(h).join(rest))
            .ok_or(ConfigError::NoDatabasePath),
        None => Ok(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_derive_from_home() {
        let config = ServerConfig::from_lookup(lookup_from(&[("HOME", "/home/agent")])).unwrap();
        assert_eq!(
            config.db_path,
            PathBuf::from("/home/agent/.agent_knowledge/knowledge.db")
        );
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
        assert_eq!(config.default_limit, DEFAULT_LIMIT);
        assert_eq!(config.character_limit, DEFAULT_CHARACTER_LIMIT);
    }

    #[test]
    fn explicit_path_expands_tilde() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HOME", "/home/agent"),
            ("KNOWLEDGE_DB_PATH", "~/kb/store.db"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/home/agent/kb/store.db"));
    }

    #[test]
    fn missing_home_without_path_is_an_error() {
        let err = ServerConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::NoDatabasePath);
    }

    #[test]
    fn rejects_non_numeric_and_oversized_values() {
        let err = ServerConfig::from_lookup(lookup_from(&[
            ("KNOWLEDGE_DB_PATH", "/tmp/k.db"),
            ("KNOWLEDGE_TOOL_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { name: "KNOWLEDGE_TOOL_TIMEOUT_SECS", .. }));

        let err = ServerConfig::from_lookup(lookup_from(&[
            ("KNOWLEDGE_DB_PATH", "/tmp/k.db"),
            ("KNOWLEDGE_DEFAULT_LIMIT", "500"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge { value: 500, .. }));
    }
}
