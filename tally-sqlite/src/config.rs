//! SQLite configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SqliteError, SqliteResult};

/// SQLite database configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Database location.
    pub path: DatabasePath,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
    /// How long a statement waits on a locked database.
    pub busy_timeout_ms: Option<u32>,
    /// Synchronous mode.
    pub synchronous: SynchronousMode,
    /// Journal mode. Ignored for in-memory databases.
    pub journal_mode: JournalMode,
}

/// Database location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// In-memory database, private to one engine.
    #[default]
    Memory,
    /// File-based database.
    File(PathBuf),
}

impl DatabasePath {
    /// Check if this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// SQLite synchronous mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynchronousMode {
    /// No syncs.
    Off,
    /// Sync at critical moments.
    #[default]
    Normal,
    /// Sync on every transaction.
    Full,
}

impl SynchronousMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "normal" => Some(Self::Normal),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JournalMode {
    /// Delete the rollback journal after each transaction.
    Delete,
    /// Write-ahead logging.
    #[default]
    Wal,
}

impl JournalMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Wal => "WAL",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "delete" => Some(Self::Delete),
            "wal" => Some(Self::Wal),
            _ => None,
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout_ms: Some(5000),
            synchronous: SynchronousMode::Normal,
            journal_mode: JournalMode::Wal,
        }
    }
}

impl SqliteConfig {
    /// Configuration for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Configuration for a file-based database.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Parse a SQLite URL.
    ///
    /// Supported formats:
    /// - `sqlite::memory:` or `:memory:`
    /// - `sqlite://path/to/db.sqlite`
    /// - `file:path/to/db.sqlite`
    ///
    /// Query parameters `foreign_keys`, `busy_timeout`, `synchronous` and
    /// `journal_mode` override the defaults. Unknown parameters are ignored;
    /// known parameters with unparsable values are rejected.
    pub fn from_url(url: impl AsRef<str>) -> SqliteResult<Self> {
        let url = url.as_ref().trim();
        if url.is_empty() {
            return Err(SqliteError::config("database url is empty"));
        }

        let (location, query) = match url.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (url, None),
        };

        let path = location
            .strip_prefix("sqlite://")
            .or_else(|| location.strip_prefix("sqlite:"))
            .or_else(|| location.strip_prefix("file:"))
            .unwrap_or(location);

        let mut config = match path {
            ":memory:" => Self::memory(),
            "" => return Err(SqliteError::config("database path is required")),
            path => Self::file(path),
        };

        for pair in query.into_iter().flat_map(|query| query.split('&')) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "mode" if value == "memory" => config.path = DatabasePath::Memory,
                "foreign_keys" => config.foreign_keys = matches!(value, "true" | "1" | "on"),
                "busy_timeout" => {
                    let ms = value
                        .parse()
                        .map_err(|_| SqliteError::config(format!("invalid busy_timeout: {}", value)))?;
                    config.busy_timeout_ms = Some(ms);
                }
                "synchronous" => {
                    config.synchronous = SynchronousMode::parse(value)
                        .ok_or_else(|| SqliteError::config(format!("invalid synchronous mode: {}", value)))?;
                }
                "journal_mode" => {
                    config.journal_mode = JournalMode::parse(value)
                        .ok_or_else(|| SqliteError::config(format!("invalid journal mode: {}", value)))?;
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// The busy timeout as a duration.
    pub fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Enable or disable foreign keys.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn busy_timeout_ms(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    /// Set the synchronous mode.
    pub fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.synchronous = mode;
        self
    }

    /// Set the journal mode.
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_urls() {
        for url in ["sqlite::memory:", ":memory:", "sqlite://:memory:"] {
            assert!(SqliteConfig::from_url(url).unwrap().path.is_memory(), "{url}");
        }
        assert!(SqliteConfig::from_url("sqlite://app.db?mode=memory").unwrap().path.is_memory());
    }

    #[test]
    fn test_file_urls() {
        let expected = DatabasePath::File(PathBuf::from("data/app.db"));
        assert_eq!(SqliteConfig::from_url("sqlite://data/app.db").unwrap().path, expected);
        assert_eq!(SqliteConfig::from_url("file:data/app.db").unwrap().path, expected);
        assert_eq!(SqliteConfig::from_url("data/app.db").unwrap().path, expected);
    }

    #[test]
    fn test_url_parameters() {
        let config =
            SqliteConfig::from_url("sqlite://app.db?foreign_keys=false&busy_timeout=250&synchronous=full&journal_mode=delete")
                .unwrap();

        assert!(!config.foreign_keys);
        assert_eq!(config.busy_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.synchronous, SynchronousMode::Full);
        assert_eq!(config.journal_mode, JournalMode::Delete);
    }

    #[test]
    fn test_invalid_urls() {
        assert!(SqliteConfig::from_url("").is_err());
        assert!(SqliteConfig::from_url("sqlite://").is_err());
        assert!(SqliteConfig::from_url("sqlite://app.db?busy_timeout=soon").is_err());
        assert!(SqliteConfig::from_url("sqlite://app.db?journal_mode=rollback").is_err());
    }

    #[test]
    fn test_builders() {
        let config = SqliteConfig::memory()
            .foreign_keys(false)
            .busy_timeout_ms(10)
            .synchronous(SynchronousMode::Off)
            .journal_mode(JournalMode::Delete);

        assert_eq!(config.synchronous.as_pragma(), "OFF");
        assert_eq!(config.journal_mode.as_pragma(), "DELETE");
        assert_eq!(config.busy_timeout_ms, Some(10));
    }
}
