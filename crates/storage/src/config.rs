//! Store configuration via `tagstore.toml`
//!
//! Every field has a default; an empty file opens an in-memory store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tagstore_core::{Error, Result};

use crate::statements::STATEMENTS_PER_NAMESPACE;

/// Config file name conventionally placed next to the database file.
pub const CONFIG_FILE_NAME: &str = "tagstore.toml";

/// Path value selecting a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// `SQLite` journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead log; readers do not block the writer
    #[default]
    Wal,
    /// Rollback journal deleted after each transaction
    Delete,
    /// Journal kept in memory
    Memory,
}

impl JournalMode {
    /// Returns the `SQLite` pragma value.
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
            Self::Memory => "memory",
        }
    }
}

/// `SQLite` synchronous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// fsync on every commit
    #[default]
    Full,
    /// fsync at checkpoints (durable with WAL, faster)
    Normal,
    /// Never fsync
    Off,
}

impl SyncMode {
    /// Returns the `SQLite` pragma value.
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
            Self::Off => "off",
        }
    }
}

/// Backing engine configuration.
///
/// # Example
///
/// ```toml
/// path = "/var/lib/app/store.db"
/// pool_size = 4
/// busy_timeout_ms = 5000
/// journal_mode = "wal"
/// synchronous = "normal"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Number of pooled connections. Forced to 1 for `:memory:`.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// How long a connection waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode pragma.
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// Synchronous pragma.
    #[serde(default)]
    pub synchronous: SyncMode,
    /// Compiled statements kept per connection. Must hold at least one
    /// namespace's statement set.
    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: usize,
}

fn default_path() -> PathBuf {
    PathBuf::from(MEMORY_PATH)
}

fn default_pool_size() -> usize {
    4
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_statement_cache_capacity() -> usize {
    64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: JournalMode::default(),
            synchronous: SyncMode::default(),
            statement_cache_capacity: default_statement_cache_capacity(),
        }
    }
}

impl StoreConfig {
    /// Config for a private in-memory database
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Config for a database file with default settings
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Whether this config targets an in-memory database
    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    /// Pool size after applying the in-memory restriction.
    ///
    /// Each in-memory connection is its own database, so sharing data
    /// requires a single connection.
    pub fn effective_pool_size(&self) -> usize {
        if self.is_memory() {
            1
        } else {
            self.pool_size
        }
    }

    /// Check invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero pool size or a statement cache
    /// too small for one namespace.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Config("pool_size must be at least 1".to_string()));
        }
        if self.statement_cache_capacity < STATEMENTS_PER_NAMESPACE {
            return Err(Error::Config(format!(
                "statement_cache_capacity must be at least {}",
                STATEMENTS_PER_NAMESPACE
            )));
        }
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid config.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
