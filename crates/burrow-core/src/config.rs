use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a storage environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Path to the environment directory
    pub path: PathBuf,

    /// Maximum map size in bytes
    /// Default: 1GB
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Maximum number of named databases in the environment
    /// Default: 16
    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,

    /// Maximum number of concurrent readers
    /// Default: 126
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,

    /// Sync mode for durability
    #[serde(default)]
    pub sync_mode: SyncMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Full durability – `fsync()` on every commit (default).
    ///
    /// Committed data survives power loss and OS crashes. Matches the
    /// synchronous, durable transaction policy of the storage layer.
    #[default]
    Full,

    /// Skips syncing the meta page on each commit.
    ///
    /// Data pages are still synced; committed data is durable against
    /// process crashes. An OS crash may lose the last transaction but
    /// leaves the environment consistent.
    NoMetaSync,

    /// Disables `fsync()` entirely – the OS page cache decides when to
    /// flush. Only for ephemeral or test workloads.
    NoSync,
}

fn default_map_size() -> usize {
    1024 * 1024 * 1024 // 1GB
}

fn default_max_dbs() -> u32 {
    16
}

fn default_max_readers() -> u32 {
    126
}

impl EnvConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            map_size: default_map_size(),
            max_dbs: default_max_dbs(),
            max_readers: default_max_readers(),
            sync_mode: SyncMode::default(),
        }
    }

    pub fn with_map_size(mut self, map_size: usize) -> Self {
        self.map_size = map_size;
        self
    }

    pub fn with_max_dbs(mut self, max_dbs: u32) -> Self {
        self.max_dbs = max_dbs;
        self
    }

    pub fn with_max_readers(mut self, max_readers: u32) -> Self {
        self.max_readers = max_readers;
        self
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }
}
