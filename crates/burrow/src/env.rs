//! Storage environment
//!
//! Thin ownership layer over the embedded engine's environment. Databases
//! are opened by name inside one environment directory; a storage is
//! durable across process restarts provided the same directory, database
//! names, and marshaller are reused.

use std::sync::Arc;

use lmdb::{Database, DatabaseFlags, Environment, EnvironmentFlags};
use tracing::debug;

use burrow_core::{EnvConfig, Result, StoreError, SyncMode};

/// An open storage environment shared by every storage built on it.
pub struct StoreEnv {
    env: Environment,
    cfg: EnvConfig,
}

impl StoreEnv {
    /// Open (creating if needed) the environment described by `cfg`.
    pub fn open(cfg: EnvConfig) -> Result<Arc<Self>> {
        std::fs::create_dir_all(&cfg.path)?;

        let mut builder = Environment::new();
        builder.set_max_dbs(cfg.max_dbs);
        builder.set_map_size(cfg.map_size);
        builder.set_max_readers(cfg.max_readers);

        let mut flags = EnvironmentFlags::empty();
        match cfg.sync_mode {
            SyncMode::Full => {}
            SyncMode::NoMetaSync => {
                flags.insert(EnvironmentFlags::NO_META_SYNC);
            }
            SyncMode::NoSync => {
                flags.insert(EnvironmentFlags::NO_SYNC);
            }
        }
        builder.set_flags(flags);

        let env = builder
            .open(&cfg.path)
            .map_err(|e| StoreError::Engine(e.to_string()))?;

        debug!(path = %cfg.path.display(), "storage environment opened");

        Ok(Arc::new(Self { env, cfg }))
    }

    /// Open or create a named primary database (btree, unique keys).
    pub fn create_database(&self, name: &str) -> Result<Database> {
        self.env
            .create_db(Some(name), DatabaseFlags::empty())
            .map_err(|e| StoreError::Engine(e.to_string()))
    }

    /// Open or create a named secondary database (btree, sorted duplicates).
    pub fn create_multimap_database(&self, name: &str) -> Result<Database> {
        self.env
            .create_db(Some(name), DatabaseFlags::DUP_SORT)
            .map_err(|e| StoreError::Engine(e.to_string()))
    }

    pub fn config(&self) -> &EnvConfig {
        &self.cfg
    }

    /// The underlying engine environment, for transaction begin and other
    /// engine-level calls.
    pub fn raw(&self) -> &Environment {
        &self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_directory_and_databases() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        let env = StoreEnv::open(EnvConfig::new(&dir).with_map_size(16 * 1024 * 1024)).unwrap();

        assert!(dir.is_dir());
        env.create_database("master").unwrap();
        env.create_multimap_database("secondary").unwrap();
    }
}
