//! Scoped transaction management
//!
//! Every storage mutation runs inside one write transaction obtained from
//! the environment. The manager guarantees release on all exit paths:
//! commit or abort exactly once, and abort on drop when still active.
//! Begin blocks until the environment's writer slot is free (the engine's
//! wait-on-conflict policy).

use lmdb::{Environment, RwTransaction, Transaction};

use burrow_core::{Result, StoreError};

pub struct TransactionManager<'env> {
    txn: Option<RwTransaction<'env>>,
}

impl<'env> TransactionManager<'env> {
    /// Begin a synchronous write transaction on `env`.
    pub fn begin(env: &'env Environment) -> Result<Self> {
        let txn = env
            .begin_rw_txn()
            .map_err(|e| StoreError::Txn(e.to_string()))?;
        Ok(Self { txn: Some(txn) })
    }

    /// The open transaction. Fails after `commit`/`abort`.
    pub fn txn_mut(&mut self) -> Result<&mut RwTransaction<'env>> {
        self.txn
            .as_mut()
            .ok_or_else(|| StoreError::Txn("transaction already completed".into()))
    }

    /// Commit the transaction. No-op after the first completion.
    pub fn commit(&mut self) -> Result<()> {
        if let Some(txn) = self.txn.take() {
            txn.commit().map_err(|e| StoreError::Txn(e.to_string()))?;
        }
        Ok(())
    }

    /// Abort the transaction. No-op after the first completion.
    pub fn abort(&mut self) {
        if let Some(txn) = self.txn.take() {
            txn.abort();
        }
    }
}

impl Drop for TransactionManager<'_> {
    fn drop(&mut self) {
        if let Some(txn) = self.txn.take() {
            txn.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StoreEnv;
    use burrow_core::EnvConfig;
    use lmdb::WriteFlags;
    use tempfile::TempDir;

    fn test_env() -> (std::sync::Arc<StoreEnv>, TempDir) {
        let temp = TempDir::new().unwrap();
        let env =
            StoreEnv::open(EnvConfig::new(temp.path()).with_map_size(16 * 1024 * 1024)).unwrap();
        (env, temp)
    }

    #[test]
    fn commit_persists() {
        let (env, _temp) = test_env();
        let db = env.create_database("t").unwrap();

        let mut mgr = TransactionManager::begin(env.raw()).unwrap();
        mgr.txn_mut()
            .unwrap()
            .put(db, b"k", b"v", WriteFlags::empty())
            .unwrap();
        mgr.commit().unwrap();

        let ro = env.raw().begin_ro_txn().unwrap();
        assert_eq!(ro.get(db, b"k").unwrap(), b"v");
    }

    #[test]
    fn drop_aborts() {
        let (env, _temp) = test_env();
        let db = env.create_database("t").unwrap();

        {
            let mut mgr = TransactionManager::begin(env.raw()).unwrap();
            mgr.txn_mut()
                .unwrap()
                .put(db, b"k", b"v", WriteFlags::empty())
                .unwrap();
            // dropped without commit
        }

        let ro = env.raw().begin_ro_txn().unwrap();
        assert!(matches!(ro.get(db, b"k"), Err(lmdb::Error::NotFound)));
    }

    #[test]
    fn commit_is_idempotent() {
        let (env, _temp) = test_env();
        let mut mgr = TransactionManager::begin(env.raw()).unwrap();
        mgr.commit().unwrap();
        mgr.commit().unwrap();
        assert!(mgr.txn_mut().is_err());
    }
}
