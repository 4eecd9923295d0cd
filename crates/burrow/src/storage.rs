//! Typed storage façade
//!
//! A [`Storage`] bundles one primary database, marshalling through the
//! process-wide registry, an owned removal cascade, and optional change
//! notification into a single collection of domain records. Every mutation
//! runs in its own write transaction; change events are emitted only after
//! that transaction commits, so an abort leaves both the persistent state
//! and the event stream untouched.
//!
//! # Example
//!
//! ```ignore
//! let env = StoreEnv::open(EnvConfig::new("./data"))?;
//! let db = env.create_database("contacts")?;
//! let contacts = Arc::new(Storage::open::<ContactMarshaller>(
//!     env.clone(),
//!     db,
//!     Deleter::leaf(),
//! )?);
//!
//! contacts.add(&Contact { id: "id1".into(), name: "n1".into() })?;
//! let c = contacts.get(&"id1".to_string())?;
//! ```

use std::sync::Arc;

use lmdb::Database;
use tracing::trace;

use burrow_core::{registry, Marshal, MarshalFns, Record, Result, StoreError};

use crate::deleter::{DeferredEvents, Deleter};
use crate::env::StoreEnv;
use crate::table::{SecondaryIndex, Table};
use crate::txn::TransactionManager;
use crate::watch::{ChangeWatcher, EventKind};

/// The part of a storage an edit wrapper needs: lookup, strict overwrite,
/// and removal by key.
pub trait RecordStore<E: Record>: Send + Sync {
    fn get(&self, id: &E::Key) -> Result<E>;
    fn strict_update(&self, e: &E) -> Result<bool>;
    fn remove(&self, id: &E::Key) -> Result<bool>;
}

pub struct Storage<E: Record> {
    env: Arc<StoreEnv>,
    table: Table<E>,
    deleter: Deleter<E>,
    watcher: Option<Arc<ChangeWatcher<E>>>,
}

impl<E: Record> Storage<E> {
    /// Open a storage over `primary`, installing `M`'s marshaller trio for
    /// `E` in the process-wide registry. The storage marshals through the
    /// trio the registry holds for `E`.
    pub fn open<M: Marshal<E>>(
        env: Arc<StoreEnv>,
        primary: Database,
        deleter: Deleter<E>,
    ) -> Result<Self> {
        registry::register(MarshalFns::of::<M>())?;
        let fns = registry::lookup::<E>()?;
        Ok(Self {
            env,
            table: Table::new(fns, primary, None),
            deleter,
            watcher: None,
        })
    }

    pub(crate) fn open_indexed<M: Marshal<E>>(
        env: Arc<StoreEnv>,
        primary: Database,
        secondary: SecondaryIndex,
        deleter: Deleter<E>,
    ) -> Result<Self> {
        registry::register(MarshalFns::of::<M>())?;
        let fns = registry::lookup::<E>()?;
        Ok(Self {
            env,
            table: Table::new(fns, primary, Some(secondary)),
            deleter,
            watcher: None,
        })
    }

    /// Attach a change watcher. Without one the storage mutates silently.
    pub fn with_watcher(mut self, watcher: Arc<ChangeWatcher<E>>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Insert a record. Returns false (and changes nothing) when the key is
    /// already present.
    pub fn add(&self, e: &E) -> Result<bool> {
        let mut manager = TransactionManager::begin(self.env.raw())?;
        if !self.table.insert(manager.txn_mut()?, e)? {
            return Ok(false);
        }
        manager.commit()?;
        self.emit(EventKind::Added, e);
        Ok(true)
    }

    /// Remove the record with key `id` and cascade through the deleter.
    /// Returns false when the key is absent.
    pub fn remove(&self, id: &E::Key) -> Result<bool> {
        let mut manager = TransactionManager::begin(self.env.raw())?;
        let Some(removed) = self.table.delete(manager.txn_mut()?, id)? else {
            return Ok(false);
        };

        let mut deferred = DeferredEvents::new();
        self.deleter
            .notify(manager.txn_mut()?, std::slice::from_ref(&removed), &mut deferred)?;
        manager.commit()?;

        trace!(cascaded = deferred.len(), "record removed");
        self.emit(EventKind::Deleted, &removed);
        deferred.fire();
        Ok(true)
    }

    /// Overwrite the record with the same key. Returns false (and changes
    /// nothing) when no record with that key exists.
    pub fn strict_update(&self, e: &E) -> Result<bool> {
        let mut manager = TransactionManager::begin(self.env.raw())?;
        if !self.table.contains(manager.txn_mut()?, &e.id())? {
            return Ok(false);
        }
        self.table.upsert(manager.txn_mut()?, e)?;
        manager.commit()?;
        self.emit(EventKind::Updated, e);
        Ok(true)
    }

    /// Insert or overwrite unconditionally.
    pub fn update(&self, e: &E) -> Result<()> {
        let mut manager = TransactionManager::begin(self.env.raw())?;
        self.table.upsert(manager.txn_mut()?, e)?;
        manager.commit()?;
        self.emit(EventKind::Updated, e);
        Ok(())
    }

    /// The record with key `id`. The missing-key case is the one lookup
    /// reported through the error channel.
    pub fn get(&self, id: &E::Key) -> Result<E> {
        let txn = self.begin_read()?;
        self.table
            .get(&txn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("no record for key {id:?}")))
    }

    pub fn has(&self, id: &E::Key) -> Result<bool> {
        let txn = self.begin_read()?;
        self.table.contains(&txn, id)
    }

    /// Every record, in primary-key order.
    pub fn all(&self) -> Result<Vec<E>> {
        let txn = self.begin_read()?;
        self.table.scan(&txn)
    }

    pub fn size(&self) -> Result<i32> {
        let txn = self.begin_read()?;
        Ok(self.table.count(&txn)? as i32)
    }

    /// The records satisfying `predicate`, in primary-key order.
    pub fn filter(&self, predicate: impl Fn(&E) -> bool) -> Result<Vec<E>> {
        let txn = self.begin_read()?;
        let mut records = self.table.scan(&txn)?;
        records.retain(|e| predicate(e));
        Ok(records)
    }

    /// The first record satisfying `predicate`, or `NotFound`.
    pub fn find(&self, predicate: impl Fn(&E) -> bool) -> Result<E> {
        let txn = self.begin_read()?;
        self.table
            .scan(&txn)?
            .into_iter()
            .find(|e| predicate(e))
            .ok_or_else(|| StoreError::NotFound("no record matches the predicate".into()))
    }

    fn begin_read(&self) -> Result<lmdb::RoTransaction<'_>> {
        self.env
            .raw()
            .begin_ro_txn()
            .map_err(|e| StoreError::Txn(e.to_string()))
    }

    pub(crate) fn emit(&self, kind: EventKind, e: &E) {
        if let Some(watcher) = &self.watcher {
            watcher.enqueue(kind, e.clone());
        }
    }

    pub(crate) fn table(&self) -> &Table<E> {
        &self.table
    }

    pub(crate) fn deleter(&self) -> &Deleter<E> {
        &self.deleter
    }

    pub(crate) fn watcher(&self) -> Option<&Arc<ChangeWatcher<E>>> {
        self.watcher.as_ref()
    }
}

impl<E: Record> RecordStore<E> for Storage<E> {
    fn get(&self, id: &E::Key) -> Result<E> {
        Storage::get(self, id)
    }

    fn strict_update(&self, e: &E) -> Result<bool> {
        Storage::strict_update(self, e)
    }

    fn remove(&self, id: &E::Key) -> Result<bool> {
        Storage::remove(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_env, TestElement, TestMarshaller};
    use crate::wrapper::WrapperExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn el(id: &str, name: &str) -> TestElement {
        TestElement {
            id: id.into(),
            name: name.into(),
        }
    }

    fn open_storage() -> (Arc<Storage<TestElement>>, tempfile::TempDir) {
        let (env, temp) = test_env();
        let db = env.create_database("master").unwrap();
        let storage =
            Arc::new(Storage::open::<TestMarshaller>(env, db, Deleter::leaf()).unwrap());
        (storage, temp)
    }

    #[test]
    fn insert_and_fetch() {
        let (store, _temp) = open_storage();

        assert!(store.add(&el("id1", "n1")).unwrap());
        assert!(store.add(&el("id2", "n2")).unwrap());

        assert_eq!(store.get(&"id1".to_string()).unwrap(), el("id1", "n1"));
    }

    #[test]
    fn add_duplicate_key_fails_softly() {
        let (store, _temp) = open_storage();

        assert!(store.add(&el("id1", "n1")).unwrap());
        assert!(!store.add(&el("id1", "other")).unwrap());
        // the losing insert changed nothing
        assert_eq!(store.get(&"id1".to_string()).unwrap(), el("id1", "n1"));
        assert_eq!(store.size().unwrap(), 1);
    }

    #[test]
    fn remove_absent_key() {
        let (store, _temp) = open_storage();

        store.add(&el("id1", "n1")).unwrap();
        store.add(&el("id2", "n2")).unwrap();

        assert!(store.remove(&"id2".to_string()).unwrap());
        assert!(!store.remove(&"id2".to_string()).unwrap());

        let err = store.get(&"id2".to_string()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.get(&"id1".to_string()).unwrap(), el("id1", "n1"));
    }

    #[test]
    fn update_is_upsert_strict_update_is_not() {
        let (store, _temp) = open_storage();

        store.add(&el("id1", "n1")).unwrap();

        assert!(!store.strict_update(&el("id3", "n3")).unwrap());
        assert!(!store.has(&"id3".to_string()).unwrap());

        store.update(&el("id3", "n3")).unwrap();
        assert!(store.has(&"id3".to_string()).unwrap());

        assert!(store.strict_update(&el("id3", "renamed")).unwrap());
        assert_eq!(store.get(&"id3".to_string()).unwrap().name, "renamed");
    }

    #[test]
    fn all_is_key_ordered() {
        let (store, _temp) = open_storage();

        store.add(&el("b", "2")).unwrap();
        store.add(&el("a", "1")).unwrap();
        store.add(&el("c", "3")).unwrap();

        let ids: Vec<String> = store.all().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.size().unwrap(), 3);
    }

    #[test]
    fn filter_and_find() {
        let (store, _temp) = open_storage();

        store.add(&el("id1", "keep")).unwrap();
        store.add(&el("id2", "drop")).unwrap();
        store.add(&el("id3", "keep")).unwrap();

        let kept = store.filter(|e| e.name == "keep").unwrap();
        assert_eq!(kept.len(), 2);

        let found = store.find(|e| e.name == "drop").unwrap();
        assert_eq!(found.id, "id2");

        assert!(store.find(|e| e.name == "missing").unwrap_err().is_not_found());
    }

    #[test]
    fn durable_across_reopen() {
        let (env, temp) = test_env();
        {
            let db = env.create_database("master").unwrap();
            let store = Storage::open::<TestMarshaller>(env.clone(), db, Deleter::leaf()).unwrap();
            store.add(&el("id1", "n1")).unwrap();
        }
        drop(env);

        let env = crate::env::StoreEnv::open(
            burrow_core::EnvConfig::new(temp.path()).with_map_size(16 * 1024 * 1024),
        )
        .unwrap();
        let db = env.create_database("master").unwrap();
        let store = Storage::open::<TestMarshaller>(env, db, Deleter::leaf()).unwrap();
        assert_eq!(store.get(&"id1".to_string()).unwrap(), el("id1", "n1"));
    }

    #[test]
    fn successful_mutations_emit_one_event_each() {
        let (env, _temp) = test_env();
        let db = env.create_database("master").unwrap();
        let watcher = Arc::new(ChangeWatcher::new());
        let store = Storage::open::<TestMarshaller>(env, db, Deleter::leaf())
            .unwrap()
            .with_watcher(watcher.clone());

        let hits = Arc::new(AtomicUsize::new(0));
        {
            let hits = hits.clone();
            watcher.append_permanent(crate::watch::EventMask::ALL, move |kind, e: &TestElement| {
                match e.id.as_str() {
                    "id1" => assert_eq!(kind, EventKind::Added),
                    "id2" => assert_eq!(kind, EventKind::Updated),
                    other => panic!("unexpected event for {other}"),
                }
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        store.add(&el("id1", "n1")).unwrap();
        store.update(&el("id2", "n2")).unwrap();
        // failed mutations stay silent
        assert!(!store.add(&el("id1", "dup")).unwrap());
        assert!(!store.remove(&"missing".to_string()).unwrap());

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn wrapper_saves_reloads_and_removes() {
        let (store, _temp) = open_storage();
        store.add(&el("id1", "before")).unwrap();

        let mut wrapper = store.wrapper(&"id1".to_string()).unwrap();
        wrapper.name = "after".into();
        assert_eq!(store.get(&"id1".to_string()).unwrap().name, "before");

        assert!(wrapper.save().unwrap());
        assert_eq!(store.get(&"id1".to_string()).unwrap().name, "after");

        store.update(&el("id1", "elsewhere")).unwrap();
        wrapper.reload().unwrap();
        assert_eq!(wrapper.name, "elsewhere");

        assert!(wrapper.remove().unwrap());
        assert!(!store.has(&"id1".to_string()).unwrap());
    }

    #[test]
    fn wrapper_for_missing_key_fails() {
        let (store, _temp) = open_storage();
        assert!(store
            .wrapper(&"missing".to_string())
            .unwrap_err()
            .is_not_found());
    }
}
