//! Child storage: a storage that cleans up after an upstream parent
//!
//! A [`ChildStorage`] keeps a secondary multimap from the parent id —
//! extracted out of each child's serialized bytes — to the child's primary
//! key. That index is what lets an upstream removal find and erase every
//! dependent child inside the same transaction, and it is maintained on the
//! child storage's own mutations as well.

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use lmdb::{Database, RwTransaction};

use burrow_core::{Marshal, Record, Result, StoreKey};

use crate::deleter::{CascadeTarget, DeferredEvents, Deleter};
use crate::env::StoreEnv;
use crate::storage::{RecordStore, Storage};
use crate::table::{KeyExtractor, SecondaryIndex};
use crate::watch::ChangeWatcher;

pub struct ChildStorage<E: Record, P: Record> {
    base: Storage<E>,
    _parent: PhantomData<fn(&P)>,
}

impl<E: Record, P: Record> ChildStorage<E, P> {
    /// Open a child storage over `primary` plus the `secondary` multimap
    /// database. `extract` pulls the parent key out of a serialized child
    /// record; its output must equal the parent's `id().to_bytes()`.
    pub fn open<M: Marshal<E>>(
        env: Arc<StoreEnv>,
        primary: Database,
        secondary: Database,
        extract: KeyExtractor,
        deleter: Deleter<E>,
    ) -> Result<Self> {
        let base = Storage::open_indexed::<M>(
            env,
            primary,
            SecondaryIndex {
                db: secondary,
                extract,
            },
            deleter,
        )?;
        Ok(Self {
            base,
            _parent: PhantomData,
        })
    }

    pub fn with_watcher(mut self, watcher: Arc<ChangeWatcher<E>>) -> Self {
        self.base = self.base.with_watcher(watcher);
        self
    }
}

impl<E: Record, P: Record> Deref for ChildStorage<E, P> {
    type Target = Storage<E>;

    fn deref(&self) -> &Storage<E> {
        &self.base
    }
}

impl<E: Record, P: Record> RecordStore<E> for ChildStorage<E, P> {
    fn get(&self, id: &E::Key) -> Result<E> {
        self.base.get(id)
    }

    fn strict_update(&self, e: &E) -> Result<bool> {
        self.base.strict_update(e)
    }

    fn remove(&self, id: &E::Key) -> Result<bool> {
        self.base.remove(id)
    }
}

impl<E: Record, P: Record> CascadeTarget<P> for ChildStorage<E, P> {
    /// Remove every child keyed by each parent's id, inside the caller's
    /// open transaction. Removal events are deferred to fire after the
    /// topmost commit: this level's children first, then descendants.
    fn parent_removed(
        &self,
        txn: &mut RwTransaction<'_>,
        parents: &[P],
        deferred: &mut DeferredEvents,
    ) -> Result<()> {
        let mut removed = Vec::new();
        for parent in parents {
            let children = self
                .base
                .table()
                .take_children(txn, &parent.id().to_bytes())?;

            for child in &children {
                if let Some(watcher) = self.base.watcher() {
                    let watcher = watcher.clone();
                    let child = child.clone();
                    deferred.defer(move || watcher.element_removed(&child));
                }
            }
            removed.extend(children);
        }

        self.base.deleter().notify(txn, &removed, deferred)
    }
}
