//! Transparent edit handle over one stored record
//!
//! The wrapper pairs a storage reference with a detached copy of the
//! record. Field access goes straight to the copy; nothing persistent
//! changes until `save()` succeeds.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use burrow_core::{Record, Result};

use crate::storage::RecordStore;

/// Entry point for building wrappers from a shared storage handle.
pub trait WrapperExt<E: Record> {
    /// An edit handle over a copy of the record with key `id`. Fails with
    /// `NotFound` when no such record exists.
    fn wrapper(&self, id: &E::Key) -> Result<ElementWrapper<E>>;
}

impl<E: Record, S: RecordStore<E> + 'static> WrapperExt<E> for Arc<S> {
    fn wrapper(&self, id: &E::Key) -> Result<ElementWrapper<E>> {
        let value = self.get(id)?;
        Ok(ElementWrapper::new(self.clone(), value))
    }
}

pub struct ElementWrapper<E: Record> {
    store: Arc<dyn RecordStore<E>>,
    value: E,
}

impl<E: Record + std::fmt::Debug> std::fmt::Debug for ElementWrapper<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementWrapper")
            .field("value", &self.value)
            .finish()
    }
}

impl<E: Record> ElementWrapper<E> {
    pub(crate) fn new(store: Arc<dyn RecordStore<E>>, value: E) -> Self {
        Self { store, value }
    }

    /// Persist the (possibly mutated) copy. Fails softly when the record's
    /// key no longer exists in the storage.
    pub fn save(&self) -> Result<bool> {
        self.store.strict_update(&self.value)
    }

    /// Remove the record under the copy's current key.
    pub fn remove(&self) -> Result<bool> {
        self.store.remove(&self.value.id())
    }

    /// Replace the copy with the storage's current state of the record.
    pub fn reload(&mut self) -> Result<()> {
        self.value = self.store.get(&self.value.id())?;
        Ok(())
    }

    pub fn value(&self) -> &E {
        &self.value
    }

    pub fn into_value(self) -> E {
        self.value
    }
}

impl<E: Record> Deref for ElementWrapper<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.value
    }
}

impl<E: Record> DerefMut for ElementWrapper<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.value
    }
}
