//! Typed views over the engine's databases
//!
//! A [`Table`] marshals records through the registered trio and maintains
//! the optional secondary multimap alongside the primary. The engine has no
//! built-in primary/secondary association, so every write path that touches
//! the primary keeps the secondary in step inside the same transaction:
//! one secondary entry (parent id → record key) per stored record.

use lmdb::{Cursor, Database, RwTransaction, Transaction, WriteFlags};

use burrow_core::{MarshalFns, Record, Result, StoreError, StoreKey};

/// Extracts the secondary (parent) key from a serialized record.
///
/// A plain function pointer: everything the extractor needs must travel in
/// the record bytes themselves.
pub type KeyExtractor = fn(&[u8]) -> Result<Vec<u8>>;

pub(crate) struct SecondaryIndex {
    pub(crate) db: Database,
    pub(crate) extract: KeyExtractor,
}

pub(crate) struct Table<E: Record> {
    fns: MarshalFns<E>,
    primary: Database,
    secondary: Option<SecondaryIndex>,
}

fn raw_get<T: Transaction>(txn: &T, db: Database, key: &[u8]) -> Result<Option<Vec<u8>>> {
    match txn.get(db, &key) {
        Ok(bytes) => Ok(Some(bytes.to_vec())),
        Err(lmdb::Error::NotFound) => Ok(None),
        Err(e) => Err(StoreError::Engine(e.to_string())),
    }
}

impl<E: Record> Table<E> {
    pub(crate) fn new(
        fns: MarshalFns<E>,
        primary: Database,
        secondary: Option<SecondaryIndex>,
    ) -> Self {
        Self {
            fns,
            primary,
            secondary,
        }
    }

    pub(crate) fn get<T: Transaction>(&self, txn: &T, id: &E::Key) -> Result<Option<E>> {
        Ok(raw_get(txn, self.primary, &id.to_bytes())?.map(|bytes| self.fns.from_bytes(&bytes)))
    }

    pub(crate) fn contains<T: Transaction>(&self, txn: &T, id: &E::Key) -> Result<bool> {
        Ok(raw_get(txn, self.primary, &id.to_bytes())?.is_some())
    }

    /// Insert a record, failing softly when the key is already present.
    pub(crate) fn insert(&self, txn: &mut RwTransaction<'_>, e: &E) -> Result<bool> {
        let key = e.id().to_bytes();
        let value = self.fns.to_bytes(e);

        match txn.put(self.primary, &key, &value, WriteFlags::NO_OVERWRITE) {
            Ok(()) => {}
            Err(lmdb::Error::KeyExist) => return Ok(false),
            Err(e) => return Err(StoreError::Engine(e.to_string())),
        }

        if let Some(sec) = &self.secondary {
            let parent_key = (sec.extract)(&value)?;
            txn.put(sec.db, &parent_key, &key, WriteFlags::empty())
                .map_err(|e| StoreError::Engine(e.to_string()))?;
        }
        Ok(true)
    }

    /// Insert or overwrite a record, keeping the secondary entry current
    /// when the extracted parent key changes.
    pub(crate) fn upsert(&self, txn: &mut RwTransaction<'_>, e: &E) -> Result<()> {
        let key = e.id().to_bytes();
        let value = self.fns.to_bytes(e);
        let old = raw_get(txn, self.primary, &key)?;

        txn.put(self.primary, &key, &value, WriteFlags::empty())
            .map_err(|e| StoreError::Engine(e.to_string()))?;

        if let Some(sec) = &self.secondary {
            let parent_key = (sec.extract)(&value)?;
            if let Some(old_bytes) = &old {
                let old_parent_key = (sec.extract)(old_bytes)?;
                if old_parent_key == parent_key {
                    return Ok(());
                }
                match txn.del(sec.db, &old_parent_key, Some(key.as_slice())) {
                    Ok(()) | Err(lmdb::Error::NotFound) => {}
                    Err(e) => return Err(StoreError::Engine(e.to_string())),
                }
            }
            txn.put(sec.db, &parent_key, &key, WriteFlags::empty())
                .map_err(|e| StoreError::Engine(e.to_string()))?;
        }
        Ok(())
    }

    /// Remove one record by key, returning the removed value if present.
    pub(crate) fn delete(&self, txn: &mut RwTransaction<'_>, id: &E::Key) -> Result<Option<E>> {
        let key = id.to_bytes();
        let Some(old) = raw_get(txn, self.primary, &key)? else {
            return Ok(None);
        };

        txn.del(self.primary, &key, None)
            .map_err(|e| StoreError::Engine(e.to_string()))?;

        if let Some(sec) = &self.secondary {
            let parent_key = (sec.extract)(&old)?;
            match txn.del(sec.db, &parent_key, Some(key.as_slice())) {
                Ok(()) | Err(lmdb::Error::NotFound) => {}
                Err(e) => return Err(StoreError::Engine(e.to_string())),
            }
        }
        Ok(Some(self.fns.from_bytes(&old)))
    }

    /// Remove every record whose extracted parent key equals `parent_key`,
    /// from both the primary and the secondary. Returns the removed records
    /// in the secondary range's natural order.
    pub(crate) fn take_children(
        &self,
        txn: &mut RwTransaction<'_>,
        parent_key: &[u8],
    ) -> Result<Vec<E>> {
        let Some(sec) = &self.secondary else {
            return Err(StoreError::Engine(
                "cascade over a storage without a secondary index".into(),
            ));
        };

        if raw_get(txn, sec.db, parent_key)?.is_none() {
            return Ok(Vec::new());
        }

        let child_keys: Vec<Vec<u8>> = {
            let mut cursor = txn
                .open_ro_cursor(sec.db)
                .map_err(|e| StoreError::Engine(e.to_string()))?;
            cursor
                .iter_dup_of(&parent_key)
                .map_err(|e| StoreError::Engine(e.to_string()))?
                .map(|(_, value)| value.to_vec())
                .collect()
        };

        let mut removed = Vec::with_capacity(child_keys.len());
        for key in &child_keys {
            if let Some(bytes) = raw_get(txn, self.primary, key)? {
                txn.del(self.primary, key, None)
                    .map_err(|e| StoreError::Engine(e.to_string()))?;
                removed.push(self.fns.from_bytes(&bytes));
            }
        }

        txn.del(sec.db, &parent_key, None)
            .map_err(|e| StoreError::Engine(e.to_string()))?;

        Ok(removed)
    }

    /// Every record in primary-key order.
    pub(crate) fn scan<T: Transaction>(&self, txn: &T) -> Result<Vec<E>> {
        let mut cursor = txn
            .open_ro_cursor(self.primary)
            .map_err(|e| StoreError::Engine(e.to_string()))?;

        let mut out = Vec::new();
        for (_, value) in cursor.iter() {
            out.push(self.fns.from_bytes(value));
        }
        Ok(out)
    }

    pub(crate) fn count<T: Transaction>(&self, txn: &T) -> Result<usize> {
        let mut cursor = txn
            .open_ro_cursor(self.primary)
            .map_err(|e| StoreError::Engine(e.to_string()))?;
        Ok(cursor.iter().count())
    }
}
