//! Burrow: typed, transactional, observable record collections over LMDB
//!
//! A [`Storage`] is a strongly-typed collection of domain records whose
//! persistence, parent→child referential cleanup, and change notification
//! come bundled:
//! - every mutation runs in its own write transaction on the shared
//!   environment, with abort on every non-commit exit path
//! - removals cascade along composable [`Deleter`] links into downstream
//!   [`ChildStorage`]s, all inside the topmost transaction
//! - committed mutations enqueue change events that a background
//!   [`ChangeWatcher`] thread dispatches to permanent or scoped listeners
//!
//! Record types supply a [`Marshal`] implementation (exact-size byte trio)
//! and a [`Record`] identity; the marshaller is installed in a process-wide
//! registry at storage construction.

pub use lmdb;

pub mod child;
pub mod deleter;
pub mod env;
pub mod storage;
pub mod table;
pub mod txn;
pub mod watch;
pub mod wrapper;

pub use burrow_core::{
    ByteReader, ByteWriter, EnvConfig, Marshal, MarshalFns, Record, Result, StoreError, StoreKey,
    SyncMode,
};

pub use child::ChildStorage;
pub use deleter::{CascadeTarget, DeferredEvents, Deleter};
pub use env::StoreEnv;
pub use storage::{RecordStore, Storage};
pub use table::KeyExtractor;
pub use txn::TransactionManager;
pub use watch::{ChangeWatcher, EventKind, EventListenerHolder, EventMask, EventQueue};
pub use wrapper::{ElementWrapper, WrapperExt};

pub mod prelude {
    pub use crate::child::ChildStorage;
    pub use crate::deleter::Deleter;
    pub use crate::env::StoreEnv;
    pub use crate::storage::Storage;
    pub use crate::watch::{ChangeWatcher, EventKind, EventMask};
    pub use crate::wrapper::WrapperExt;
    pub use burrow_core::{EnvConfig, Marshal, Record, Result, StoreError, StoreKey};
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use crate::env::StoreEnv;
    use burrow_core::{ByteReader, ByteWriter, EnvConfig, Marshal, Record, Result};
    use tempfile::TempDir;

    #[derive(Clone, PartialEq, Debug)]
    pub struct TestElement {
        pub id: String,
        pub name: String,
    }

    impl Record for TestElement {
        type Key = String;
        fn id(&self) -> String {
            self.id.clone()
        }
    }

    pub struct TestMarshaller;

    impl Marshal<TestElement> for TestMarshaller {
        fn byte_size(e: &TestElement) -> u32 {
            ByteWriter::str_size(&e.id) + ByteWriter::str_size(&e.name)
        }
        fn store(e: &TestElement, dest: &mut [u8]) {
            let mut w = ByteWriter::new(dest);
            w.put_str(&e.id);
            w.put_str(&e.name);
        }
        fn restore(src: &[u8]) -> TestElement {
            let mut r = ByteReader::new(src);
            TestElement {
                id: r.take_str(),
                name: r.take_str(),
            }
        }
    }

    /// Secondary-key extractor for the tests: a child's `name` field holds
    /// the id of its parent.
    pub fn parent_of(record: &[u8]) -> Result<Vec<u8>> {
        let element = TestMarshaller::restore(record);
        Ok(element.name.into_bytes())
    }

    pub fn test_env() -> (Arc<StoreEnv>, TempDir) {
        let temp = TempDir::new().unwrap();
        let env =
            StoreEnv::open(EnvConfig::new(temp.path()).with_map_size(32 * 1024 * 1024)).unwrap();
        (env, temp)
    }
}
