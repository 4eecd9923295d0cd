//! In-memory event queue with per-kind listener registry
//!
//! Entries accumulate until [`EventQueue::process`] dispatches them; the
//! queue is unbounded and nothing is lost while the worker keeps up.
//! Listeners registered for distinct kinds are independent.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::error;

use super::events::EventKind;

pub type Callback<E> = Arc<dyn Fn(EventKind, &E) + Send + Sync>;

/// Identifies one installed listener; unique per (kind, callback)
/// installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerHandle(u64);

pub struct EventQueue<E> {
    entries: Mutex<Vec<(EventKind, E)>>,
    pending: Condvar,
    listeners: Mutex<HashMap<EventKind, Vec<(ListenerHandle, Callback<E>)>>>,
    next_handle: AtomicU64,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            pending: Condvar::new(),
            listeners: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Append one event entry. Entries keep their enqueue order until
    /// processed.
    pub fn enqueue(&self, kind: EventKind, element: E) {
        self.entries.lock().push((kind, element));
        self.pending.notify_one();
    }

    /// Register `callback` for events of `kind`. The returned handle
    /// removes exactly this installation.
    pub fn append_listener(&self, kind: EventKind, callback: Callback<E>) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(kind)
            .or_default()
            .push((handle, callback));
        handle
    }

    pub fn remove_listener(&self, kind: EventKind, handle: ListenerHandle) {
        if let Some(installed) = self.listeners.lock().get_mut(&kind) {
            installed.retain(|(h, _)| *h != handle);
        }
    }

    /// Block for at most `timeout` until an entry is pending. Returns true
    /// when at least one entry is waiting.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            return true;
        }
        self.pending.wait_for(&mut entries, timeout);
        !entries.is_empty()
    }

    /// Dispatch every pending entry to the listeners currently registered
    /// for its kind, then clear the pending set. Listener panics are
    /// caught, logged, and swallowed so later entries still dispatch.
    pub fn process(&self) {
        let entries = std::mem::take(&mut *self.entries.lock());

        for (kind, element) in entries {
            let installed: Vec<Callback<E>> = self
                .listeners
                .lock()
                .get(&kind)
                .map(|v| v.iter().map(|(_, cb)| cb.clone()).collect())
                .unwrap_or_default();

            for callback in installed {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(kind, &element))) {
                    let text = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".into());
                    error!(error = %text, ?kind, "event listener failed, continuing");
                }
            }
        }
    }

    pub fn pending_len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .lock()
            .get(&kind)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}
