//! Asynchronous change watcher
//!
//! One worker thread per watcher drains the event queue and dispatches to
//! listeners on that thread. Teardown is cooperative: drop raises the
//! shutdown flag, the worker finishes its wait slice, runs one final
//! drain, and is joined.
//!
//! # Example
//!
//! ```ignore
//! let watcher = Arc::new(ChangeWatcher::<Contact>::new());
//! watcher.append_permanent(EventKind::Added, |_, contact| {
//!     println!("added {:?}", contact.id());
//! });
//! let scoped = watcher.append_scoped(EventKind::Added | EventKind::Deleted, on_change);
//! // listeners installed by `scoped` disappear when it goes out of scope
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use super::events::{EventKind, EventMask};
use super::holder::EventListenerHolder;
use super::queue::{Callback, EventQueue};

const DRAIN_WAIT: Duration = Duration::from_millis(10);

pub struct ChangeWatcher<E: Clone + Send + 'static> {
    queue: Arc<EventQueue<E>>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<E: Clone + Send + 'static> ChangeWatcher<E> {
    pub fn new() -> Self {
        let queue = Arc::new(EventQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = {
            let queue = Arc::clone(&queue);
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || {
                while !shutdown.load(Ordering::Acquire) {
                    if queue.wait_for(DRAIN_WAIT) {
                        queue.process();
                    }
                }
                // final drain so nothing enqueued before shutdown is lost
                queue.process();
            })
        };

        Self {
            queue,
            shutdown,
            worker: Some(worker),
        }
    }

    /// Install `callback` for every kind in `events`; the listeners are
    /// never auto-removed. An `EventMask::ALL` subscription fires the
    /// callback exactly once per emitted event.
    pub fn append_permanent<M, F>(&self, events: M, callback: F)
    where
        M: Into<EventMask>,
        F: Fn(EventKind, &E) + Send + Sync + 'static,
    {
        let callback: Callback<E> = Arc::new(callback);
        for kind in events.into().kinds() {
            self.queue.append_listener(kind, callback.clone());
        }
    }

    /// Install `callback` for every kind in `events`, returning a holder
    /// whose drop removes exactly the listeners it installed.
    pub fn append_scoped<M, F>(&self, events: M, callback: F) -> EventListenerHolder<E>
    where
        M: Into<EventMask>,
        F: Fn(EventKind, &E) + Send + Sync + 'static,
    {
        let callback: Callback<E> = Arc::new(callback);
        let handles = events
            .into()
            .kinds()
            .map(|kind| (kind, self.queue.append_listener(kind, callback.clone())))
            .collect();
        EventListenerHolder::new(Arc::downgrade(&self.queue), handles)
    }

    pub fn element_added(&self, element: &E) {
        self.queue.enqueue(EventKind::Added, element.clone());
    }

    pub fn element_removed(&self, element: &E) {
        self.queue.enqueue(EventKind::Deleted, element.clone());
    }

    pub fn element_updated(&self, element: &E) {
        self.queue.enqueue(EventKind::Updated, element.clone());
    }

    pub(crate) fn enqueue(&self, kind: EventKind, element: E) {
        self.queue.enqueue(kind, element);
    }
}

impl<E: Clone + Send + 'static> Default for ChangeWatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send + 'static> Drop for ChangeWatcher<E> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("change watcher worker terminated abnormally");
            }
        }
    }
}
