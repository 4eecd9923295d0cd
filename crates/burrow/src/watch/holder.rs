//! Scoped subscription token

use std::sync::Weak;

use super::events::EventKind;
use super::queue::{EventQueue, ListenerHandle};

/// Owns the listeners a scoped subscription installed.
///
/// Dropping the holder removes exactly those listeners, provided the queue
/// is still alive; after the queue is gone the drop is a no-op. Holders are
/// move-only: ownership of the installed handles transfers with the value.
#[must_use = "dropping the holder immediately removes its listeners"]
pub struct EventListenerHolder<E> {
    queue: Weak<EventQueue<E>>,
    handles: Vec<(EventKind, ListenerHandle)>,
}

impl<E> EventListenerHolder<E> {
    pub(crate) fn new(
        queue: Weak<EventQueue<E>>,
        handles: Vec<(EventKind, ListenerHandle)>,
    ) -> Self {
        Self { queue, handles }
    }

    /// Number of listeners this holder owns.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<E> Drop for EventListenerHolder<E> {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.upgrade() {
            for (kind, handle) in self.handles.drain(..) {
                queue.remove_listener(kind, handle);
            }
        }
    }
}
