//! Change notification
//!
//! A [`ChangeWatcher`] pairs an in-memory event queue with one background
//! worker thread that drains it and dispatches to registered listeners.
//! Subscriptions are either permanent or scoped: scoped subscriptions
//! return an [`EventListenerHolder`] whose drop removes exactly the
//! listeners it installed.

mod events;
mod holder;
mod queue;
mod watcher;

pub use events::{EventKind, EventMask};
pub use holder::EventListenerHolder;
pub use queue::{EventQueue, ListenerHandle};
pub use watcher::ChangeWatcher;
