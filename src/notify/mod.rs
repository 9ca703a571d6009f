//! Configuration change notification.
//!
//! The poller signals through a single-slot channel whenever it advances the
//! cache; consumers hold a receive-only [`ChangeWatcher`].

mod change;

pub use change::{ChangeNotifier, ChangeWatcher, channel};
