//! Single-slot change notification channel.

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Create a connected notifier/watcher pair.
///
/// The channel holds at most one pending notification. Once the slot is
/// full, [`ChangeNotifier::notify`] waits until a watcher drains it, so
/// consumers must drain promptly (or from a dedicated task) or the producer
/// stalls on its next notification.
///
/// # Examples
///
/// ```rust
/// use hotswap_store::notify;
///
/// # async fn example() {
/// let (notifier, watcher) = notify::channel();
///
/// notifier.notify().await;
/// assert_eq!(watcher.changed().await, Some(()));
///
/// drop(notifier);
/// assert_eq!(watcher.changed().await, None);
/// # }
/// ```
pub fn channel() -> (ChangeNotifier, ChangeWatcher) {
    let (tx, rx) = mpsc::channel(1);
    (
        ChangeNotifier { tx },
        ChangeWatcher {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side of the change channel.
///
/// Owned by a single task; dropping it closes the channel.
pub struct ChangeNotifier {
    tx: mpsc::Sender<()>,
}

impl ChangeNotifier {
    /// Signal that a new configuration is available.
    ///
    /// Waits while a previous notification is still pending. Returns `false`
    /// if every watcher has been dropped.
    pub async fn notify(&self) -> bool {
        self.tx.send(()).await.is_ok()
    }
}

/// Receive-only handle to the change channel.
///
/// Clones share the same slot: each notification is delivered to exactly one
/// waiting watcher.
#[derive(Clone)]
pub struct ChangeWatcher {
    rx: Arc<Mutex<mpsc::Receiver<()>>>,
}

impl ChangeWatcher {
    /// Wait for the next change.
    ///
    /// Returns `None` once the channel is closed and no notification is
    /// pending, meaning no further notifications will arrive.
    pub async fn changed(&self) -> Option<()> {
        self.rx.lock().await.recv().await
    }

    /// Consume a pending notification without waiting.
    ///
    /// Returns `false` if nothing is pending or another watcher is currently
    /// receiving.
    pub fn try_changed(&self) -> bool {
        match self.rx.try_lock() {
            Ok(mut rx) => rx.try_recv().is_ok(),
            Err(_) => false,
        }
    }
}
