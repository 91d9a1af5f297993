//! Replica handles.
//!
//! A replica is created as a pair: the [`ReplicaHandle`] that readers hold and
//! the [`ReplicaFeed`] the overlay writes merged remote state into. Every write
//! through the feed wakes all live [`Subscription`]s, whether or not the value
//! actually changed.
//!
//! ```text
//!   overlay ──set/append──▶ ReplicaFeed ──watch──▶ ReplicaHandle ──▶ readers
//! ```

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// The protocol kind a replicated value is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaKind {
    /// Replicated growable array of characters.
    Rga,
}

impl ReplicaKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaKind::Rga => "rga",
        }
    }
}

impl fmt::Display for ReplicaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Shared {
    name: String,
    tx: watch::Sender<String>,
}

/// Create a new, empty replica named `name`.
pub fn channel(name: impl Into<String>) -> (ReplicaHandle, ReplicaFeed) {
    let (tx, _rx) = watch::channel(String::new());
    let shared = Arc::new(Shared {
        name: name.into(),
        tx,
    });
    (
        ReplicaHandle {
            shared: Arc::clone(&shared),
        },
        ReplicaFeed { shared },
    )
}

/// Read side of a replicated value.
#[derive(Clone)]
pub struct ReplicaHandle {
    shared: Arc<Shared>,
}

impl ReplicaHandle {
    /// Name the replica was opened under.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current materialized value.
    pub fn read(&self) -> String {
        self.shared.tx.borrow().clone()
    }

    /// Whether the materialized value has no characters yet.
    pub fn is_empty(&self) -> bool {
        self.shared.tx.borrow().is_empty()
    }

    /// Register a change listener. Dropping the subscription removes it.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.shared.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.shared.tx.receiver_count()
    }
}

impl fmt::Debug for ReplicaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaHandle")
            .field("name", &self.shared.name)
            .field("len", &self.shared.tx.borrow().len())
            .finish()
    }
}

/// A registered change listener on a [`ReplicaHandle`].
pub struct Subscription {
    rx: watch::Receiver<String>,
}

impl Subscription {
    /// Wait for the next write to the replica.
    ///
    /// The sender lives as long as any handle, so this only ever returns
    /// after a write. If the channel does close, the wait never completes.
    pub async fn changed(&mut self) {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Write side of a replicated value, owned by the overlay.
#[derive(Clone)]
pub struct ReplicaFeed {
    shared: Arc<Shared>,
}

impl ReplicaFeed {
    /// Replace the materialized value.
    pub fn set(&self, value: impl Into<String>) {
        self.shared.tx.send_replace(value.into());
    }

    /// Append characters to the materialized value.
    pub fn append(&self, text: &str) {
        self.shared.tx.send_modify(|value| value.push_str(text));
    }

    /// Remove every character.
    pub fn clear(&self) {
        self.shared.tx.send_modify(String::clear);
    }

    /// A read handle onto the same replica.
    pub fn handle(&self) -> ReplicaHandle {
        ReplicaHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for ReplicaFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaFeed")
            .field("name", &self.shared.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_replica_is_empty() {
        let (handle, _feed) = channel("doc");
        assert_eq!(handle.name(), "doc");
        assert!(handle.is_empty());
        assert_eq!(handle.read(), "");
        assert_eq!(handle.listener_count(), 0);
    }

    #[test]
    fn writes_without_listeners_are_kept() {
        let (handle, feed) = channel("doc");
        feed.set("Hello");
        feed.append(" World");
        assert_eq!(handle.read(), "Hello World");

        feed.clear();
        assert!(handle.is_empty());
    }

    #[test]
    fn subscriptions_are_counted_until_dropped() {
        let (handle, _feed) = channel("doc");
        let first = handle.subscribe();
        let second = handle.subscribe();
        assert_eq!(handle.listener_count(), 2);

        drop(first);
        assert_eq!(handle.listener_count(), 1);
        drop(second);
        assert_eq!(handle.listener_count(), 0);
    }

    #[tokio::test]
    async fn subscription_wakes_on_write() {
        let (handle, feed) = channel("doc");
        let mut sub = handle.subscribe();

        feed.set("x");
        sub.changed().await;
        assert_eq!(handle.read(), "x");
    }

    #[test]
    fn feed_handle_shares_state() {
        let (_handle, feed) = channel("title");
        let other = feed.handle();
        feed.set("My Title");
        assert_eq!(other.read(), "My Title");
        assert_eq!(ReplicaKind::Rga.to_string(), "rga");
    }
}
