//! In-process overlay.

use super::{sub_id, Collaboration, Overlay};
use crate::error::OverlayError;
use crate::keys::Keys;
use async_trait::async_trait;
use peerpad_replica::{channel, ReplicaFeed, ReplicaKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Call counts, for checking that a session only joins and opens once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryOverlayStats {
    pub starts: usize,
    pub collaborations: usize,
    pub subs: usize,
}

/// Overlay whose replicas live in this process and are written through
/// [`MemoryOverlay::feed`].
#[derive(Debug, Default)]
pub struct MemoryOverlay {
    feeds: RwLock<HashMap<String, ReplicaFeed>>,
    started: AtomicBool,
    starts: AtomicUsize,
    collaborations: AtomicUsize,
    subs: AtomicUsize,
}

impl MemoryOverlay {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write side of the replica `id`, created empty if it does not exist yet.
    pub async fn feed(&self, id: &str) -> ReplicaFeed {
        if let Some(feed) = self.feeds.read().await.get(id) {
            return feed.clone();
        }
        let mut feeds = self.feeds.write().await;
        feeds
            .entry(id.to_string())
            .or_insert_with(|| channel(id).1)
            .clone()
    }

    /// How often each capability was used.
    pub fn stats(&self) -> MemoryOverlayStats {
        MemoryOverlayStats {
            starts: self.starts.load(Ordering::SeqCst),
            collaborations: self.collaborations.load(Ordering::SeqCst),
            subs: self.subs.load(Ordering::SeqCst),
        }
    }

    async fn open(&self, id: String, kind: ReplicaKind) -> Result<Collaboration, OverlayError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(OverlayError::NotStarted);
        }
        let feed = self.feed(&id).await;
        tracing::debug!(collaboration = %id, %kind, "opened in-memory collaboration");
        Ok(Collaboration::new(id, kind, feed.handle()))
    }
}

#[async_trait]
impl Overlay for MemoryOverlay {
    async fn start(&self) -> Result<(), OverlayError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn collaborate(
        &self,
        name: &str,
        kind: ReplicaKind,
        _keys: &Keys,
    ) -> Result<Collaboration, OverlayError> {
        self.collaborations.fetch_add(1, Ordering::SeqCst);
        self.open(name.to_string(), kind).await
    }

    async fn sub(
        &self,
        parent: &Collaboration,
        name: &str,
        kind: ReplicaKind,
    ) -> Result<Collaboration, OverlayError> {
        self.subs.fetch_add(1, Ordering::SeqCst);
        self.open(sub_id(parent.id(), name), kind).await
    }
}
