//! Network overlay seam.
//!
//! The reader never replicates anything itself. An [`Overlay`] joins the
//! network, opens named replicated values and keeps their local replicas fed.
//!
//! - [`MemoryOverlay`]: in-process, replicas are fed by the caller
//! - [`MeshOverlay`]: attaches to peers over TCP, which push materialized state

mod memory;
mod mesh;

pub use memory::{MemoryOverlay, MemoryOverlayStats};
pub use mesh::{MeshOverlay, WireMessage};

use crate::error::OverlayError;
use crate::keys::Keys;
use async_trait::async_trait;
use peerpad_replica::{ReplicaHandle, ReplicaKind};

/// An opened replicated value.
#[derive(Debug, Clone)]
pub struct Collaboration {
    id: String,
    kind: ReplicaKind,
    shared: ReplicaHandle,
}

impl Collaboration {
    /// Wrap a replica handle opened under `id`.
    pub fn new(id: impl Into<String>, kind: ReplicaKind, shared: ReplicaHandle) -> Self {
        Self {
            id: id.into(),
            kind,
            shared,
        }
    }

    /// Collaboration id; sub-collaborations are `<parent>/<name>`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Protocol kind.
    pub fn kind(&self) -> ReplicaKind {
        self.kind
    }

    /// Local replica of the shared value.
    pub fn shared(&self) -> &ReplicaHandle {
        &self.shared
    }
}

/// Id of the sub-collaboration `name` under `parent`.
pub fn sub_id(parent: &str, name: &str) -> String {
    format!("{}/{}", parent, name)
}

/// Capabilities the reader needs from the peer-to-peer network.
#[async_trait]
pub trait Overlay: Send + Sync {
    /// Join the network.
    async fn start(&self) -> Result<(), OverlayError>;

    /// Open the replicated value `name` with the given keys.
    async fn collaborate(
        &self,
        name: &str,
        kind: ReplicaKind,
        keys: &Keys,
    ) -> Result<Collaboration, OverlayError>;

    /// Open a named value that belongs to `parent`.
    async fn sub(
        &self,
        parent: &Collaboration,
        name: &str,
        kind: ReplicaKind,
    ) -> Result<Collaboration, OverlayError>;
}
