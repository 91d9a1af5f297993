//! TCP overlay adapter.
//!
//! Connects to a fixed list of peers and speaks newline-delimited JSON:
//!
//! ```text
//! reader                              peer
//!   ── {"type":"hello","app":...} ──────▶
//!   ── {"type":"subscribe",...} ────────▶
//!   ◀──────── {"type":"state","collaboration":...,"value":...}
//!   ◀──────── {"type":"state",...}   (every time the peer's replica changes)
//! ```
//!
//! Peers push the whole materialized value; merging is their business. The
//! last state received for a collaboration wins.

use super::{sub_id, Collaboration, Overlay};
use crate::error::OverlayError;
use crate::keys::{encode_key, Keys};
use async_trait::async_trait;
use peerpad_replica::{channel, ReplicaFeed, ReplicaKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Messages exchanged with peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// First line on every connection
    Hello { app: String },
    /// Ask the peer to push the state of a collaboration
    Subscribe {
        collaboration: String,
        kind: String,
        key: String,
    },
    /// Materialized value of a collaboration
    State { collaboration: String, value: String },
    /// Peer-side failure
    Error { message: String },
}

type Feeds = Arc<RwLock<HashMap<String, ReplicaFeed>>>;

struct PeerLink {
    addr: String,
    writer: OwnedWriteHalf,
}

/// Overlay backed by TCP connections to known peers.
pub struct MeshOverlay {
    app: String,
    peers: Vec<String>,
    links: Mutex<Vec<PeerLink>>,
    feeds: Feeds,
    /// Encoded read key per root collaboration, reused for its subs
    keys: RwLock<HashMap<String, String>>,
}

impl MeshOverlay {
    /// Create an overlay that will connect to `peers` (`host:port`).
    pub fn new(app: impl Into<String>, peers: Vec<String>) -> Self {
        Self {
            app: app.into(),
            peers,
            links: Mutex::new(Vec::new()),
            feeds: Arc::new(RwLock::new(HashMap::new())),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Number of peers currently connected.
    pub async fn connected_peers(&self) -> usize {
        self.links.lock().await.len()
    }

    async fn open(
        &self,
        id: String,
        kind: ReplicaKind,
        key: String,
    ) -> Result<Collaboration, OverlayError> {
        let handle = {
            let mut feeds = self.feeds.write().await;
            feeds
                .entry(id.clone())
                .or_insert_with(|| channel(id.as_str()).1)
                .handle()
        };

        let subscribe = WireMessage::Subscribe {
            collaboration: id.clone(),
            kind: kind.to_string(),
            key,
        };

        let mut links = self.links.lock().await;
        if links.is_empty() {
            return Err(OverlayError::NotStarted);
        }

        let mut delivered = 0usize;
        let mut last_error = None;
        for link in links.iter_mut() {
            match send(&mut link.writer, &subscribe).await {
                Ok(()) => {
                    debug!("Subscribed to {} via {}", id, link.addr);
                    delivered += 1;
                }
                Err(e) => {
                    warn!("Failed to subscribe to {} via {}: {}", id, link.addr, e);
                    last_error = Some(e);
                }
            }
        }

        match (delivered, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(Collaboration::new(id, kind, handle)),
        }
    }
}

#[async_trait]
impl Overlay for MeshOverlay {
    async fn start(&self) -> Result<(), OverlayError> {
        if self.peers.is_empty() {
            return Err(OverlayError::NoPeers);
        }

        let mut links = self.links.lock().await;
        let mut last_error = None;

        for addr in &self.peers {
            info!("Connecting to peer: {}", addr);
            let stream = match TcpStream::connect(addr.as_str()).await {
                Ok(stream) => stream,
                Err(source) => {
                    warn!("Failed to connect to peer {}: {}", addr, source);
                    last_error = Some(OverlayError::Connect {
                        addr: addr.clone(),
                        source,
                    });
                    continue;
                }
            };

            let (reader, mut writer) = stream.into_split();
            let hello = WireMessage::Hello {
                app: self.app.clone(),
            };
            if let Err(e) = send(&mut writer, &hello).await {
                warn!("Failed to greet peer {}: {}", addr, e);
                last_error = Some(e);
                continue;
            }

            let feeds = Arc::clone(&self.feeds);
            let peer = addr.clone();
            tokio::spawn(async move {
                if let Err(e) = read_peer(reader, &peer, feeds).await {
                    warn!("Peer {} error: {}", peer, e);
                }
            });

            info!("Connected to peer {}", addr);
            links.push(PeerLink {
                addr: addr.clone(),
                writer,
            });
        }

        if links.is_empty() {
            return Err(last_error.unwrap_or(OverlayError::NoPeers));
        }
        Ok(())
    }

    async fn collaborate(
        &self,
        name: &str,
        kind: ReplicaKind,
        keys: &Keys,
    ) -> Result<Collaboration, OverlayError> {
        let key = encode_key(&keys.read);
        self.keys.write().await.insert(name.to_string(), key.clone());
        self.open(name.to_string(), kind, key).await
    }

    async fn sub(
        &self,
        parent: &Collaboration,
        name: &str,
        kind: ReplicaKind,
    ) -> Result<Collaboration, OverlayError> {
        let root = parent.id().split('/').next().unwrap_or_default();
        let key = self
            .keys
            .read()
            .await
            .get(root)
            .cloned()
            .ok_or_else(|| OverlayError::Protocol(format!("unknown collaboration {}", parent.id())))?;
        self.open(sub_id(parent.id(), name), kind, key).await
    }
}

async fn send(writer: &mut OwnedWriteHalf, msg: &WireMessage) -> Result<(), OverlayError> {
    let line = serde_json::to_string(msg).map_err(|e| OverlayError::Protocol(e.to_string()))?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

/// Apply everything a peer pushes until it disconnects.
async fn read_peer(reader: OwnedReadHalf, peer: &str, feeds: Feeds) -> Result<(), OverlayError> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            info!("Peer {} disconnected", peer);
            return Ok(());
        }

        // A bad line is skipped; the connection stays up.
        match serde_json::from_slice::<WireMessage>(&line) {
            Ok(WireMessage::State {
                collaboration,
                value,
            }) => match feeds.read().await.get(&collaboration) {
                Some(feed) => {
                    debug!("State for {} from {} ({} bytes)", collaboration, peer, value.len());
                    feed.set(value);
                }
                None => debug!("Ignoring state for unopened {} from {}", collaboration, peer),
            },
            Ok(WireMessage::Error { message }) => warn!("Peer {} reported: {}", peer, message),
            Ok(other) => debug!("Ignoring {:?} from {}", other, peer),
            Err(e) => warn!("Invalid message from {}: {}", peer, e),
        }
    }
}
