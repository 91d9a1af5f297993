//! Error types for the reader.

use std::sync::Arc;
use thiserror::Error;

/// Result type for reader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can stop the reader node.
#[derive(Debug, Error)]
pub enum Error {
    /// Startup configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The session failed to bootstrap
    #[error("{0}")]
    Bootstrap(Arc<BootstrapError>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems with the process environment. Fatal before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// The document URL does not name a markdown pad.
    #[error("invalid document URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A variable holds a value that cannot be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Why a session ended up failed. Captured once and shown to every request.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Joining the overlay failed.
    #[error("failed to join network: {0}")]
    Join(#[source] OverlayError),

    /// The access key could not be decoded.
    #[error("invalid access key: {0}")]
    Key(#[from] KeyError),

    /// Opening the document or its title failed.
    #[error("failed to open collaboration: {0}")]
    Open(#[source] OverlayError),
}

/// Errors raised by an overlay implementation.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// No peer was configured or none could be reached.
    #[error("no peers reachable")]
    NoPeers,

    /// Connecting to a peer failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A collaboration was opened before the overlay was started.
    #[error("overlay not started")]
    NotStarted,

    /// A peer sent or would be sent something unusable.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors decoding an access key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The read part of the key is empty.
    #[error("access key is empty")]
    Empty,

    /// The key is not base58.
    #[error("malformed access key: {0}")]
    Decode(#[from] bs58::decode::Error),
}

/// Markdown conversion failed. Shown inside the page, never as a failed request.
#[derive(Debug, Error)]
#[error("markdown conversion failed: {0}")]
pub struct RenderError(pub String);
