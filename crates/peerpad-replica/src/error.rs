//! Error types for peerpad-replica.

use thiserror::Error;

/// Result type for peerpad-replica operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while waiting on a replica.
#[derive(Debug, Error)]
pub enum Error {
    /// The replica stayed empty for the whole deadline.
    #[error("replica did not converge within {0:?}")]
    Timeout(std::time::Duration),
}
