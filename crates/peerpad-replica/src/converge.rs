//! Convergence wait.
//!
//! A replica counts as converged the first time its materialized value holds at
//! least one character. A partial document is accepted just like a complete
//! one; nothing here tries to tell the two apart.

use crate::error::{Error, Result};
use crate::replica::ReplicaHandle;
use std::time::Duration;
use tracing::{debug, trace};

/// Resolve with the first non-empty value of `handle`.
///
/// If the replica already has content it is returned without registering a
/// listener. Otherwise exactly one listener is registered and removed again
/// before returning. There is no timeout: a replica that never receives any
/// content keeps this future pending forever.
pub async fn await_non_empty(handle: &ReplicaHandle) -> String {
    let value = handle.read();
    if !value.is_empty() {
        trace!(replica = handle.name(), len = value.len(), "replica already converged");
        return value;
    }

    debug!(replica = handle.name(), "waiting for replica to converge");
    let mut subscription = handle.subscribe();
    loop {
        // Re-read after subscribing so a write racing the fast path is not lost.
        let value = handle.read();
        if !value.is_empty() {
            debug!(replica = handle.name(), len = value.len(), "replica converged");
            return value;
        }
        subscription.changed().await;
    }
}

/// [`await_non_empty`] bounded by `limit`.
///
/// On timeout the listener is dropped with the inner future.
pub async fn await_non_empty_within(handle: &ReplicaHandle, limit: Duration) -> Result<String> {
    tokio::time::timeout(limit, await_non_empty(handle))
        .await
        .map_err(|_| Error::Timeout(limit))
}
