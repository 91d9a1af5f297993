//! Peer Pad Replica - Replicated Values and Convergence
//!
//! Local views of collaboratively edited values and the wait that decides when
//! enough remote state has arrived to use them.
//!
//! # Overview
//!
//! - [`ReplicaHandle`]: read side of one named replicated value
//! - [`ReplicaFeed`]: write side, owned by whatever applies remote state
//! - [`await_non_empty`]: resolves once, with the first non-empty value
//!
//! # Example
//!
//! ```rust
//! use peerpad_replica::{await_non_empty, channel};
//!
//! # tokio_test::block_on(async {
//! let (handle, feed) = channel("doc1");
//! feed.set("# Hello");
//! assert_eq!(await_non_empty(&handle).await, "# Hello");
//! # });
//! ```

pub mod converge;
pub mod error;
pub mod replica;

pub use converge::{await_non_empty, await_non_empty_within};
pub use error::{Error, Result};
pub use replica::{channel, ReplicaFeed, ReplicaHandle, ReplicaKind, Subscription};
