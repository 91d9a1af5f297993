//! Peer Pad Reader - Collaborative Documents as Web Pages
//!
//! Opens one collaboratively edited markdown document from the peer-to-peer
//! network, waits until its local replica holds something, and serves it as a
//! styled HTML page.
//!
//! # Architecture
//!
//! - **Config**: environment variables, checked before any network activity
//! - **Overlay**: the network seam (TCP mesh adapter or in-memory)
//! - **Session**: one bootstrap per process, outcome cached forever
//! - **API**: axum handler; every path renders, `/_stop` ends the process
//! - **Render**: markdown to a complete HTML page
//!
//! # Example
//!
//! ```no_run
//! use peerpad_reader::{ReaderConfig, ReaderNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReaderConfig::from_env()?;
//!     let node = ReaderNode::new(config);
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod document;
pub mod error;
pub mod keys;
pub mod node;
pub mod overlay;
pub mod render;
pub mod session;

pub use api::{build_router, ExitHook, ReaderState};
pub use config::{ReaderConfig, ServeOptions};
pub use document::DocumentIdentity;
pub use error::{BootstrapError, ConfigError, Error, KeyError, OverlayError, RenderError, Result};
pub use keys::{KeyDecoder, Keys, UriKeyDecoder};
pub use node::ReaderNode;
pub use overlay::{Collaboration, MemoryOverlay, MeshOverlay, Overlay};
pub use render::{CommonMark, MarkdownConverter, Renderer};
pub use session::{Bootstrapper, Document, Outcome, Session, SessionState};
