//! Reader Node - the application entry point.
//!
//! Architecture:
//! - One session per process, bootstrapped as soon as the node runs
//! - HTTP server whose handlers share that session
//! - Print mode: bootstrap, print the document, done

use crate::api::{self, process_exit, ExitHook, ReaderState};
use crate::config::ReaderConfig;
use crate::error::{Error, Result};
use crate::keys::{KeyDecoder, UriKeyDecoder};
use crate::overlay::{MeshOverlay, Overlay};
use crate::render::Renderer;
use crate::session::{Bootstrapper, Document, Session};
use std::sync::Arc;

/// A reader node instance.
pub struct ReaderNode {
    config: ReaderConfig,
    session: Arc<Session>,
    renderer: Renderer,
    exit: ExitHook,
}

impl ReaderNode {
    /// Create a node backed by the mesh overlay and URI key decoding.
    pub fn new(config: ReaderConfig) -> Self {
        let overlay = Arc::new(MeshOverlay::new(config.app.clone(), config.peers.clone()));
        Self::with_parts(config, overlay, Arc::new(UriKeyDecoder))
    }

    /// Create a node with explicit collaborators.
    pub fn with_parts(
        config: ReaderConfig,
        overlay: Arc<dyn Overlay>,
        keys: Arc<dyn KeyDecoder>,
    ) -> Self {
        let session = Arc::new(Session::new(
            config.identity.clone(),
            Bootstrapper::new(overlay, keys),
        ));
        Self {
            config,
            session,
            renderer: Renderer::default(),
            exit: process_exit(),
        }
    }

    /// Replace what happens when `/_stop` fires.
    pub fn with_exit_hook(mut self, exit: ExitHook) -> Self {
        self.exit = exit;
        self
    }

    /// Replace the page renderer.
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// The node's session.
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// Router serving this node's session.
    pub fn router(&self) -> axum::Router {
        api::build_router(Arc::new(ReaderState::new(
            self.session(),
            self.renderer.clone(),
            self.config.serve.clone(),
            Arc::clone(&self.exit),
        )))
    }

    /// Run the node: start bootstrapping, then serve HTTP until stopped.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Peer Pad reader starting");
        tracing::info!("  Document: {}", self.config.identity.name());
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Peers: {:?}", self.config.peers);

        // Bootstrap starts now, not on the first request.
        self.session.spawn_bootstrap();

        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Bootstrap and return the converged document.
    pub async fn fetch(&self) -> Result<Arc<Document>> {
        self.session.bootstrap().await.map_err(Error::Bootstrap)
    }
}
