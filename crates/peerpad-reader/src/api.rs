//! HTTP surface.
//!
//! Every path renders the document except `/_stop`, which acknowledges and
//! then ends the process after a short delay. Requests queue behind the one
//! shared bootstrap; once it has finished they see its cached outcome.

use crate::config::ServeOptions;
use crate::render::Renderer;
use crate::session::Session;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::any,
    Router,
};
use peerpad_replica::await_non_empty;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Administrative shutdown path.
pub const STOP_PATH: &str = "/_stop";
/// Body returned by [`STOP_PATH`].
pub const STOP_ACK: &str = "Stopping PeerPad server";
/// Running count of successfully served document requests.
pub const INVOCATION_COUNT_HEADER: &str = "x-peer-pad-invocation-count";
/// Body returned when a configured request deadline passes.
pub const TIMEOUT_BODY: &str = "timed out waiting for document to converge";

/// Called with the exit code when the process should end.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Exit hook that ends the process.
pub fn process_exit() -> ExitHook {
    Arc::new(|code| std::process::exit(code))
}

/// Shared state for request handlers.
pub struct ReaderState {
    session: Arc<Session>,
    renderer: Renderer,
    options: ServeOptions,
    exit: ExitHook,
    invocations: AtomicU64,
}

impl ReaderState {
    pub fn new(session: Arc<Session>, renderer: Renderer, options: ServeOptions, exit: ExitHook) -> Self {
        Self {
            session,
            renderer,
            options,
            exit,
            invocations: AtomicU64::new(0),
        }
    }

    /// Document requests served from a ready session so far.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }
}

type AppState = Arc<ReaderState>;

/// Build the router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(STOP_PATH, any(stop))
        .fallback(serve_document)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn stop(State(state): State<AppState>) -> &'static str {
    let delay = state.options.stop_delay;
    info!("Stop requested, exiting in {:?}", delay);

    let exit = Arc::clone(&state.exit);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        exit(0);
    });

    STOP_ACK
}

async fn serve_document(State(state): State<AppState>) -> Response {
    match state.options.request_timeout {
        None => respond(&state).await,
        Some(limit) => match tokio::time::timeout(limit, respond(&state)).await {
            Ok(response) => response,
            Err(_) => {
                warn!("Request gave up after {:?}", limit);
                (StatusCode::GATEWAY_TIMEOUT, TIMEOUT_BODY).into_response()
            }
        },
    }
}

async fn respond(state: &ReaderState) -> Response {
    let doc = match state.session.outcome().await {
        Ok(doc) => doc,
        Err(e) => {
            // The error text is the whole body; no status semantics on top.
            let count = state.invocations();
            return ([(INVOCATION_COUNT_HEADER, count.to_string())], e.to_string()).into_response();
        }
    };

    let (title, content) = if state.options.live_read {
        let content = await_non_empty(&doc.content_handle).await;
        let title = await_non_empty(&doc.title_handle).await;
        (title, content)
    } else {
        (doc.title.clone(), doc.content.clone())
    };

    if !state.options.render_delay.is_zero() {
        tokio::time::sleep(state.options.render_delay).await;
    }

    // Counted only once nothing can time out anymore.
    let count = state.invocations.fetch_add(1, Ordering::SeqCst) + 1;
    let page = state.renderer.render(&title, &content);
    ([(INVOCATION_COUNT_HEADER, count.to_string())], Html(page)).into_response()
}
