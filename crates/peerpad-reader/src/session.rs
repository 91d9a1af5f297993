//! Session bootstrap.
//!
//! A process serves exactly one document and bootstraps it exactly once:
//!
//! ```text
//! Pending ──join → decode key → open doc + title → content → title──▶ Ready
//!    │
//!    └──────────────── any step fails ───────────────────────────────▶ Failed
//! ```
//!
//! The outcome is cached for the rest of the process. There is no retry and
//! no reset; a fresh session needs a fresh process.

use crate::document::DocumentIdentity;
use crate::error::BootstrapError;
use crate::keys::KeyDecoder;
use crate::overlay::Overlay;
use peerpad_replica::{await_non_empty, ReplicaHandle, ReplicaKind};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Sub-collaboration holding the document title.
pub const TITLE_SUB: &str = "title";

/// A converged document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Title as first observed non-empty
    pub title: String,
    /// Body markdown as first observed non-empty
    pub content: String,
    /// Live replica of the body
    pub content_handle: ReplicaHandle,
    /// Live replica of the title
    pub title_handle: ReplicaHandle,
}

/// Terminal bootstrap result.
pub type Outcome = Result<Arc<Document>, Arc<BootstrapError>>;

/// Where the process-wide session stands.
#[derive(Debug, Clone)]
pub enum SessionState {
    Pending,
    Ready(Arc<Document>),
    Failed(Arc<BootstrapError>),
}

impl SessionState {
    /// Whether bootstrap is still running (or has not started).
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Pending)
    }

    /// The terminal outcome, if bootstrap has finished.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            SessionState::Pending => None,
            SessionState::Ready(doc) => Some(Ok(Arc::clone(doc))),
            SessionState::Failed(err) => Some(Err(Arc::clone(err))),
        }
    }
}

impl From<Outcome> for SessionState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Ok(doc) => SessionState::Ready(doc),
            Err(err) => SessionState::Failed(err),
        }
    }
}

/// Runs the bootstrap steps against the overlay and key decoder.
pub struct Bootstrapper {
    overlay: Arc<dyn Overlay>,
    keys: Arc<dyn KeyDecoder>,
}

impl Bootstrapper {
    pub fn new(overlay: Arc<dyn Overlay>, keys: Arc<dyn KeyDecoder>) -> Self {
        Self { overlay, keys }
    }

    /// Run every step once, in order, stopping at the first failure.
    pub async fn bootstrap(&self, identity: &DocumentIdentity) -> Result<Document, BootstrapError> {
        info!("Starting...");
        self.overlay.start().await.map_err(BootstrapError::Join)?;

        let keys = self.keys.decode(identity.access_key())?;

        let collaboration = self
            .overlay
            .collaborate(identity.name(), ReplicaKind::Rga, &keys)
            .await
            .map_err(BootstrapError::Open)?;
        let title_collaboration = self
            .overlay
            .sub(&collaboration, TITLE_SUB, ReplicaKind::Rga)
            .await
            .map_err(BootstrapError::Open)?;

        // Content first: it is the slow one, and a title alone proves nothing.
        info!("Fetching content...");
        let content = await_non_empty(collaboration.shared()).await;
        info!("Fetching title...");
        let title = await_non_empty(title_collaboration.shared()).await;

        Ok(Document {
            title,
            content,
            content_handle: collaboration.shared().clone(),
            title_handle: title_collaboration.shared().clone(),
        })
    }
}

/// The one session of this process.
///
/// Owned by the node and shared with request handlers; the state is
/// read-only for everyone except the bootstrap run.
pub struct Session {
    identity: DocumentIdentity,
    bootstrapper: Bootstrapper,
    outcome: OnceCell<Outcome>,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(identity: DocumentIdentity, bootstrapper: Bootstrapper) -> Self {
        let (state, _) = watch::channel(SessionState::Pending);
        Self {
            identity,
            bootstrapper,
            outcome: OnceCell::new(),
            state,
        }
    }

    /// Document this session serves.
    pub fn identity(&self) -> &DocumentIdentity {
        &self.identity
    }

    /// Current state, without waiting.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Bootstrap the session, or return the cached outcome if that already
    /// happened. Concurrent callers share a single run.
    pub async fn bootstrap(&self) -> Outcome {
        self.outcome
            .get_or_init(|| async {
                let outcome = match self.bootstrapper.bootstrap(&self.identity).await {
                    Ok(doc) => {
                        info!(name = self.identity.name(), "Session ready");
                        Ok(Arc::new(doc))
                    }
                    Err(e) => {
                        error!(name = self.identity.name(), "Session failed: {}", e);
                        Err(Arc::new(e))
                    }
                };
                self.state.send_replace(outcome.clone().into());
                outcome
            })
            .await
            .clone()
    }

    /// Start bootstrapping in the background.
    pub fn spawn_bootstrap(self: &Arc<Self>) -> JoinHandle<Outcome> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.bootstrap().await })
    }

    /// Wait for the terminal outcome without starting a bootstrap.
    pub async fn outcome(&self) -> Outcome {
        let mut rx = self.state.subscribe();
        let outcome = match rx.wait_for(|state| !state.is_pending()).await {
            Ok(state) => state.outcome(),
            Err(_) => None,
        };
        match outcome {
            Some(outcome) => outcome,
            // The sender lives in `self`, so the channel cannot close here.
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{KeyError, OverlayError};
    use crate::keys::Keys;
    use crate::overlay::{Collaboration, MemoryOverlay};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        Start,
        Decode,
        Collaborate,
        Sub,
    }

    /// Records every call and fails at a chosen step.
    struct Scripted {
        inner: MemoryOverlay,
        calls: Arc<Mutex<Vec<Step>>>,
        fail_at: Option<Step>,
    }

    #[async_trait]
    impl Overlay for Scripted {
        async fn start(&self) -> Result<(), OverlayError> {
            self.calls.lock().unwrap().push(Step::Start);
            if self.fail_at == Some(Step::Start) {
                return Err(OverlayError::NoPeers);
            }
            self.inner.start().await
        }

        async fn collaborate(
            &self,
            name: &str,
            kind: ReplicaKind,
            keys: &Keys,
        ) -> Result<Collaboration, OverlayError> {
            self.calls.lock().unwrap().push(Step::Collaborate);
            if self.fail_at == Some(Step::Collaborate) {
                return Err(OverlayError::Protocol("collaborate refused".into()));
            }
            self.inner.collaborate(name, kind, keys).await
        }

        async fn sub(
            &self,
            parent: &Collaboration,
            name: &str,
            kind: ReplicaKind,
        ) -> Result<Collaboration, OverlayError> {
            self.calls.lock().unwrap().push(Step::Sub);
            if self.fail_at == Some(Step::Sub) {
                return Err(OverlayError::Protocol("sub refused".into()));
            }
            self.inner.sub(parent, name, kind).await
        }
    }

    struct ScriptedKeys {
        calls: Arc<Mutex<Vec<Step>>>,
        fail: bool,
    }

    impl KeyDecoder for ScriptedKeys {
        fn decode(&self, _encoded: &str) -> Result<Keys, KeyError> {
            self.calls.lock().unwrap().push(Step::Decode);
            if self.fail {
                return Err(KeyError::Empty);
            }
            Ok(Keys {
                read: vec![1, 2, 3],
            })
        }
    }

    struct Fixture {
        session: Arc<Session>,
        overlay: Arc<Scripted>,
        calls: Arc<Mutex<Vec<Step>>>,
    }

    fn fixture(fail_at: Option<Step>) -> Fixture {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let overlay = Arc::new(Scripted {
            inner: MemoryOverlay::new(),
            calls: Arc::clone(&calls),
            fail_at,
        });
        let keys = Arc::new(ScriptedKeys {
            calls: Arc::clone(&calls),
            fail: fail_at == Some(Step::Decode),
        });
        let identity = DocumentIdentity::new("doc1", "keyABC").unwrap();
        let session = Arc::new(Session::new(
            identity,
            Bootstrapper::new(overlay.clone(), keys),
        ));
        Fixture {
            session,
            overlay,
            calls,
        }
    }

    async fn seed(overlay: &Scripted, content: &str, title: &str) {
        overlay.inner.feed("doc1").await.set(content);
        overlay.inner.feed("doc1/title").await.set(title);
    }

    #[tokio::test]
    async fn steps_run_in_order() {
        let f = fixture(None);
        seed(&f.overlay, "Hello", "Title").await;

        let doc = f.session.bootstrap().await.unwrap();
        assert_eq!(doc.content, "Hello");
        assert_eq!(doc.title, "Title");
        assert_eq!(
            *f.calls.lock().unwrap(),
            vec![Step::Start, Step::Decode, Step::Collaborate, Step::Sub]
        );
        assert!(matches!(f.session.state(), SessionState::Ready(_)));
    }

    #[tokio::test]
    async fn failure_short_circuits_later_steps() {
        let cases = [
            (Step::Start, "failed to join network: no peers reachable"),
            (Step::Decode, "invalid access key: access key is empty"),
            (
                Step::Collaborate,
                "failed to open collaboration: protocol error: collaborate refused",
            ),
            (
                Step::Sub,
                "failed to open collaboration: protocol error: sub refused",
            ),
        ];

        for (step, message) in cases {
            let f = fixture(Some(step));
            seed(&f.overlay, "Hello", "Title").await;

            let err = f.session.bootstrap().await.unwrap_err();
            assert_eq!(err.to_string(), message);

            let calls = f.calls.lock().unwrap().clone();
            assert_eq!(calls.last(), Some(&step), "stopped at {:?}", step);
            assert!(matches!(f.session.state(), SessionState::Failed(_)));
        }
    }

    #[tokio::test]
    async fn bootstrap_runs_once() {
        let f = fixture(None);
        seed(&f.overlay, "Hello", "Title").await;

        let first = f.session.bootstrap().await.unwrap();
        let second = f.session.bootstrap().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = f.overlay.inner.stats();
        assert_eq!(stats.starts, 1);
        assert_eq!(stats.collaborations, 1);
        assert_eq!(stats.subs, 1);
    }

    #[tokio::test]
    async fn failure_is_cached() {
        let f = fixture(Some(Step::Start));
        let first = f.session.bootstrap().await.unwrap_err();
        let second = f.session.bootstrap().await.unwrap_err();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(f.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn content_is_awaited_before_title() {
        let f = fixture(None);
        // Title already there, body still empty.
        f.overlay.inner.feed("doc1/title").await.set("Title");

        let task = f.session.spawn_bootstrap();
        let content = f.overlay.inner.feed("doc1").await.handle();
        while content.listener_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(f.session.state().is_pending());
        assert!(!task.is_finished());

        f.overlay.inner.feed("doc1").await.set("Body");
        let doc = task.await.unwrap().unwrap();
        assert_eq!(doc.content, "Body");
        assert_eq!(doc.title, "Title");
    }

    #[tokio::test]
    async fn outcome_waits_for_bootstrap() {
        let f = fixture(None);

        let waiter = {
            let session = Arc::clone(&f.session);
            tokio::spawn(async move { session.outcome().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        f.session.spawn_bootstrap();
        seed(&f.overlay, "Hello", "Title").await;

        let doc = waiter.await.unwrap().unwrap();
        assert_eq!(doc.content, "Hello");
    }
}
