use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;

use crate::backend::SessionBackend;
use crate::error::SessionError;
use crate::secret::SecretString;
use crate::session::{Session, SessionHandle};

/// In-memory [`SessionHandle`] backed by an optional [`SessionBackend`].
///
/// The session lives in an `ArcSwapOption`, so reads are lock-free and a
/// refresh replaces it atomically. No lock is held across the backend call.
/// Concurrent refreshes are not coalesced: each caller that sees a 401 runs
/// its own refresh and the last one to finish wins.
#[derive(Clone)]
pub struct SessionStore {
    current: Arc<ArcSwapOption<Session>>,
    backend: Option<Arc<dyn SessionBackend>>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("signed_in", &self.is_signed_in())
            .field("has_backend", &self.backend.is_some())
            .finish()
    }
}

impl SessionStore {
    /// A store holding `session` that can refresh and sign out through `backend`.
    #[must_use]
    pub fn new(session: Session, backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            current: Arc::new(ArcSwapOption::from_pointee(session)),
            backend: Some(backend),
        }
    }

    /// A store with a fixed session; `refresh` always fails.
    #[must_use]
    pub fn without_backend(session: Session) -> Self {
        Self {
            current: Arc::new(ArcSwapOption::from_pointee(session)),
            backend: None,
        }
    }

    /// A signed-out store.
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            current: Arc::new(ArcSwapOption::empty()),
            backend: None,
        }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.current.load().is_some()
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Option<Arc<Session>> {
        self.current.load_full()
    }

    /// Replace the current session, e.g. after an interactive sign-in.
    pub fn replace(&self, session: Session) {
        self.current.store(Some(Arc::new(session)));
    }
}

#[async_trait]
impl SessionHandle for SessionStore {
    fn credential(&self) -> Option<SecretString> {
        self.current.load().as_ref().map(|s| s.credential.clone())
    }

    fn user_id(&self) -> Option<String> {
        self.current.load().as_ref().and_then(|s| s.user_id.clone())
    }

    async fn refresh(&self) -> Result<SecretString, SessionError> {
        let Some(session) = self.current.load_full() else {
            return Err(SessionError::Unauthenticated);
        };
        let Some(backend) = &self.backend else {
            return Err(SessionError::RefreshUnavailable);
        };

        let credential = backend.refresh(&session).await?;
        self.current
            .store(Some(Arc::new(session.renewed(credential.clone()))));
        tracing::debug!(user_id = ?session.user_id, "session credential renewed");
        Ok(credential)
    }

    async fn teardown(&self) -> Result<(), SessionError> {
        let Some(session) = self.current.swap(None) else {
            return Ok(());
        };
        tracing::info!(user_id = ?session.user_id, "session ended");
        match &self.backend {
            Some(backend) => backend.logout(&session).await,
            None => Ok(()),
        }
    }
}
