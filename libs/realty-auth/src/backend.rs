use async_trait::async_trait;

use crate::error::SessionError;
use crate::secret::SecretString;
use crate::session::Session;

/// Remote side of a session: exchanges an expiring session for a new
/// credential and signs it out.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// # Errors
    /// Returns [`SessionError`] if the backend cannot renew the session.
    async fn refresh(&self, session: &Session) -> Result<SecretString, SessionError>;

    /// # Errors
    /// Returns [`SessionError`] if the sign-out call fails.
    async fn logout(&self, session: &Session) -> Result<(), SessionError>;
}
