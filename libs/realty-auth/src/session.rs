use async_trait::async_trait;

use crate::error::SessionError;
use crate::secret::SecretString;

/// An authenticated session: the bearer credential plus the id of the user it
/// was issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub credential: SecretString,
    pub user_id: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(credential: impl Into<SecretString>) -> Self {
        Self {
            credential: credential.into(),
            user_id: None,
        }
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Same user, renewed credential.
    #[must_use]
    pub fn renewed(&self, credential: SecretString) -> Self {
        Self {
            credential,
            user_id: self.user_id.clone(),
        }
    }
}

/// Access to the current session, injected into every client.
///
/// Clients read the credential once per call and never cache it, so a
/// refresh done by one call is visible to the next. `refresh` and `teardown`
/// are the only operations that change session state.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Current bearer credential, `None` when signed out.
    fn credential(&self) -> Option<SecretString>;

    fn user_id(&self) -> Option<String>;

    /// Renew the session and return the new credential.
    ///
    /// # Errors
    /// Any [`SessionError`] means the session could not be renewed.
    async fn refresh(&self) -> Result<SecretString, SessionError>;

    /// End the session (sign out). Callers log failures and carry on.
    ///
    /// # Errors
    /// Returns the backend failure; local state is cleared regardless.
    async fn teardown(&self) -> Result<(), SessionError>;
}
