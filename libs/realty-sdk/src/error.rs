use realty_http::StatusCode;
use realty_query::QueryError;
use thiserror::Error;

/// Plain tag of an [`ApiError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    AuthExpired,
    Validation,
    ServerFault,
    Transport,
    MalformedResponse,
    InvalidQuery,
    InvalidRequest,
}

/// Errors returned by mutations and exports. Grid reads never return one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// No credential at all; nothing was sent.
    #[error("not signed in")]
    Unauthenticated,

    /// The backend answered 401. `renewed` says whether the one refresh
    /// attempt got a fresh credential (the operation itself was not retried).
    #[error("{}", auth_expired_message(.renewed))]
    AuthExpired { renewed: bool },

    /// 4xx other than 401.
    #[error("{message}")]
    Validation { status: StatusCode, message: String },

    /// 5xx, or a status the executor does not treat as a response.
    #[error("{message}")]
    ServerFault { status: StatusCode, message: String },

    /// No response: connection, TLS, timeout or body limit failure.
    #[error("network error: {message}")]
    Transport { message: String },

    /// 2xx whose body is not what the endpoint promises.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// The query could not be encoded; nothing was sent.
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    /// The request (URL or body) could not be built; nothing was sent.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

// thiserror hands fields to format args by reference
#[allow(clippy::trivially_copy_pass_by_ref)]
fn auth_expired_message(renewed: &bool) -> &'static str {
    if *renewed {
        "session expired and was renewed; retry the operation"
    } else {
        "session expired; sign in again"
    }
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::AuthExpired { .. } => ErrorKind::AuthExpired,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::ServerFault { .. } => ErrorKind::ServerFault,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP status for errors that came from a response.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Validation { status, .. } | Self::ServerFault { status, .. } => Some(*status),
            Self::AuthExpired { .. } => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }
}
