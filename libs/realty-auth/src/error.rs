use thiserror::Error;

/// Errors returned by session refresh and teardown.
///
/// No variant ever carries the credential itself.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// There is no session to refresh or tear down.
    #[error("no active session")]
    Unauthenticated,

    /// The session has no refresh backend configured.
    #[error("session refresh is not configured")]
    RefreshUnavailable,

    /// Transport or status failure talking to the session endpoint.
    ///
    /// The string comes from [`format_http_error`](crate::format_http_error).
    #[error("{0}")]
    Http(String),

    /// The backend answered but refused to renew the session.
    #[error("session refresh rejected: {0}")]
    Rejected(String),

    /// The refresh endpoint returned an unparseable or incomplete response.
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    /// Backend configuration is invalid.
    #[error("session config error: {0}")]
    Config(String),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn messages_render() {
        assert_eq!(SessionError::Unauthenticated.to_string(), "no active session");
        assert_eq!(
            SessionError::Rejected("success=false".into()).to_string(),
            "session refresh rejected: success=false"
        );
        assert_eq!(
            SessionError::InvalidResponse("missing credential".into()).to_string(),
            "invalid refresh response: missing credential"
        );
        assert_eq!(
            SessionError::Http("session refresh HTTP 401 Unauthorized".into()).to_string(),
            "session refresh HTTP 401 Unauthorized"
        );
    }
}
