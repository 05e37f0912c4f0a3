use std::time::Duration;

use thiserror::Error;

/// Why an endpoint URL was refused before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// Not a URL at all.
    ParseError,
    /// No host, e.g. `https:///properties`.
    MissingAuthority,
    /// Relative path handed to the client without a base URL.
    MissingScheme,
}

/// Everything that can go wrong between building a request and holding
/// its buffered response.
///
/// Variants split into two families. Request errors (see
/// [`HttpError::is_request_error`]) are raised locally and nothing reaches
/// the wire. The rest happen while talking to the API.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    #[error("cannot assemble request: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("bad header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Usually a credential with control characters in it.
    #[error("bad header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Connection refused, reset, DNS failure and the like.
    #[error("connection failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("TLS setup failed: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The body ran past `max_body_size`. Exports hit this first, since
    /// spreadsheets are buffered whole; session endpoints use a much
    /// smaller cap.
    #[error("response body of {actual} bytes exceeds the {limit} byte cap")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Non-2xx reply kept as data for callers that did not opt into
    /// reading error bodies themselves.
    #[error("HTTP {status}: {body_preview}")]
    HttpStatus {
        status: http::StatusCode,
        body_preview: String,
        content_type: Option<String>,
    },

    /// Encoding a JSON payload or decoding a JSON reply.
    #[error("JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// A form field or file name that cannot go into a
    /// `Content-Disposition` line.
    #[error("multipart form rejected: {0}")]
    Multipart(String),

    /// Too many requests already queued in this client.
    #[error("client busy: in-flight request limit reached")]
    Overloaded,

    /// The client's worker task is gone; the client must be rebuilt.
    #[error("client shut down")]
    ServiceClosed,

    /// `reason` is for logs; match on `kind`.
    #[error("bad URL '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    /// `http://` without the insecure opt-in, or a non-HTTP scheme.
    #[error("scheme '{scheme}' refused: {reason}")]
    InvalidScheme { scheme: String, reason: String },
}

impl HttpError {
    /// True when the request was refused while being built, so the API
    /// never saw it. Retrying or refreshing the session cannot help.
    #[must_use]
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::RequestBuild(_)
                | Self::InvalidHeaderName(_)
                | Self::InvalidHeaderValue(_)
                | Self::Json(_)
                | Self::Multipart(_)
                | Self::InvalidUri { .. }
                | Self::InvalidScheme { .. }
        )
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}
