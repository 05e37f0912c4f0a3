use bytes::Bytes;
use realty_http::{HeaderMap, HttpError, StatusCode};
use serde_json::Value;

use crate::error::ApiError;

/// A 2xx response, body unparsed.
#[derive(Debug, Clone)]
pub struct ResponsePayload {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Classified result of one request. Clients branch on the variant only.
#[derive(Debug)]
pub enum RequestOutcome {
    Ok(ResponsePayload),
    /// 401, whatever the body says.
    Unauthorized,
    ClientError { status: StatusCode, message: String },
    ServerError { status: StatusCode, message: String },
    /// No response was received.
    NetworkFailure(HttpError),
    /// The request could not be built locally. Nothing reached the wire.
    InvalidRequest(HttpError),
}

impl RequestOutcome {
    /// Classify a received response.
    ///
    /// Statuses outside 2xx/4xx/5xx (a 3xx the transport did not follow, a
    /// stray 1xx) count as server errors.
    #[must_use]
    pub fn classify(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        if status.is_success() {
            return Self::Ok(ResponsePayload {
                status,
                headers,
                body,
            });
        }
        if status == StatusCode::UNAUTHORIZED {
            return Self::Unauthorized;
        }
        let message = extract_message(status, &body);
        if status.is_client_error() {
            Self::ClientError { status, message }
        } else {
            Self::ServerError { status, message }
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::Unauthorized => "unauthorized",
            Self::ClientError { .. } => "client_error",
            Self::ServerError { .. } => "server_error",
            Self::NetworkFailure(_) => "network_failure",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Map failures onto the caller-facing taxonomy.
    ///
    /// # Errors
    /// Every variant except `Ok` becomes an [`ApiError`]. `Unauthorized`
    /// becomes `AuthExpired { renewed: false }`.
    pub fn into_result(self) -> Result<ResponsePayload, ApiError> {
        match self {
            Self::Ok(payload) => Ok(payload),
            Self::Unauthorized => Err(ApiError::AuthExpired { renewed: false }),
            Self::ClientError { status, message } => Err(ApiError::Validation { status, message }),
            Self::ServerError { status, message } => Err(ApiError::ServerFault { status, message }),
            Self::NetworkFailure(e) => Err(ApiError::Transport {
                message: e.to_string(),
            }),
            Self::InvalidRequest(e) => Err(ApiError::InvalidRequest {
                message: e.to_string(),
            }),
        }
    }
}

/// Human-readable message from an error body.
///
/// Uses the JSON `message` field (a string, or an array of strings joined
/// with `", "`), then `error`, then falls back to `Error <status>`.
#[must_use]
pub fn extract_message(status: StatusCode, body: &[u8]) -> String {
    let parsed = serde_json::from_slice::<Value>(body).ok();
    parsed
        .as_ref()
        .and_then(|doc| message_field(doc, "message").or_else(|| message_field(doc, "error")))
        .unwrap_or_else(|| format!("Error {}", status.as_u16()))
}

fn message_field(doc: &Value, key: &str) -> Option<String> {
    let text = match doc.get(key)? {
        Value::String(s) => s.trim().to_owned(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
