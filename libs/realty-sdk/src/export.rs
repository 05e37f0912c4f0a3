use std::sync::{Arc, LazyLock};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use realty_auth::SessionHandle;
use realty_http::{HeaderMap, header};
use realty_query::{GridQuery, encode_query};
use regex::Regex;

use crate::auth_flow::{self, FlowOutcome, RetryPolicy};
use crate::error::ApiError;
use crate::executor::{ApiRequest, Representation, RequestExecutor};

/// File name used when the response carries no usable `content-disposition`.
pub const DEFAULT_EXPORT_FILENAME: &str = "export.xlsx";

/// Plain `filename=` parameter only. The RFC 5987 `filename*=` form is
/// skipped; servers that send it also send a plain fallback.
#[allow(clippy::expect_used)] // static pattern
static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*"?([^";]+)"?"#)
        .expect("static regex should not panic")
});

/// A downloaded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Never empty.
    pub filename: String,
    /// Standard base64 of the file bytes.
    pub payload: String,
}

impl ExportFile {
    /// Decode the payload back into bytes.
    ///
    /// # Errors
    /// Returns the decode error if `payload` is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.payload)
    }
}

/// Filename from a `content-disposition` header, if one can be found.
#[must_use]
pub fn filename_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::CONTENT_DISPOSITION)?.to_str().ok()?;
    FILENAME_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|name| !name.is_empty())
}

/// Client for binary export endpoints.
///
/// Same query encoding and refresh-and-retry as [`GridClient`](crate::GridClient),
/// but failures are returned, never turned into an empty file.
#[derive(Clone)]
pub struct ExportClient {
    executor: Arc<dyn RequestExecutor>,
    session: Arc<dyn SessionHandle>,
}

impl std::fmt::Debug for ExportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportClient").finish_non_exhaustive()
    }
}

impl ExportClient {
    #[must_use]
    pub fn new(executor: Arc<dyn RequestExecutor>, session: Arc<dyn SessionHandle>) -> Self {
        Self { executor, session }
    }

    /// Download an export for `query`.
    ///
    /// # Errors
    /// - [`ApiError::InvalidQuery`] if the query cannot be encoded (nothing sent)
    /// - [`ApiError::Unauthenticated`] when there is no session
    /// - [`ApiError::AuthExpired`] when the refresh failed or the retry was
    ///   rejected again
    /// - [`ApiError::Validation`] / [`ApiError::ServerFault`] /
    ///   [`ApiError::Transport`] for the other failures
    pub async fn export_binary(
        &self,
        endpoint: &str,
        query: &GridQuery,
    ) -> Result<ExportFile, ApiError> {
        let request = ApiRequest::get(endpoint)
            .with_query(encode_query(query)?)
            .with_representation(Representation::Binary);
        let executor = &self.executor;
        let request = &request;

        let flow = auth_flow::run(
            self.session.as_ref(),
            RetryPolicy::RetryOnce,
            endpoint,
            |credential| async move { executor.execute(request, &credential).await },
        )
        .await;

        let payload = match flow {
            FlowOutcome::Completed { outcome, .. } => outcome.into_result()?,
            FlowOutcome::RefreshFailed(_) | FlowOutcome::Renewed => {
                return Err(ApiError::AuthExpired { renewed: false });
            }
            FlowOutcome::Unauthenticated => return Err(ApiError::Unauthenticated),
        };

        let filename = filename_from_headers(&payload.headers)
            .unwrap_or_else(|| DEFAULT_EXPORT_FILENAME.to_owned());
        tracing::debug!(endpoint, %filename, bytes = payload.body.len(), "export downloaded");

        Ok(ExportFile {
            filename,
            payload: STANDARD.encode(&payload.body),
        })
    }
}
