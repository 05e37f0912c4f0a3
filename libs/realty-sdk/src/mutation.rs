use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use mime::Mime;
use realty_auth::SessionHandle;
use realty_http::{Form, Method, Part};
use serde_json::Value;

use crate::auth_flow::{self, FlowOutcome, RetryPolicy};
use crate::error::ApiError;
use crate::executor::{ApiRequest, RequestBody, RequestExecutor};

/// Field name used for a non-object payload sent alongside attachments.
pub const PAYLOAD_FIELD: &str = "payload";

/// A file sent with a mutation.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Form field the file is sent under.
    pub field: String,
    pub file_name: String,
    pub content_type: Mime,
    pub bytes: Bytes,
}

impl Attachment {
    /// Content type is guessed from the file name's extension.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            field: field.into(),
            content_type: guess_mime(&file_name),
            file_name,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = content_type;
        self
    }

    /// Read `path` into an attachment named after the file.
    ///
    /// # Errors
    /// Returns the I/O error if the file cannot be read.
    pub async fn from_path(
        field: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "file".to_owned(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(field, file_name, bytes))
    }
}

fn guess_mime(file_name: &str) -> Mime {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        "pdf" => mime::APPLICATION_PDF,
        "json" => mime::APPLICATION_JSON,
        "csv" => mime::TEXT_CSV,
        "txt" => mime::TEXT_PLAIN,
        "webp" => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Build the request body: multipart when there are attachments, JSON
/// otherwise.
///
/// In multipart mode every non-null field of an object payload becomes a
/// text part (strings verbatim, anything else as compact JSON), followed by
/// one file part per attachment.
fn build_body(payload: &Value, attachments: &[Attachment]) -> RequestBody {
    if attachments.is_empty() {
        return match payload {
            Value::Null => RequestBody::Empty,
            other => RequestBody::Json(other.clone()),
        };
    }

    let mut form = Form::new();
    match payload {
        Value::Null => {}
        Value::Object(fields) => {
            for (name, value) in fields {
                match value {
                    Value::Null => {}
                    Value::String(s) => form = form.text(name.as_str(), s.as_str()),
                    other => form = form.text(name.as_str(), other.to_string()),
                }
            }
        }
        other => form = form.text(PAYLOAD_FIELD, other.to_string()),
    }
    for attachment in attachments {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.as_str())
            .mime(attachment.content_type.clone());
        form = form.part(attachment.field.as_str(), part);
    }
    RequestBody::Multipart(form)
}

/// Write client for create/update/delete endpoints.
///
/// Writes are never re-sent. On a 401 the session is refreshed once (and
/// torn down if that fails) and the call returns [`ApiError::AuthExpired`],
/// leaving the decision to retry with the caller.
#[derive(Clone)]
pub struct MutationClient {
    executor: Arc<dyn RequestExecutor>,
    session: Arc<dyn SessionHandle>,
}

impl std::fmt::Debug for MutationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationClient").finish_non_exhaustive()
    }
}

impl MutationClient {
    #[must_use]
    pub fn new(executor: Arc<dyn RequestExecutor>, session: Arc<dyn SessionHandle>) -> Self {
        Self { executor, session }
    }

    /// Send one write.
    ///
    /// Returns the parsed response document, or `Value::Null` for an empty
    /// 2xx body.
    ///
    /// # Errors
    /// - [`ApiError::InvalidRequest`] when a form field or file name cannot
    ///   be encoded; checked before the session is consulted
    /// - [`ApiError::Unauthenticated`] when there is no session
    /// - [`ApiError::AuthExpired`] on 401, whether or not the refresh worked
    /// - [`ApiError::Validation`] / [`ApiError::ServerFault`] for 4xx / 5xx
    /// - [`ApiError::Transport`] when no response arrived
    /// - [`ApiError::MalformedResponse`] for a 2xx body that is not JSON
    pub async fn mutate(
        &self,
        endpoint: &str,
        method: Method,
        payload: &Value,
        attachments: &[Attachment],
    ) -> Result<Value, ApiError> {
        let body = build_body(payload, attachments);
        if let RequestBody::Multipart(form) = &body {
            form.validate().map_err(|e| ApiError::InvalidRequest {
                message: e.to_string(),
            })?;
        }
        let request = ApiRequest::new(method, endpoint).with_body(body);
        let executor = &self.executor;
        let request = &request;

        let flow = auth_flow::run(
            self.session.as_ref(),
            RetryPolicy::RefreshOnly,
            endpoint,
            |credential| async move { executor.execute(request, &credential).await },
        )
        .await;

        let payload = match flow {
            FlowOutcome::Completed { outcome, .. } => outcome.into_result()?,
            FlowOutcome::Renewed => {
                tracing::info!(endpoint, "session renewed after 401; write not re-sent");
                return Err(ApiError::AuthExpired { renewed: true });
            }
            FlowOutcome::RefreshFailed(_) => return Err(ApiError::AuthExpired { renewed: false }),
            FlowOutcome::Unauthenticated => return Err(ApiError::Unauthenticated),
        };

        if payload.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&payload.body).map_err(|e| ApiError::MalformedResponse {
            message: e.to_string(),
        })
    }

    /// `POST` a new resource.
    ///
    /// # Errors
    /// See [`mutate`](Self::mutate).
    pub async fn create(
        &self,
        endpoint: &str,
        payload: &Value,
        attachments: &[Attachment],
    ) -> Result<Value, ApiError> {
        self.mutate(endpoint, Method::POST, payload, attachments).await
    }

    /// `PATCH` an existing resource.
    ///
    /// # Errors
    /// See [`mutate`](Self::mutate).
    pub async fn update(
        &self,
        endpoint: &str,
        payload: &Value,
        attachments: &[Attachment],
    ) -> Result<Value, ApiError> {
        self.mutate(endpoint, Method::PATCH, payload, attachments).await
    }

    /// `PUT` a full replacement.
    ///
    /// # Errors
    /// See [`mutate`](Self::mutate).
    pub async fn replace(
        &self,
        endpoint: &str,
        payload: &Value,
        attachments: &[Attachment],
    ) -> Result<Value, ApiError> {
        self.mutate(endpoint, Method::PUT, payload, attachments).await
    }

    /// # Errors
    /// See [`mutate`](Self::mutate).
    pub async fn delete(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.mutate(endpoint, Method::DELETE, &Value::Null, &[]).await
    }
}
