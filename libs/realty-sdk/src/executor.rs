use async_trait::async_trait;
use realty_auth::SecretString;
use realty_http::{Form, HttpClient, HttpError, Method, RequestBuilder, header};
use realty_query::EncodedQuery;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::outcome::RequestOutcome;

/// Which representation the caller wants back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Representation {
    #[default]
    Json,
    /// Raw bytes, e.g. a spreadsheet export.
    Binary,
}

impl Representation {
    fn accept(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Binary => "application/octet-stream, */*",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// The encoder supplies `multipart/form-data; boundary=...`.
    Multipart(Form),
}

/// One call to the backend, minus the credential.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Endpoint path relative to the API root.
    pub path: String,
    pub query: EncodedQuery,
    pub body: RequestBody,
    pub representation: Representation,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: EncodedQuery::default(),
            body: RequestBody::Empty,
            representation: Representation::Json,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn with_query(mut self, query: EncodedQuery) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }
}

/// Sends one authenticated request and classifies what came back.
///
/// Implementations never retry and never touch the session.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: &ApiRequest, credential: &SecretString) -> RequestOutcome;
}

/// [`RequestExecutor`] over [`realty_http::HttpClient`].
#[derive(Clone)]
pub struct HttpExecutor {
    client: HttpClient,
    config: ApiConfig,
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("base_url", &self.config.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpExecutor {
    #[must_use]
    pub fn new(client: HttpClient, config: ApiConfig) -> Self {
        Self { client, config }
    }

    /// Build the transport from `config`.
    ///
    /// # Errors
    /// Returns [`HttpError`] if the HTTP client cannot be built (TLS roots,
    /// invalid user agent).
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; the client spawns its
    /// request worker on construction.
    pub fn from_config(config: ApiConfig) -> Result<Self, HttpError> {
        let client =
            realty_http::HttpClientBuilder::with_config(config.http_client_config()).build()?;
        Ok(Self::new(client, config))
    }

    /// Resolve the URL and encode the body. Nothing is sent.
    fn prepare(
        &self,
        request: &ApiRequest,
        credential: &SecretString,
    ) -> Result<RequestBuilder, HttpError> {
        let mut url = self
            .config
            .endpoint_url(&request.path)
            .map_err(|e| HttpError::InvalidUri {
                url: request.path.clone(),
                kind: realty_http::InvalidUriKind::ParseError,
                reason: e.to_string(),
            })?;
        request.query.apply_to(&mut url);

        let builder = self
            .client
            .request(request.method.clone(), url.as_str())
            .bearer_auth(credential.expose())
            .header(header::ACCEPT.as_str(), request.representation.accept());

        match &request.body {
            RequestBody::Empty => Ok(builder),
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(form),
        }
    }

    async fn send(
        &self,
        request: &ApiRequest,
        credential: &SecretString,
    ) -> Result<RequestOutcome, HttpError> {
        let builder = self.prepare(request, credential)?;
        let (status, headers, body) = builder.send().await?.into_parts().await?;
        Ok(RequestOutcome::classify(status, headers, body))
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: &ApiRequest, credential: &SecretString) -> RequestOutcome {
        let outcome = match self.send(request, credential).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_request_error() => RequestOutcome::InvalidRequest(e),
            Err(e) => RequestOutcome::NetworkFailure(e),
        };
        tracing::debug!(
            method = %request.method,
            endpoint = %request.path,
            outcome = outcome.label(),
            "request completed"
        );
        outcome
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use realty_http::{Part, StatusCode};
    use realty_query::{GridQuery, encode_query};
    use serde_json::json;
    use url::Url;

    fn executor(server: &MockServer) -> HttpExecutor {
        let mut config = ApiConfig::new(Url::parse(&server.base_url()).unwrap());
        config.allow_insecure_http = true;
        HttpExecutor::from_config(config).unwrap()
    }

    fn token() -> SecretString {
        SecretString::new("tok-1")
    }

    #[tokio::test]
    async fn sends_bearer_query_and_accept() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/properties")
                .header("authorization", "Bearer tok-1")
                .header("accept", "application/json")
                .query_param("page", "1")
                .query_param("filters", "city-Santiago");
            then.status(200).json_body(json!([{"id": 1}]));
        });

        let query = GridQuery::builder().filter("city", "Santiago").page(1).build();
        let request = ApiRequest::get("/properties").with_query(encode_query(&query).unwrap());

        match executor(&server).execute(&request, &token()).await {
            RequestOutcome::Ok(payload) => {
                assert_eq!(payload.status, StatusCode::OK);
                let rows: Value = serde_json::from_slice(&payload.body).unwrap();
                assert_eq!(rows, json!([{"id": 1}]));
            }
            other => panic!("expected Ok, got {}", other.label()),
        }
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn classifies_statuses() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.path("/expired");
            then.status(401).json_body(json!({"message": "jwt expired"}));
        });
        server.mock(|when, then| {
            when.path("/invalid");
            then.status(400)
                .json_body(json!({"message": ["title is required", "price must be positive"]}));
        });
        server.mock(|when, then| {
            when.path("/broken");
            then.status(500).body("stack trace");
        });

        let exec = executor(&server);
        assert!(matches!(
            exec.execute(&ApiRequest::get("/expired"), &token()).await,
            RequestOutcome::Unauthorized
        ));
        match exec.execute(&ApiRequest::get("/invalid"), &token()).await {
            RequestOutcome::ClientError { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "title is required, price must be positive");
            }
            other => panic!("expected ClientError, got {}", other.label()),
        }
        match exec.execute(&ApiRequest::get("/broken"), &token()).await {
            RequestOutcome::ServerError { message, .. } => assert_eq!(message, "Error 500"),
            other => panic!("expected ServerError, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn json_body_sets_content_type() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/properties")
                .header("content-type", "application/json")
                .json_body(json!({"title": "Casa"}));
            then.status(201).json_body(json!({"id": 9}));
        });

        let request = ApiRequest::new(realty_http::Method::POST, "/properties")
            .with_body(RequestBody::Json(json!({"title": "Casa"})));
        assert!(matches!(
            executor(&server).execute(&request, &token()).await,
            RequestOutcome::Ok(_)
        ));
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn multipart_body_uses_form_boundary() {
        let server = MockServer::start();
        let form = Form::new()
            .text("title", "Casa")
            .part("photo", Part::bytes(&b"\x89PNG"[..]).file_name("a.png"));
        let boundary = form.boundary().to_owned();
        let mock = server.mock(move |when, then| {
            when.method(POST)
                .path("/properties")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body_includes("name=\"title\"")
                .body_includes("filename=\"a.png\"");
            then.status(201).json_body(json!({"id": 1}));
        });

        let request = ApiRequest::new(realty_http::Method::POST, "/properties")
            .with_body(RequestBody::Multipart(form));
        assert!(matches!(
            executor(&server).execute(&request, &token()).await,
            RequestOutcome::Ok(_)
        ));
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn binary_representation_changes_accept() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.path("/export")
                .header("accept", "application/octet-stream, */*");
            then.status(200).body("PK\u{3}\u{4}");
        });

        let request = ApiRequest::get("/export").with_representation(Representation::Binary);
        assert!(matches!(
            executor(&server).execute(&request, &token()).await,
            RequestOutcome::Ok(_)
        ));
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn unencodable_form_is_invalid_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/properties");
            then.status(201);
        });

        let form = Form::new().text("na\"me", "Ana");
        let request = ApiRequest::new(realty_http::Method::POST, "/properties")
            .with_body(RequestBody::Multipart(form));

        match executor(&server).execute(&request, &token()).await {
            RequestOutcome::InvalidRequest(err) => assert!(err.is_request_error()),
            other => panic!("expected InvalidRequest, got {}", other.label()),
        }
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn unreachable_host_is_network_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = ApiConfig::new(Url::parse(&format!("http://127.0.0.1:{port}")).unwrap());
        config.allow_insecure_http = true;
        let exec = HttpExecutor::from_config(config).unwrap();

        assert!(matches!(
            exec.execute(&ApiRequest::get("/properties"), &token()).await,
            RequestOutcome::NetworkFailure(_)
        ));
    }
}
