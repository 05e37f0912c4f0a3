use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::SessionBackend;
use crate::error::SessionError;
use crate::http_error::format_http_error;
use crate::secret::SecretString;
use crate::session::Session;

/// Default path of the credential refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Configuration for [`HttpSessionBackend`].
#[derive(Debug, Clone)]
pub struct HttpSessionBackendConfig {
    /// API root; endpoint paths are resolved against it.
    pub base_url: Url,
    pub refresh_path: String,
    /// Sign-out endpoint. `None` means teardown is local only.
    pub logout_path: Option<String>,
    /// Transport settings. Defaults to [`realty_http::HttpClientConfig::session_endpoint`].
    pub http_config: Option<realty_http::HttpClientConfig>,
}

impl HttpSessionBackendConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            refresh_path: DEFAULT_REFRESH_PATH.to_owned(),
            logout_path: None,
            http_config: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default, alias = "token", alias = "accessToken")]
    credential: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// [`SessionBackend`] that renews and ends sessions over HTTP.
///
/// Refresh is `POST <refresh_path>` carrying the current bearer and
/// `{"userId": ...}`; the response must be 2xx with a non-empty `credential`
/// (or `token` / `accessToken`) and must not say `"success": false`.
/// Logout is `POST <logout_path>` with the bearer.
pub struct HttpSessionBackend {
    client: realty_http::HttpClient,
    refresh_url: Url,
    logout_url: Option<Url>,
}

impl std::fmt::Debug for HttpSessionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSessionBackend")
            .field("refresh_url", &self.refresh_url.as_str())
            .field("logout_url", &self.logout_url.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

impl HttpSessionBackend {
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if an endpoint path does not resolve
    /// against the base URL, or [`SessionError::Http`] if the HTTP client
    /// fails to build.
    ///
    /// # Panics
    /// Panics outside a Tokio runtime (see
    /// [`realty_http::HttpClientBuilder::build`]).
    pub fn new(config: HttpSessionBackendConfig) -> Result<Self, SessionError> {
        let refresh_url = resolve(&config.base_url, &config.refresh_path)?;
        let logout_url = config
            .logout_path
            .as_deref()
            .map(|path| resolve(&config.base_url, path))
            .transpose()?;

        let http_config = config
            .http_config
            .unwrap_or_else(realty_http::HttpClientConfig::session_endpoint);
        let client = realty_http::HttpClientBuilder::with_config(http_config)
            .build()
            .map_err(|e| SessionError::Http(format_http_error(&e, "session client")))?;

        Ok(Self {
            client,
            refresh_url,
            logout_url,
        })
    }
}

/// Resolve `path` under `base`, keeping any path prefix `base` already has.
fn resolve(base: &Url, path: &str) -> Result<Url, SessionError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| SessionError::Config(format!("invalid endpoint path '{path}': {e}")))
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn refresh(&self, session: &Session) -> Result<SecretString, SessionError> {
        let body = RefreshRequest {
            user_id: session.user_id.as_deref(),
        };

        let response = self
            .client
            .post(self.refresh_url.as_str())
            .bearer_auth(session.credential.expose())
            .json(&body)
            .map_err(|e| SessionError::Http(format_http_error(&e, "session refresh")))?
            .send()
            .await
            .map_err(|e| SessionError::Http(format_http_error(&e, "session refresh")))?;

        let parsed: RefreshResponse = response.json().await.map_err(|e| match e {
            realty_http::HttpError::Json(err) => SessionError::InvalidResponse(err.to_string()),
            other => SessionError::Http(format_http_error(&other, "session refresh")),
        })?;

        if parsed.success == Some(false) {
            return Err(SessionError::Rejected(
                parsed
                    .message
                    .unwrap_or_else(|| "backend reported success=false".to_owned()),
            ));
        }

        match parsed.credential {
            Some(credential) if !credential.is_empty() => Ok(SecretString::new(credential)),
            _ => Err(SessionError::InvalidResponse(
                "missing credential in refresh response".to_owned(),
            )),
        }
    }

    async fn logout(&self, session: &Session) -> Result<(), SessionError> {
        let Some(url) = &self.logout_url else {
            return Ok(());
        };

        self.client
            .post(url.as_str())
            .bearer_auth(session.credential.expose())
            .send()
            .await
            .map_err(|e| SessionError::Http(format_http_error(&e, "session logout")))?
            .checked_bytes()
            .await
            .map_err(|e| SessionError::Http(format_http_error(&e, "session logout")))?;
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn backend(server: &MockServer, logout: bool) -> HttpSessionBackend {
        let mut config = HttpSessionBackendConfig::new(Url::parse(&server.base_url()).unwrap());
        if logout {
            config.logout_path = Some("/auth/logout".into());
        }
        config.http_config = Some(realty_http::HttpClientConfig::for_testing());
        HttpSessionBackend::new(config).unwrap()
    }

    fn session() -> Session {
        Session::new("old-token").with_user_id("u-42")
    }

    #[test]
    fn resolve_keeps_base_prefix() {
        let base = Url::parse("https://api.example.com/v1").unwrap();
        assert_eq!(
            resolve(&base, "/auth/refresh").unwrap().as_str(),
            "https://api.example.com/v1/auth/refresh"
        );
        let base = Url::parse("https://api.example.com/").unwrap();
        assert_eq!(
            resolve(&base, "auth/refresh").unwrap().as_str(),
            "https://api.example.com/auth/refresh"
        );
    }

    #[tokio::test]
    async fn refresh_posts_user_id_with_bearer() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/refresh")
                .header("authorization", "Bearer old-token")
                .json_body(json!({"userId": "u-42"}));
            then.status(200)
                .json_body(json!({"success": true, "credential": "new-token"}));
        });

        let fresh = backend(&server, false).refresh(&session()).await.unwrap();
        assert_eq!(fresh.expose(), "new-token");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn refresh_accepts_token_alias() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).json_body(json!({"accessToken": "aliased"}));
        });

        let fresh = backend(&server, false).refresh(&session()).await.unwrap();
        assert_eq!(fresh.expose(), "aliased");
    }

    #[tokio::test]
    async fn refresh_rejected_by_success_flag() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200)
                .json_body(json!({"success": false, "message": "session revoked"}));
        });

        let err = backend(&server, false).refresh(&session()).await.unwrap_err();
        match err {
            SessionError::Rejected(msg) => assert_eq!(msg, "session revoked"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_http_error_does_not_leak_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(401).body("internal refresh diagnostics");
        });

        let err = backend(&server, false).refresh(&session()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"), "got: {msg}");
        assert!(!msg.contains("diagnostics"));
    }

    #[tokio::test]
    async fn refresh_missing_credential_is_invalid() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).json_body(json!({"success": true}));
        });

        let err = backend(&server, false).refresh(&session()).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn refresh_non_json_is_invalid() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).body("<html>");
        });

        let err = backend(&server, false).refresh(&session()).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn logout_posts_bearer_when_configured() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/logout")
                .header("authorization", "Bearer old-token");
            then.status(204);
        });

        backend(&server, true).logout(&session()).await.unwrap();
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn logout_without_path_is_local() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.path("/auth/logout");
            then.status(500);
        });

        backend(&server, false).logout(&session()).await.unwrap();
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn logout_failure_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/logout");
            then.status(500);
        });

        let err = backend(&server, true).logout(&session()).await.unwrap_err();
        assert!(matches!(err, SessionError::Http(_)));
    }
}
