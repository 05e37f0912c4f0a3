use std::time::Duration;

use realty_http::{HttpClientConfig, TransportSecurity};
use url::Url;

/// Settings for the API executor.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API root. Endpoint paths are resolved under it, keeping any path
    /// prefix (`https://host/api/v1` + `properties` is `.../api/v1/properties`).
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
    pub max_body_size: usize,
    /// Allow `http://` base URLs. Meant for local development and tests.
    pub allow_insecure_http: bool,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        let http = HttpClientConfig::default();
        Self {
            base_url,
            timeout: http.request_timeout,
            user_agent: http.user_agent,
            max_body_size: http.max_body_size,
            allow_insecure_http: false,
        }
    }

    /// Transport configuration derived from these settings.
    #[must_use]
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            request_timeout: self.timeout,
            user_agent: self.user_agent.clone(),
            max_body_size: self.max_body_size,
            transport: if self.allow_insecure_http {
                TransportSecurity::AllowInsecureHttp
            } else {
                TransportSecurity::TlsOnly
            },
            ..HttpClientConfig::default()
        }
    }

    /// Resolve an endpoint path against [`base_url`](Self::base_url).
    ///
    /// # Errors
    /// Returns the parse error if `path` does not form a valid URL.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
    }
}
