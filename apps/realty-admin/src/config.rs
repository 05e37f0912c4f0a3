//! Layered application configuration.
//!
//! Sources, lowest to highest priority: built-in defaults, the YAML file
//! given with `--config`, `REALTY__*` environment variables (`__` separates
//! nested keys, e.g. `REALTY__SESSION__CREDENTIAL`), then CLI flags.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use realty_auth::{
    DEFAULT_REFRESH_PATH, HttpSessionBackend, HttpSessionBackendConfig, Session, SessionStore,
};
use realty_http::{DEFAULT_USER_AGENT, HttpClientConfig};
use realty_sdk::ApiConfig;
use serde::{Deserialize, Serialize};
use url::Url;

pub const ENV_PREFIX: &str = "REALTY__";

const REDACTED: &str = "***";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiSection,
    pub session: SessionSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// API root; endpoint paths resolve under it.
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_body_size: usize,
    /// Permit `http://` base URLs (local development only).
    pub allow_insecure_http: bool,
}

impl Default for ApiSection {
    fn default() -> Self {
        let http = HttpClientConfig::default();
        Self {
            base_url: "https://localhost/api".to_owned(),
            timeout_secs: http.request_timeout.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_body_size: http.max_body_size,
            allow_insecure_http: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Bearer credential. Absent means signed out.
    pub credential: Option<String>,
    pub user_id: Option<String>,
    /// Relative to `api.base_url`.
    pub refresh_path: String,
    pub logout_path: Option<String>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            credential: None,
            user_id: None,
            refresh_path: DEFAULT_REFRESH_PATH.to_owned(),
            logout_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive, e.g. `warn` or `realty_sdk=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional YAML file, then `REALTY__*` variables.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("failed to load configuration")
    }

    /// CLI flags win over every other source. Verbosity only ever raises
    /// the configured level.
    pub fn apply_cli_overrides(&mut self, base_url: Option<&str>, verbose: u8) {
        if let Some(url) = base_url {
            url.clone_into(&mut self.api.base_url);
        }
        let level = match verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        };
        if let Some(level) = level {
            level.clone_into(&mut self.logging.level);
        }
    }

    /// # Errors
    /// Returns an error if `api.base_url` is not an absolute `https://` URL
    /// (or `http://` with `api.allow_insecure_http`).
    pub fn api_config(&self) -> Result<ApiConfig> {
        let base_url = Url::parse(&self.api.base_url)
            .with_context(|| format!("invalid api.base_url '{}'", self.api.base_url))?;
        match base_url.scheme() {
            "https" => {}
            "http" if self.api.allow_insecure_http => {}
            "http" => anyhow::bail!(
                "api.base_url uses http:// but api.allow_insecure_http is false"
            ),
            other => anyhow::bail!("api.base_url has unsupported scheme '{other}'"),
        }
        let mut config = ApiConfig::new(base_url);
        config.timeout = Duration::from_secs(self.api.timeout_secs);
        config.user_agent.clone_from(&self.api.user_agent);
        config.max_body_size = self.api.max_body_size;
        config.allow_insecure_http = self.api.allow_insecure_http;
        Ok(config)
    }

    /// Session store seeded from `session.credential`, refreshing through
    /// the HTTP backend at `api.base_url`.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the backend's HTTP
    /// client cannot be built.
    ///
    /// # Panics
    /// With a credential configured, panics outside a Tokio runtime.
    pub fn session_store(&self) -> Result<SessionStore> {
        let api = self.api_config()?;
        let Some(credential) = self.session.credential.as_deref() else {
            tracing::info!("no credential configured, starting signed out");
            return Ok(SessionStore::signed_out());
        };

        let mut session = Session::new(credential);
        if let Some(user_id) = &self.session.user_id {
            session = session.with_user_id(user_id.clone());
        }

        let mut backend_config = HttpSessionBackendConfig::new(api.base_url.clone());
        backend_config
            .refresh_path
            .clone_from(&self.session.refresh_path);
        backend_config.logout_path.clone_from(&self.session.logout_path);
        backend_config.http_config = Some(api.http_client_config());

        let backend =
            HttpSessionBackend::new(backend_config).context("failed to build session backend")?;
        Ok(SessionStore::new(session, Arc::new(backend)))
    }

    /// Copy with the credential masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.session.credential.is_some() {
            copy.session.credential = Some(REDACTED.to_owned());
        }
        copy
    }

    /// Effective configuration as YAML, credential masked.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_redacted_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(&self.redacted())
            .map_err(|e| anyhow::anyhow!("failed to render configuration as YAML: {e}"))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = temp_env::with_vars_unset(
            ["REALTY__API__BASE_URL", "REALTY__SESSION__CREDENTIAL"],
            || AppConfig::load(None).unwrap(),
        );
        assert_eq!(config.api.base_url, "https://localhost/api");
        assert_eq!(config.session.refresh_path, DEFAULT_REFRESH_PATH);
        assert!(config.session.credential.is_none());
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let file = yaml_file(
            "api:\n  base_url: https://admin.example.com/api/v1\n  timeout_secs: 5\nlogging:\n  format: json\n",
        );
        let config = temp_env::with_vars_unset(["REALTY__API__BASE_URL"], || {
            AppConfig::load(Some(file.path())).unwrap()
        });
        assert_eq!(config.api.base_url, "https://admin.example.com/api/v1");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
        // untouched keys keep their defaults
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_env_overrides_yaml() {
        let file = yaml_file("api:\n  base_url: https://from-file.example.com\n");
        let config = temp_env::with_vars(
            [
                ("REALTY__API__BASE_URL", Some("https://from-env.example.com")),
                ("REALTY__SESSION__CREDENTIAL", Some("tok-abc")),
                ("REALTY__SESSION__USER_ID", Some("u-17")),
            ],
            || AppConfig::load(Some(file.path())).unwrap(),
        );
        assert_eq!(config.api.base_url, "https://from-env.example.com");
        assert_eq!(config.session.credential.as_deref(), Some("tok-abc"));
        assert_eq!(config.session.user_id.as_deref(), Some("u-17"));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(Some("http://127.0.0.1:9000"), 2);
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.logging.level, "debug");

        config.apply_cli_overrides(None, 0);
        assert_eq!(config.logging.level, "debug", "no -v leaves the level alone");
    }

    #[test]
    fn test_invalid_yaml_type_is_error() {
        let file = yaml_file("api:\n  timeout_secs: soon\n");
        let result = AppConfig::load(Some(file.path()));
        assert!(result.is_err());
    }

    #[test]
    fn test_api_config_maps_fields() {
        let mut config = AppConfig::default();
        config.api.base_url = "http://localhost:8080/api".to_owned();
        config.api.timeout_secs = 7;
        config.api.allow_insecure_http = true;

        let api = config.api_config().unwrap();
        assert_eq!(api.base_url.as_str(), "http://localhost:8080/api");
        assert_eq!(api.timeout, Duration::from_secs(7));
        assert!(api.allow_insecure_http);
    }

    #[test]
    fn test_api_config_rejects_relative_url() {
        let mut config = AppConfig::default();
        config.api.base_url = "/api".to_owned();
        let err = config.api_config().unwrap_err();
        assert!(err.to_string().contains("api.base_url"));
    }

    #[test]
    fn test_api_config_requires_opt_in_for_http() {
        let mut config = AppConfig::default();
        config.api.base_url = "http://localhost:8080".to_owned();
        let err = config.api_config().unwrap_err();
        assert!(err.to_string().contains("allow_insecure_http"));

        config.api.base_url = "ftp://localhost".to_owned();
        assert!(config.api_config().is_err());
    }

    #[test]
    fn test_session_store_signed_out_without_credential() {
        let store = AppConfig::default().session_store().unwrap();
        assert!(!store.is_signed_in());
    }

    #[tokio::test]
    async fn test_session_store_seeded_from_credential() {
        let mut config = AppConfig::default();
        config.api.base_url = "http://localhost:8080".to_owned();
        config.api.allow_insecure_http = true;
        config.session.credential = Some("tok-abc".to_owned());
        config.session.user_id = Some("u-17".to_owned());

        let store = config.session_store().unwrap();
        let session = store.session().unwrap();
        assert_eq!(session.credential.expose(), "tok-abc");
        assert_eq!(session.user_id.as_deref(), Some("u-17"));
    }

    #[test]
    fn test_redacted_yaml_hides_credential() {
        let mut config = AppConfig::default();
        config.session.credential = Some("tok-very-secret".to_owned());

        let yaml = config.to_redacted_yaml().unwrap();
        assert!(!yaml.contains("tok-very-secret"));
        assert!(yaml.contains(REDACTED));
        assert!(yaml.contains("base_url"));
    }
}
