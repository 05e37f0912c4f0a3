use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("realty-http/", env!("CARGO_PKG_VERSION"));

/// Where trust anchors for HTTPS come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Bundled webpki roots. Works the same on every host.
    #[default]
    WebPki,
    /// The platform certificate store, for APIs behind a private CA.
    Native,
}

/// Which URL schemes the client will dial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    #[default]
    TlsOnly,
    /// Plain `http://` too. Local API instances and mock servers.
    AllowInsecureHttp,
}

/// Settings for one [`HttpClient`](crate::HttpClient).
///
/// There is no retry layer. One `send()` puts one request on the wire, and
/// the only re-send in the stack is the post-refresh retry owned by
/// `realty-sdk`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,

    /// Cap on a buffered response body. Sized for spreadsheet exports,
    /// which arrive whole; grid pages and mutation replies are far smaller.
    pub max_body_size: usize,

    pub user_agent: String,
    pub transport: TransportSecurity,
    pub tls_roots: TlsRootConfig,

    /// In-flight request limit. Past it, `send()` fails at once with
    /// [`HttpError::Overloaded`](crate::HttpError::Overloaded).
    pub buffer_capacity: usize,

    pub pool_idle_timeout: Option<Duration>,
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 50 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            buffer_capacity: 1024,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpClientConfig {
    /// Preset for the refresh and logout calls made by the session backend.
    ///
    /// Those replies are a token and a user id at most, so the body cap is
    /// 64 KiB and the timeout is half the default: a stalled refresh holds
    /// up every request waiting on the session.
    #[must_use]
    pub fn session_endpoint() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            max_body_size: 64 * 1024,
            buffer_capacity: 64,
            pool_idle_timeout: Some(Duration::from_secs(60)),
            pool_max_idle_per_host: 4,
            ..Self::default()
        }
    }

    /// Plain-HTTP preset for tests against `httpmock` servers.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024,
            transport: TransportSecurity::AllowInsecureHttp,
            buffer_capacity: 256,
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 4,
            ..Self::default()
        }
    }
}
