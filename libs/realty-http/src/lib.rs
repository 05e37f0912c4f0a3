#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP transport for the realty admin resource layer
//!
//! A hyper-based client with:
//! - TLS via rustls (HTTPS only unless insecure HTTP is opted into)
//! - Connection pooling and a per-request timeout
//! - User-Agent injection
//! - Transparent response decompression (gzip, brotli, deflate), with body
//!   size limits applied to decompressed bytes
//! - JSON and `multipart/form-data` request bodies
//!
//! There is no retry layer: one `send()` is one request on the wire.
//!
//! # Example
//!
//! ```ignore
//! use realty_http::HttpClient;
//!
//! let client = HttpClient::builder().user_agent("realty-admin/1.0").build()?;
//! let rows: serde_json::Value = client
//!     .get("https://api.example.com/properties?page=1")
//!     .bearer_auth(token.expose())
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod multipart;
mod request;
mod response;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{DEFAULT_USER_AGENT, HttpClientConfig, TlsRootConfig, TransportSecurity};
pub use error::{HttpError, InvalidUriKind};
pub use layers::{UserAgentLayer, UserAgentService};
pub use multipart::{Form, Part};
pub use request::RequestBuilder;
pub use response::{ERROR_BODY_PREVIEW_LIMIT, HttpResponse, ResponseBody};

// Re-exported so downstream crates name the same `http` types
pub use http::{HeaderMap, Method, StatusCode, header};
