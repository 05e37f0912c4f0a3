#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Session model for the realty admin resource layer.
//!
//! - [`Session`] and [`SecretString`]: the bearer credential and its owner
//! - [`SessionHandle`]: what clients call to read, refresh and tear down the
//!   session
//! - [`SessionStore`]: in-memory handle with atomic swap on refresh
//! - [`SessionBackend`] / [`HttpSessionBackend`]: the remote refresh and
//!   logout calls

mod backend;
mod error;
mod http_backend;
mod http_error;
mod secret;
mod session;
mod store;

pub use backend::SessionBackend;
pub use error::SessionError;
pub use http_backend::{DEFAULT_REFRESH_PATH, HttpSessionBackend, HttpSessionBackendConfig};
pub use http_error::format_http_error;
pub use secret::SecretString;
pub use session::{Session, SessionHandle};
pub use store::SessionStore;
