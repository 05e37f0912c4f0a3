#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Session-aware access to the realty admin backend.
//!
//! Three clients share one [`RequestExecutor`] and one
//! [`SessionHandle`](realty_auth::SessionHandle):
//!
//! - [`GridClient`] reads list endpoints and never fails: every error
//!   degrades to an empty grid.
//! - [`MutationClient`] sends JSON or multipart writes and never re-sends
//!   one.
//! - [`ExportClient`] downloads binary exports as base64 plus a filename.
//!
//! A 401 triggers exactly one session refresh. Reads and exports then retry
//! once with the new credential; writes report [`ApiError::AuthExpired`]. A
//! failed refresh tears the session down.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use realty_sdk::{ApiConfig, GridClient, HttpExecutor};
//! use realty_query::GridQuery;
//!
//! let executor = Arc::new(HttpExecutor::from_config(ApiConfig::new(base_url))?);
//! let grid = GridClient::new(executor, session);
//! let rows = grid.fetch_grid("/properties", &GridQuery::builder().page(1).build()).await;
//! ```

mod auth_flow;
mod config;
mod error;
mod executor;
mod export;
mod grid;
mod mutation;
mod outcome;
mod pager;

#[cfg(test)]
mod testing;

pub use auth_flow::{FlowOutcome, FlowState, RetryPolicy};
pub use config::ApiConfig;
pub use error::{ApiError, ErrorKind};
pub use executor::{ApiRequest, HttpExecutor, RequestBody, RequestExecutor, Representation};
pub use export::{DEFAULT_EXPORT_FILENAME, ExportClient, ExportFile, filename_from_headers};
pub use grid::GridClient;
pub use mutation::{Attachment, MutationClient, PAYLOAD_FIELD};
pub use outcome::{RequestOutcome, ResponsePayload, extract_message};
pub use pager::GridPager;

/// Run a request through the shared refresh state machine.
pub use auth_flow::run as run_with_refresh;
