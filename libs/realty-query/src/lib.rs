#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Grid query model and wire encoding for realty admin list endpoints.
//!
//! ```rust,ignore
//! use realty_query::{GridQuery, SortDir, encode_query};
//!
//! let query = GridQuery::builder()
//!     .filter("city", "Santiago")
//!     .sort_by("price", SortDir::Desc)
//!     .page(1)
//!     .limit(20)
//!     .build();
//! let mut url = url::Url::parse("https://api.example.com/properties")?;
//! encode_query(&query)?.apply_to(&mut url);
//! ```

mod encode;
mod error;
mod filters;
mod query;
mod response;

pub use encode::{EncodedQuery, encode_query};
pub use error::{FilterPart, QueryError};
pub use filters::{Filters, decode_filters, encode_filters};
pub use query::{GridQuery, GridQueryBuilder, SortDir};
pub use response::{GridResponse, Page, Row};
