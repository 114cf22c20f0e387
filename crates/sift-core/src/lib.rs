//! # sift-core
//!
//! Core types, traits, and filter validation for the sift hybrid search engine.
//!
//! Every other sift crate depends on this one. It has no I/O of its own.

pub mod defaults;
pub mod error;
pub mod filters;
pub mod logging;
pub mod models;
pub mod traits;

pub use error::{Error, Result, RetrievalError, RetrievalPath, ValidationError};
pub use filters::{DateRange, FilterValidator, SearchFilters, ValidatedFilters};
pub use models::*;
pub use traits::*;

/// Generate a time-ordered request identifier (UUIDv7).
#[inline]
pub fn new_request_id() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}
