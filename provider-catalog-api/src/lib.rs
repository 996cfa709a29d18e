//! # Catalog API Provider
//!
//! Implements `CatalogGateway` against the catalog backend's HTTP API.
//!
//! ## Overview
//!
//! This module provides:
//! - `HttpCatalogGateway`, one request per operation over the host `HttpClient`
//! - Wire envelopes for the backend's JSON responses
//! - Mapping of backend failures onto `CatalogError`, keeping the server's
//!   `detail` message intact for display

pub mod connector;
pub mod error;
pub mod types;

pub use connector::HttpCatalogGateway;
pub use error::{ProviderError, Result};
