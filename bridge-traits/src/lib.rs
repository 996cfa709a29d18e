//! # Host Bridge Traits
//!
//! Capability contracts the catalog core needs from its host.
//!
//! ## Overview
//!
//! The core never opens sockets itself. Every request to the catalog backend
//! goes through an [`HttpClient`](http::HttpClient) injected by the host:
//! `bridge-desktop` ships a reqwest implementation, tests inject mocks.
//!
//! ## Error Handling
//!
//! All bridge operations use [`BridgeError`](error::BridgeError). Implementations
//! should map transport failures (no response at all) to
//! `BridgeError::Network`/`BridgeError::Timeout` and return every received
//! response, success or not, as `Ok(HttpResponse)`.
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` so a single client can be shared across
//! tasks behind an `Arc`.

pub mod error;
pub mod http;

pub use error::BridgeError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
