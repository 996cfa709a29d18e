//! Umbrella crate for the catalog client core.
//!
//! Host applications depend on `marisa-catalog` and get the service façade
//! plus the domain types it hands out. The `desktop-shims` feature (on by
//! default) wires the reqwest-backed HTTP client when none is injected.

pub use core_service::*;
