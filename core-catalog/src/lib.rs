//! # Catalog Module
//!
//! Client-side orchestration for browsing a daily-crawled video catalog.
//!
//! ## Overview
//!
//! This module provides:
//! - The catalog data model and its one-time normalization
//! - `ZoneTaxonomyIndex`, the flattened two-level topic taxonomy
//! - `CatalogGateway`, the contract for the remote backend
//! - `CatalogQueryEngine`, which combines server-side filtering/sorting with
//!   local search and pagination and resolves overlapping queries by
//!   generation number
//! - `QueryController`, which owns the filter, debounces search input and
//!   resets the page on filter changes
//! - Pagination and display formatting helpers

pub mod controller;
pub mod engine;
pub mod error;
pub mod format;
pub mod gateway;
pub mod models;
pub mod pagination;
pub mod query;
pub mod zones;

pub use controller::{QueryController, QueryHandle};
pub use engine::{CatalogQueryEngine, QueryOutcome, QuerySnapshot, QueryTicket};
pub use error::{CatalogError, Result};
pub use gateway::{CatalogGateway, VideoListRequest};
pub use models::{
    CrawlStatus, DetailUpdate, ImagePayload, RawVideoRecord, VideoDetail, VideoLookup,
    VideoRecord, VideoRef, ZoneStats,
};
pub use pagination::{Page, PageCursor};
pub use query::{
    summarize, CatalogSummary, QueryFilter, QueryResult, SortField, SortOrder,
};
pub use zones::{
    FlatZoneEntry, ZoneAggregate, ZoneDefinition, ZoneId, ZoneKind, ZoneRef, ZoneSummary,
    ZoneTaxonomyIndex,
};
