//! Contract for the remote catalog backend.
//!
//! The core never talks HTTP directly; it goes through a [`CatalogGateway`].
//! Implementations make exactly one attempt per call. Retrying is the
//! caller's decision, and no caller in the core retries.

use crate::error::Result;
use crate::models::{
    CrawlStatus, DetailUpdate, ImagePayload, VideoDetail, VideoLookup, VideoRecord, ZoneStats,
};
use crate::query::{SortField, SortOrder};
use crate::zones::ZoneId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Server-side filter and sort for a day's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoListRequest {
    /// `None` lets the server pick its latest date.
    pub date: Option<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub main_zone: Option<ZoneId>,
    pub sub_zone: Option<ZoneId>,
}

impl VideoListRequest {
    /// The whole day, most viewed first, unfiltered.
    pub fn full_day(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Available crawl dates, in server order.
    async fn list_dates(&self) -> Result<Vec<String>>;

    /// The complete matching catalog, already sorted by the server.
    async fn fetch_videos(&self, request: &VideoListRequest) -> Result<Vec<VideoRecord>>;

    /// Fails with `Validation` before any I/O when the lookup is empty.
    async fn fetch_video_detail(&self, lookup: &VideoLookup) -> Result<VideoDetail>;

    /// Idempotent. A skipped update means the record was already current.
    async fn update_video_detail(&self, bvid: &str) -> Result<DetailUpdate>;

    async fn fetch_zone_stats(&self, date: Option<&str>) -> Result<ZoneStats>;

    async fn crawl_status(&self) -> Result<CrawlStatus>;

    /// Returns the server's confirmation message.
    async fn start_crawl(&self) -> Result<String>;

    async fn proxy_image(&self, url: &str) -> Result<ImagePayload>;
}
