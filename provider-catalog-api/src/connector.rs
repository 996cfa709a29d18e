//! Catalog backend connector
//!
//! Implements [`CatalogGateway`] over the host [`HttpClient`] against the
//! backend's `/api` routes.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_catalog::models::normalize_records;
use core_catalog::{
    CatalogGateway, CrawlStatus, DetailUpdate, ImagePayload, Result, VideoDetail,
    VideoListRequest, VideoLookup, VideoRecord, ZoneStats,
};
use core_runtime::config::CoreConfig;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{ProviderError, Result as ProviderResult};
use crate::types::{DatesResponse, MessageResponse, VideosResponse, ZoneStatsResponse};

/// Per-request timeout when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Catalog backend connector
///
/// Every operation makes exactly one request. Non-success statuses become
/// [`CatalogError::Protocol`](core_catalog::CatalogError::Protocol) carrying
/// the server's `detail` text, transport failures become
/// [`CatalogError::Network`](core_catalog::CatalogError::Network).
///
/// # Example
///
/// ```ignore
/// use provider_catalog_api::HttpCatalogGateway;
/// use core_catalog::{CatalogGateway, VideoListRequest};
///
/// let gateway = HttpCatalogGateway::new(http_client, "http://localhost:8000/api");
/// let videos = gateway.fetch_videos(&VideoListRequest::full_day("2025-08-13")).await?;
/// ```
pub struct HttpCatalogGateway {
    http_client: Arc<dyn HttpClient>,

    /// Base of every route, e.g. `http://localhost:8000/api`
    api_root: String,

    timeout: Duration,
}

impl HttpCatalogGateway {
    pub fn new(http_client: Arc<dyn HttpClient>, api_root: impl Into<String>) -> Self {
        let api_root = api_root.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            api_root,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(Arc::clone(&config.http_client), config.api_root()).with_timeout(config.request_timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.api_root, route)
    }

    /// Sends once and turns a non-2xx status into [`ProviderError::Api`].
    async fn send(&self, request: HttpRequest) -> ProviderResult<HttpResponse> {
        let request = request.timeout(self.timeout);
        let url = request.full_url();
        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            debug!(status = response.status, url = %url, "Catalog API request succeeded");
            Ok(response)
        } else {
            let message = response.error_detail();
            warn!(status = response.status, url = %url, message = %message, "Catalog API request failed");
            Err(ProviderError::Api {
                status: response.status,
                message,
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, request: HttpRequest, what: &str) -> ProviderResult<T> {
        let response = self.send(request.header("Accept", "application/json")).await?;
        decode(&response, what)
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> ProviderResult<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| ProviderError::Parse(format!("Failed to parse {}: {}", what, e)))
}

fn zone_param(zone: Option<u32>) -> String {
    zone.map(|id| id.to_string()).unwrap_or_default()
}

#[async_trait]
impl CatalogGateway for HttpCatalogGateway {
    #[instrument(skip(self))]
    async fn list_dates(&self) -> Result<Vec<String>> {
        let response: DatesResponse = self
            .get_json(HttpRequest::get(self.url("/dates")), "date list")
            .await?;
        debug!("Received {} dates", response.dates.len());
        Ok(response.dates)
    }

    #[instrument(skip(self), fields(date = ?request.date, sort_by = %request.sort_by))]
    async fn fetch_videos(&self, request: &VideoListRequest) -> Result<Vec<VideoRecord>> {
        let http_request = HttpRequest::get(self.url("/videos"))
            .query_param("sort_by", request.sort_by.as_str())
            .query_param("order", request.order.as_str())
            .query_param("date", request.date.clone().unwrap_or_default())
            .query_param("main_zone", zone_param(request.main_zone))
            .query_param("sub_zone", zone_param(request.sub_zone));

        let response: VideosResponse = self.get_json(http_request, "video list").await?;
        let videos = normalize_records(response.videos);
        info!("Fetched {} videos", videos.len());
        Ok(videos)
    }

    #[instrument(skip(self))]
    async fn fetch_video_detail(&self, lookup: &VideoLookup) -> Result<VideoDetail> {
        lookup.validate()?;

        let mut request = HttpRequest::get(self.url("/video/detail"));
        request = match (lookup.bvid.as_deref().map(str::trim), lookup.aid) {
            (Some(bvid), _) if !bvid.is_empty() => request.query_param("bvid", bvid),
            (_, Some(aid)) => request.query_param("aid", aid.to_string()),
            _ => request,
        };

        Ok(self.get_json(request, "video detail").await?)
    }

    #[instrument(skip(self))]
    async fn update_video_detail(&self, bvid: &str) -> Result<DetailUpdate> {
        let bvid = bvid.trim();
        if bvid.is_empty() {
            return Err(ProviderError::InvalidRequest("bvid不能为空".to_string()).into());
        }

        let request = HttpRequest::post(self.url("/video/update")).query_param("bvid", bvid);
        let update: DetailUpdate = self.get_json(request, "detail update").await?;
        debug!(skipped = update.skipped, "Detail update answered");
        Ok(update)
    }

    #[instrument(skip(self))]
    async fn fetch_zone_stats(&self, date: Option<&str>) -> Result<ZoneStats> {
        let request = HttpRequest::get(self.url("/zone/stats"))
            .query_param("date", date.unwrap_or_default());
        let response: ZoneStatsResponse = self.get_json(request, "zone stats").await?;
        Ok(response.zone_stats)
    }

    #[instrument(skip(self))]
    async fn crawl_status(&self) -> Result<CrawlStatus> {
        Ok(self
            .get_json(HttpRequest::get(self.url("/crawl/status")), "crawl status")
            .await?)
    }

    #[instrument(skip(self))]
    async fn start_crawl(&self) -> Result<String> {
        let response: MessageResponse = self
            .get_json(HttpRequest::post(self.url("/crawl/start")), "crawl start")
            .await?;
        let message = response.message.unwrap_or_default();
        info!(message = %message, "Crawl start accepted");
        Ok(message)
    }

    #[instrument(skip(self, url))]
    async fn proxy_image(&self, url: &str) -> Result<ImagePayload> {
        let request = HttpRequest::get(self.url("/proxy/image")).query_param("url", url);
        let response = self.send(request).await?;
        let content_type = response.header("content-type").map(str::to_string);

        debug!(bytes = response.body.len(), "Proxied image");
        Ok(ImagePayload {
            bytes: response.body,
            content_type,
        })
    }
}
