//! The catalog façade exposed to host applications.

use crate::crawl::CrawlMonitor;
use crate::error::{CoreError, Result};
use core_catalog::{
    CatalogGateway, CatalogQueryEngine, DetailUpdate, ImagePayload, QueryController, QueryFilter,
    VideoDetail, VideoLookup, ZoneAggregate, ZoneDefinition, ZoneStats, ZoneSummary,
    ZoneTaxonomyIndex,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, CrawlEvent, EventBus};
use core_sync::{BatchSyncOrchestrator, BatchSyncProgress, BatchSyncResult};
use provider_catalog_api::HttpCatalogGateway;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tracing::{info, instrument, warn};

/// A video detail with its zone classification resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoDetailView {
    pub detail: VideoDetail,
    pub zone: ZoneSummary,
}

/// Primary façade exposed to host applications.
///
/// Owns the gateway, the zone index, the event bus and the crawl monitor.
/// Query engines and controllers are created per view and share the gateway.
pub struct CatalogService {
    config: CoreConfig,
    gateway: Arc<dyn CatalogGateway>,
    zones: Arc<ZoneTaxonomyIndex>,
    event_bus: EventBus,
    crawl: CrawlMonitor,
}

impl CatalogService {
    /// Builds the service against the HTTP backend named in `config`.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let gateway: Arc<dyn CatalogGateway> = Arc::new(HttpCatalogGateway::from_config(&config));
        Self::with_gateway(config, gateway)
    }

    /// Builds the service on an explicit gateway.
    pub fn with_gateway(config: CoreConfig, gateway: Arc<dyn CatalogGateway>) -> Result<Self> {
        config.validate()?;
        let zones = load_zone_index(&config)?;
        Ok(Self::assemble(config, gateway, zones))
    }

    /// Replaces the zone index, e.g. with a fixture.
    pub fn with_zone_index(mut self, zones: ZoneTaxonomyIndex) -> Self {
        self.zones = Arc::new(zones);
        self
    }

    fn assemble(config: CoreConfig, gateway: Arc<dyn CatalogGateway>, zones: ZoneTaxonomyIndex) -> Self {
        let event_bus = EventBus::default();
        let crawl = CrawlMonitor::new(Arc::clone(&gateway), config.crawl_poll_interval)
            .with_event_bus(event_bus.clone());

        info!(
            api = %config.api_base_url,
            zones = zones.len(),
            "Catalog service ready"
        );

        Self {
            config,
            gateway,
            zones: Arc::new(zones),
            event_bus,
            crawl,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn gateway(&self) -> Arc<dyn CatalogGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn zones(&self) -> Arc<ZoneTaxonomyIndex> {
        Arc::clone(&self.zones)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    // ------------------------------------------------------------------
    // Dates and browsing
    // ------------------------------------------------------------------

    /// Crawl dates in server order.
    pub async fn available_dates(&self) -> Result<Vec<String>> {
        Ok(self.gateway.list_dates().await?)
    }

    /// The first date the server lists, if any.
    pub async fn default_date(&self) -> Result<Option<String>> {
        Ok(self.available_dates().await?.into_iter().next())
    }

    /// A fresh engine publishing to this service's event bus.
    pub fn query_engine(&self) -> Arc<CatalogQueryEngine> {
        Arc::new(
            CatalogQueryEngine::new(Arc::clone(&self.gateway), self.config.settle_delay)
                .with_event_bus(self.event_bus.clone()),
        )
    }

    /// A controller over a fresh engine, starting from `initial`.
    pub fn query_controller(&self, initial: QueryFilter) -> QueryController {
        QueryController::new(self.query_engine(), initial, self.config.search_debounce)
    }

    /// A controller for `date` with the default sort and configured page size.
    pub fn browse(&self, date: impl Into<String>) -> QueryController {
        let filter = QueryFilter::new(date).with_page(1, self.config.page_size);
        self.query_controller(filter)
    }

    // ------------------------------------------------------------------
    // Zones and details
    // ------------------------------------------------------------------

    pub async fn zone_stats(&self, date: Option<&str>) -> Result<ZoneStats> {
        Ok(self.gateway.fetch_zone_stats(date).await?)
    }

    /// Zone stats rolled up to main zones.
    pub async fn zone_aggregate(&self, date: Option<&str>) -> Result<ZoneAggregate> {
        let stats = self.zone_stats(date).await?;
        Ok(self.zones.aggregate_by_main_zone(&stats))
    }

    #[instrument(skip(self))]
    pub async fn video_detail(&self, lookup: &VideoLookup) -> Result<VideoDetailView> {
        let detail = self.gateway.fetch_video_detail(lookup).await?;
        let zone = self.zones.describe_detail(&detail);
        Ok(VideoDetailView { detail, zone })
    }

    pub async fn update_video_detail(&self, bvid: &str) -> Result<DetailUpdate> {
        Ok(self.gateway.update_video_detail(bvid).await?)
    }

    /// Refreshes the detail record of every video of `date`.
    pub async fn batch_sync<F>(&self, date: &str, on_progress: F) -> Result<BatchSyncResult>
    where
        F: FnMut(BatchSyncProgress) + Send,
    {
        let orchestrator =
            BatchSyncOrchestrator::with_spacing(Arc::clone(&self.gateway), self.config.batch_item_spacing)
                .with_event_bus(self.event_bus.clone());
        Ok(orchestrator.run(date, on_progress).await?)
    }

    // ------------------------------------------------------------------
    // Crawl control
    // ------------------------------------------------------------------

    pub fn crawl_monitor(&self) -> &CrawlMonitor {
        &self.crawl
    }

    /// Starts periodic crawl-status polling (idempotent).
    pub fn start_crawl_monitor(&self) {
        self.crawl.start();
    }

    /// Asks the backend to start a crawl.
    ///
    /// Returns the server's confirmation verbatim; a rejection carries the
    /// server's `detail` verbatim. The crawl status is refreshed either way.
    #[instrument(skip(self))]
    pub async fn start_crawl(&self) -> Result<String> {
        let outcome = self.gateway.start_crawl().await;

        match &outcome {
            Ok(message) => {
                info!(message = %message, "Crawl requested");
                self.emit(CrawlEvent::StartRequested {
                    message: message.clone(),
                });
            }
            Err(error) => {
                warn!(error = %error, "Crawl request rejected");
                self.emit(CrawlEvent::StartFailed {
                    message: error.to_string(),
                });
            }
        }

        self.crawl.refresh().await;
        outcome.map_err(CoreError::from)
    }

    pub fn is_crawling(&self) -> bool {
        self.crawl.is_crawling()
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    pub async fn proxy_image(&self, url: &str) -> Result<ImagePayload> {
        Ok(self.gateway.proxy_image(url).await?)
    }

    /// Stops background polling.
    pub fn shutdown(&self) {
        self.crawl.stop();
    }

    fn emit(&self, event: CrawlEvent) {
        self.event_bus.emit(CoreEvent::Crawl(event)).ok();
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("config", &self.config)
            .field("zones", &self.zones.len())
            .field("crawl", &self.crawl)
            .finish()
    }
}

fn load_zone_index(config: &CoreConfig) -> Result<ZoneTaxonomyIndex> {
    let definition = match &config.zone_definition_path {
        Some(path) => {
            info!(path = %path.display(), "Loading zone definition");
            ZoneDefinition::from_path(path)
        }
        None => ZoneDefinition::builtin(),
    }
    .map_err(|e| CoreError::InitializationFailed(format!("Zone definition unavailable: {}", e)))?;

    Ok(ZoneTaxonomyIndex::build(&definition))
}
