//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided HTTP bridge, the catalog backend
//! gateway, the zone index and the batch sync into one [`CatalogService`].
//! Desktop apps typically enable the `desktop-shims` feature (which supplies
//! a `reqwest`-based HTTP client); other hosts inject their own
//! `HttpClient` through `CoreConfig::builder().http_client(..)`.

pub mod crawl;
pub mod error;
pub mod service;

pub use crawl::CrawlMonitor;
pub use error::{CoreError, Result};
pub use service::{CatalogService, VideoDetailView};

pub use bridge_traits::http::HttpClient;
pub use core_catalog as catalog;
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder};
pub use core_runtime::events::{CoreEvent, EventBus};
pub use core_runtime::logging::{init_logging, LoggingConfig};
pub use core_sync as sync;

/// Builds a service from `CATALOG_*` environment variables.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let service = core_service::bootstrap_from_env()?;
/// let date = service.default_date().await?;
/// # Ok(())
/// # }
/// ```
pub fn bootstrap_from_env() -> Result<CatalogService> {
    let config = CoreConfig::from_env()?;
    CatalogService::new(config)
}
