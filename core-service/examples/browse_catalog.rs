//! Browse a running catalog backend from the command line.
//!
//! Run with:
//! ```bash
//! # Latest date, first page
//! CATALOG_API_BASE_URL=http://localhost:8000 cargo run --example browse_catalog
//!
//! # Search a specific date
//! cargo run --example browse_catalog -- 2025-08-13 魔理沙
//!
//! # Refresh detail records for a date
//! cargo run --example browse_catalog -- 2025-08-13 --sync
//! ```

use anyhow::{bail, Context};
use core_catalog::format::{format_count, format_date_time};
use core_catalog::QueryOutcome;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::bootstrap_from_env;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    let args: Vec<String> = env::args().skip(1).collect();
    let service = bootstrap_from_env().context("failed to build catalog service")?;

    let date = match args.first() {
        Some(date) => date.clone(),
        None => match service.default_date().await? {
            Some(date) => date,
            None => bail!("backend has no crawl dates yet"),
        },
    };

    if args.get(1).map(String::as_str) == Some("--sync") {
        let result = service
            .batch_sync(&date, |progress| {
                println!("[{:>3}%] {}", progress.percentage, progress.message)
            })
            .await?;
        info!(duration_ms = result.duration().num_milliseconds(), "Sync finished");
        return Ok(());
    }

    let controller = service.browse(date.clone());
    let outcome = match args.get(1) {
        Some(term) => controller.set_search(term.clone()).await?,
        None => controller.refresh().await?,
    };

    match outcome {
        Some(QueryOutcome::Applied { result, .. }) => {
            println!("{}: {} videos", date, result.total_count);
            for video in &result.items {
                let zone = video
                    .zone_id
                    .map(|id| service.zones().path(id))
                    .unwrap_or_default();
                println!(
                    "{:<14} {:>8} views  {:<16} {}  {}",
                    video.bvid.as_deref().unwrap_or("-"),
                    format_count(video.view_count),
                    zone,
                    format_date_time(&video.crawl_time),
                    video.title
                );
            }
        }
        Some(QueryOutcome::Failed { error, .. }) => bail!(error),
        Some(QueryOutcome::Superseded { .. }) | None => {}
    }

    controller.shutdown();
    Ok(())
}
