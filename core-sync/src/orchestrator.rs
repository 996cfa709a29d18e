//! # Batch Detail Sync
//!
//! Refreshes the per-video detail record of every video in a day's catalog.
//!
//! Items are processed strictly one after another, each request gated by a
//! [`RateLimiter`]. A failing item is recorded and the run moves on; only a
//! failure to obtain the catalog itself (or an empty day) aborts the run.

use crate::error::{Result, SyncError};
use crate::job::{BatchSyncProgress, BatchSyncResult, BatchSyncStatus, ItemOutcome, ItemReport};
use crate::rate_limiter::{FixedSpacingLimiter, RateLimiter};
use chrono::Utc;
use core_catalog::{CatalogError, CatalogGateway, VideoListRequest, VideoRecord};
use core_runtime::events::{BatchSyncEvent, CoreEvent, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub struct BatchSyncOrchestrator {
    gateway: Arc<dyn CatalogGateway>,
    rate_limiter: Arc<dyn RateLimiter>,
    event_bus: Option<EventBus>,
}

impl BatchSyncOrchestrator {
    pub fn new(gateway: Arc<dyn CatalogGateway>, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            gateway,
            rate_limiter,
            event_bus: None,
        }
    }

    /// Uses a [`FixedSpacingLimiter`] with the given spacing.
    pub fn with_spacing(gateway: Arc<dyn CatalogGateway>, spacing: Duration) -> Self {
        Self::new(gateway, Arc::new(FixedSpacingLimiter::new(spacing)))
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Syncs every video of `date`, reporting through `on_progress`.
    ///
    /// # Errors
    ///
    /// Fails without a partial result when the catalog fetch fails or the
    /// day has no videos (`CatalogError::NoData`). Per-item failures never
    /// fail the run.
    #[instrument(skip(self, on_progress))]
    pub async fn run<F>(&self, date: &str, mut on_progress: F) -> Result<BatchSyncResult>
    where
        F: FnMut(BatchSyncProgress) + Send,
    {
        let started_at = Utc::now();

        let videos = match self.fetch_catalog(date).await {
            Ok(videos) => videos,
            Err(error) => {
                warn!(error = %error, "Batch sync aborted");
                on_progress(BatchSyncProgress::aborted(error.to_string()));
                self.emit(BatchSyncEvent::Failed {
                    date: date.to_string(),
                    message: error.to_string(),
                });
                return Err(error);
            }
        };

        let total = videos.len();
        info!("Starting batch sync of {} videos", total);
        self.emit(BatchSyncEvent::Started {
            date: date.to_string(),
            total,
        });

        let mut result = BatchSyncResult::new(date, total, started_at);

        for (index, video) in videos.iter().enumerate() {
            self.rate_limiter.acquire().await;

            let name = video.display_name().to_string();
            self.notify(
                &mut on_progress,
                date,
                BatchSyncProgress::item(
                    index,
                    total,
                    &name,
                    BatchSyncStatus::Processing,
                    format!("正在检查: {}", name),
                ),
            );

            let outcome = self.sync_item(video).await;
            let message = match &outcome {
                ItemOutcome::Success { .. } => format!("更新成功: {}", name),
                ItemOutcome::Skipped { reason } => format!(
                    "已跳过: {} ({})",
                    name,
                    reason.as_deref().unwrap_or("无需更新")
                ),
                ItemOutcome::Failed { error } => format!("更新失败: {} - {}", name, error),
            };
            self.notify(
                &mut on_progress,
                date,
                BatchSyncProgress::item(index, total, &name, outcome.status(), message),
            );

            result.record(ItemReport {
                id: video.id.clone(),
                bvid: video.bvid.clone(),
                title: video.title.clone(),
                outcome,
            });
        }

        result.finished_at = Utc::now();
        info!(
            "Batch sync finished: {} succeeded, {} skipped, {} failed",
            result.success_count, result.skipped_count, result.failed_count
        );

        on_progress(BatchSyncProgress::completed(&result));
        self.emit(BatchSyncEvent::Completed {
            date: date.to_string(),
            success: result.success_count,
            skipped: result.skipped_count,
            failed: result.failed_count,
        });

        Ok(result)
    }

    async fn fetch_catalog(&self, date: &str) -> Result<Vec<VideoRecord>> {
        if date.trim().is_empty() {
            return Err(SyncError::InvalidDate(date.to_string()));
        }

        let videos = self
            .gateway
            .fetch_videos(&VideoListRequest::full_day(date))
            .await?;

        if videos.is_empty() {
            return Err(CatalogError::NoData {
                date: date.to_string(),
            }
            .into());
        }
        Ok(videos)
    }

    /// Exactly one attempt; errors become a `Failed` outcome.
    async fn sync_item(&self, video: &VideoRecord) -> ItemOutcome {
        let Some(bvid) = video.bvid.as_deref() else {
            let error = CatalogError::Validation(format!("视频 {} 缺少bvid", video.id));
            debug!(id = %video.id, "Skipping update request for video without bvid");
            return ItemOutcome::Failed {
                error: error.to_string(),
            };
        };

        match self.gateway.update_video_detail(bvid).await {
            Ok(update) if update.skipped => {
                debug!(bvid, reason = ?update.reason, "Detail already current");
                ItemOutcome::Skipped {
                    reason: update.reason,
                }
            }
            Ok(update) => {
                debug!(bvid, "Detail updated");
                ItemOutcome::Success {
                    message: update.message,
                }
            }
            Err(error) => {
                warn!(bvid, error = %error, "Detail update failed");
                ItemOutcome::Failed {
                    error: error.to_string(),
                }
            }
        }
    }

    fn notify<F>(&self, on_progress: &mut F, date: &str, progress: BatchSyncProgress)
    where
        F: FnMut(BatchSyncProgress),
    {
        self.emit(BatchSyncEvent::Progress {
            date: date.to_string(),
            current: progress.current,
            total: progress.total,
            percentage: progress.percentage,
            status: progress.status.to_string(),
            message: progress.message.clone(),
        });
        on_progress(progress);
    }

    fn emit(&self, event: BatchSyncEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::BatchSync(event)).ok();
        }
    }
}

impl std::fmt::Debug for BatchSyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSyncOrchestrator")
            .field("has_event_bus", &self.event_bus.is_some())
            .finish()
    }
}
