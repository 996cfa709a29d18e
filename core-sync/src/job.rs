//! # Batch Sync Progress and Results
//!
//! Types reported while a batch detail sync walks a day's catalog.
//!
//! ## Notification sequence
//!
//! ```text
//! item 1: Processing → Success | Skipped | Error
//! item 2: Processing → Success | Skipped | Error
//! ...
//! Completed (percentage 100)
//! ```
//!
//! A run that cannot start (fetch failed, empty day) reports a single
//! `Error` notification instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchSyncStatus {
    /// The item's update request is about to be sent
    Processing,
    Success,
    /// The server reported the item was already current
    Skipped,
    Error,
    /// Terminal notification of a run
    Completed,
}

impl BatchSyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchSyncStatus::Processing => "processing",
            BatchSyncStatus::Success => "success",
            BatchSyncStatus::Skipped => "skipped",
            BatchSyncStatus::Error => "error",
            BatchSyncStatus::Completed => "completed",
        }
    }

    /// True for the per-item outcomes (success, skipped, error).
    pub fn is_item_outcome(&self) -> bool {
        matches!(
            self,
            BatchSyncStatus::Success | BatchSyncStatus::Skipped | BatchSyncStatus::Error
        )
    }
}

impl fmt::Display for BatchSyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Progress
// ============================================================================

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSyncProgress {
    /// 1-based position of the item; equals `total` on completion
    pub current: usize,
    pub total: usize,
    /// `round(current / total * 100)`
    pub percentage: u8,
    pub status: BatchSyncStatus,
    pub message: String,
    /// Title (or bvid) of the item being processed
    pub current_video: Option<String>,
}

impl BatchSyncProgress {
    pub(crate) fn item(
        index: usize,
        total: usize,
        name: &str,
        status: BatchSyncStatus,
        message: String,
    ) -> Self {
        let current = index + 1;
        Self {
            current,
            total,
            percentage: percentage(current, total),
            status,
            message,
            current_video: Some(name.to_string()),
        }
    }

    pub(crate) fn completed(result: &BatchSyncResult) -> Self {
        Self {
            current: result.total_videos,
            total: result.total_videos,
            percentage: 100,
            status: BatchSyncStatus::Completed,
            message: result.summary_message(),
            current_video: None,
        }
    }

    pub(crate) fn aborted(message: String) -> Self {
        Self {
            current: 0,
            total: 0,
            percentage: 0,
            status: BatchSyncStatus::Error,
            message: format!("批量更新失败: {}", message),
            current_video: None,
        }
    }
}

fn percentage(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((current as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ItemOutcome {
    Success { message: Option<String> },
    Skipped { reason: Option<String> },
    Failed { error: String },
}

impl ItemOutcome {
    pub fn status(&self) -> BatchSyncStatus {
        match self {
            ItemOutcome::Success { .. } => BatchSyncStatus::Success,
            ItemOutcome::Skipped { .. } => BatchSyncStatus::Skipped,
            ItemOutcome::Failed { .. } => BatchSyncStatus::Error,
        }
    }
}

/// Outcome for one video, keyed by its catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub id: String,
    pub bvid: Option<String>,
    pub title: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Aggregate of one run.
///
/// `success_count + skipped_count + failed_count == total_videos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSyncResult {
    pub date: String,
    pub total_videos: usize,
    pub success_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    /// One entry per item, in catalog order
    pub results: Vec<ItemReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchSyncResult {
    pub(crate) fn new(date: &str, total_videos: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            date: date.to_string(),
            total_videos,
            success_count: 0,
            skipped_count: 0,
            failed_count: 0,
            results: Vec::with_capacity(total_videos),
            started_at,
            finished_at: started_at,
        }
    }

    pub(crate) fn record(&mut self, report: ItemReport) {
        match report.outcome {
            ItemOutcome::Success { .. } => self.success_count += 1,
            ItemOutcome::Skipped { .. } => self.skipped_count += 1,
            ItemOutcome::Failed { .. } => self.failed_count += 1,
        }
        self.results.push(report);
    }

    pub fn processed(&self) -> usize {
        self.success_count + self.skipped_count + self.failed_count
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count > 0
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn summary_message(&self) -> String {
        format!(
            "批量更新完成！成功: {}, 跳过: {}, 失败: {}",
            self.success_count, self.skipped_count, self.failed_count
        )
    }
}
