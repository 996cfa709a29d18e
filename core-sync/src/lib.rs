//! # Batch Sync Module
//!
//! Re-fetches per-video detail records for a whole day's catalog.
//!
//! ## Overview
//!
//! - Fetches the day's full catalog through `CatalogGateway`
//! - Requests a detail update for each video, strictly sequentially
//! - Paces requests through a pluggable `RateLimiter`
//! - Reports per-item progress and returns aggregated counts
//!
//! ## Components
//!
//! - **Progress & Results** (`job`): Notification and result types
//! - **Rate Limiter** (`rate_limiter`): Minimum spacing between requests
//! - **Orchestrator** (`orchestrator`): The fail-soft batch loop

pub mod error;
pub mod job;
pub mod orchestrator;
pub mod rate_limiter;

pub use error::{Result, SyncError};
pub use job::{BatchSyncProgress, BatchSyncResult, BatchSyncStatus, ItemOutcome, ItemReport};
pub use orchestrator::BatchSyncOrchestrator;
pub use rate_limiter::{FixedSpacingLimiter, RateLimiter};
