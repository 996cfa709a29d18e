//! Request pacing for batch work.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Gate passed before every outbound request of a batch.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Resolves once the next request may be sent.
    async fn acquire(&self);
}

/// Enforces a minimum spacing between consecutive acquisitions.
///
/// The first acquisition is immediate. Concurrent callers queue on the
/// internal lock, so spacing also holds across tasks.
#[derive(Debug)]
pub struct FixedSpacingLimiter {
    spacing: Duration,
    last: Mutex<Option<Instant>>,
}

impl FixedSpacingLimiter {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last: Mutex::new(None),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }
}

#[async_trait]
impl RateLimiter for FixedSpacingLimiter {
    async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.spacing;
            if ready_at > Instant::now() {
                debug!("Rate limiting: waiting {:?}", ready_at - Instant::now());
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let limiter = FixedSpacingLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        limiter.acquire().await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_acquires_are_spaced() {
        let limiter = FixedSpacingLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_work_counts_toward_spacing() {
        let limiter = FixedSpacingLimiter::new(Duration::from_millis(100));
        limiter.acquire().await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        let before = Instant::now();
        limiter.acquire().await;

        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_holds_across_tasks() {
        let limiter = Arc::new(FixedSpacingLimiter::new(Duration::from_millis(100)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        assert_eq!(
            times,
            vec![
                Duration::ZERO,
                Duration::from_millis(100),
                Duration::from_millis(200)
            ]
        );
    }
}
