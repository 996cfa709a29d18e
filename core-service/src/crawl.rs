//! Periodic crawl-status polling.
//!
//! [`CrawlMonitor`] keeps the backend crawler's latest status in a
//! `watch` channel. A failed poll is read as "not crawling" so the UI never
//! gets stuck showing a crawl in progress. The polling task stops on
//! [`CrawlMonitor::stop`] or when the monitor is dropped.

use core_catalog::{CatalogGateway, CrawlStatus};
use core_runtime::events::{CoreEvent, CrawlEvent, EventBus};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct CrawlMonitor {
    gateway: Arc<dyn CatalogGateway>,
    interval: Duration,
    event_bus: Option<EventBus>,
    state: Arc<watch::Sender<CrawlStatus>>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CrawlMonitor {
    /// Creates an idle monitor. Nothing is polled until [`start`](Self::start)
    /// or [`refresh`](Self::refresh).
    pub fn new(gateway: Arc<dyn CatalogGateway>, interval: Duration) -> Self {
        let (state, _) = watch::channel(CrawlStatus::idle());
        Self {
            gateway,
            interval,
            event_bus: None,
            state: Arc::new(state),
            shutdown: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Spawns the polling loop; the first poll happens immediately.
    ///
    /// Calling it again while the loop runs has no effect. After
    /// [`stop`](Self::stop) the monitor cannot be restarted.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shutdown.is_cancelled() || task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let gateway = Arc::clone(&self.gateway);
        let state = Arc::clone(&self.state);
        let event_bus = self.event_bus.clone();
        let shutdown = self.shutdown.clone();
        let period = self.interval;

        info!(interval_ms = period.as_millis() as u64, "Starting crawl status monitor");
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Crawl status monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        poll_once(gateway.as_ref(), &state, event_bus.as_ref()).await;
                    }
                }
            }
        }));
    }

    /// Polls once right now and returns the resulting status.
    pub async fn refresh(&self) -> CrawlStatus {
        poll_once(self.gateway.as_ref(), &self.state, self.event_bus.as_ref()).await
    }

    /// Latest known status.
    pub fn status(&self) -> CrawlStatus {
        self.state.borrow().clone()
    }

    pub fn is_crawling(&self) -> bool {
        self.state.borrow().is_crawling
    }

    pub fn subscribe(&self) -> watch::Receiver<CrawlStatus> {
        self.state.subscribe()
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_running(&self) -> bool {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        !self.shutdown.is_cancelled() && task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for CrawlMonitor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for CrawlMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlMonitor")
            .field("interval", &self.interval)
            .field("is_crawling", &self.is_crawling())
            .field("stopped", &self.shutdown.is_cancelled())
            .finish()
    }
}

async fn poll_once(
    gateway: &dyn CatalogGateway,
    state: &watch::Sender<CrawlStatus>,
    event_bus: Option<&EventBus>,
) -> CrawlStatus {
    let status = match gateway.crawl_status().await {
        Ok(status) => status,
        Err(error) => {
            warn!(error = %error, "Crawl status poll failed; assuming idle");
            CrawlStatus::idle()
        }
    };

    let mut flipped = false;
    state.send_if_modified(|current| {
        if *current == status {
            return false;
        }
        flipped = current.is_crawling != status.is_crawling;
        *current = status.clone();
        true
    });

    if flipped {
        info!(is_crawling = status.is_crawling, "Crawl status changed");
        if let Some(bus) = event_bus {
            bus.emit(CoreEvent::Crawl(CrawlEvent::StatusChanged {
                is_crawling: status.is_crawling,
            }))
            .ok();
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core_catalog::{
        CatalogError, DetailUpdate, ImagePayload, Result, VideoDetail, VideoListRequest,
        VideoLookup, VideoRecord, ZoneStats,
    };
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers status polls from a script; the last entry repeats.
    struct ScriptedGateway {
        script: Mutex<VecDeque<Result<bool>>>,
        polls: AtomicUsize,
    }

    impl ScriptedGateway {
        fn new(script: Vec<Result<bool>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogGateway for ScriptedGateway {
        async fn list_dates(&self) -> Result<Vec<String>> {
            unimplemented!()
        }

        async fn fetch_videos(&self, _request: &VideoListRequest) -> Result<Vec<VideoRecord>> {
            unimplemented!()
        }

        async fn fetch_video_detail(&self, _lookup: &VideoLookup) -> Result<VideoDetail> {
            unimplemented!()
        }

        async fn update_video_detail(&self, _bvid: &str) -> Result<DetailUpdate> {
            unimplemented!()
        }

        async fn fetch_zone_stats(&self, _date: Option<&str>) -> Result<ZoneStats> {
            unimplemented!()
        }

        async fn crawl_status(&self) -> Result<CrawlStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            };
            next.map(|is_crawling| CrawlStatus {
                is_crawling,
                ..Default::default()
            })
        }

        async fn start_crawl(&self) -> Result<String> {
            unimplemented!()
        }

        async fn proxy_image(&self, _url: &str) -> Result<ImagePayload> {
            unimplemented!()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_and_reports_changes() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(false), Ok(true), Ok(true), Ok(false)]));
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let monitor = CrawlMonitor::new(gateway.clone(), Duration::from_secs(5)).with_event_bus(bus);
        let mut status = monitor.subscribe();

        monitor.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(gateway.polls.load(Ordering::SeqCst), 1);
        assert!(!monitor.is_crawling());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(monitor.is_crawling());
        assert!(status.has_changed().unwrap());
        status.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(gateway.polls.load(Ordering::SeqCst), 4);
        assert!(!monitor.is_crawling());

        let mut changes = Vec::new();
        while let Ok(CoreEvent::Crawl(CrawlEvent::StatusChanged { is_crawling })) = events.try_recv() {
            changes.push(is_crawling);
        }
        assert_eq!(changes, vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_reads_as_idle() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(true),
            Err(CatalogError::Network("connection refused".to_string())),
        ]));
        let monitor = CrawlMonitor::new(gateway, Duration::from_secs(5));

        assert!(monitor.refresh().await.is_crawling);
        assert!(!monitor.refresh().await.is_crawling);
        assert!(!monitor.is_crawling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_polling() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(false)]));
        let monitor = CrawlMonitor::new(gateway.clone(), Duration::from_secs(5));

        monitor.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        monitor.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(gateway.polls.load(Ordering::SeqCst), 1);
        assert!(!monitor.is_running());

        monitor.start();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(gateway.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_ends_polling() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(false)]));
        let monitor = CrawlMonitor::new(gateway.clone(), Duration::from_secs(5));

        monitor.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(monitor);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(gateway.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(false)]));
        let monitor = CrawlMonitor::new(gateway.clone(), Duration::from_secs(5));

        monitor.start();
        monitor.start();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(gateway.polls.load(Ordering::SeqCst), 1);
        assert!(monitor.is_running());
    }
}
