//! # Catalog Query Engine
//!
//! Turns a [`QueryFilter`] into a [`QueryResult`] and publishes it as the
//! current view, keeping that view on the *most recent* request even when
//! responses come back out of order.
//!
//! ## Supersession
//!
//! Every query holds a [`QueryTicket`] carrying the next generation number,
//! taken synchronously by [`CatalogQueryEngine::begin`]. A response is
//! published only if its generation is still the latest when it arrives;
//! otherwise it is dropped and the caller gets [`QueryOutcome::Superseded`].
//!
//! ## In-flight signal
//!
//! `QuerySnapshot::in_flight` goes up when a query starts and comes down once
//! the data is published *and* the settle delay since the start has passed,
//! or when the latest query is abandoned before it lands. It exists for
//! transition animations only.
//!
//! ## Failures
//!
//! A gateway error publishes an empty result with `error` set, so a consumer
//! can tell "no matches" from "fetch failed". Nothing is thrown at the UI.

use crate::error::CatalogError;
use crate::gateway::CatalogGateway;
use crate::models::VideoRecord;
use crate::pagination::Page;
use crate::query::{apply_filter, QueryFilter, QueryResult};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// What the UI should currently show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    /// Generation that produced `result`; 0 before the first query lands.
    pub generation: u64,
    pub filter: Option<QueryFilter>,
    pub result: QueryResult,
    pub error: Option<CatalogError>,
    pub in_flight: bool,
}

impl QuerySnapshot {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// The result as a page, once a query has landed.
    pub fn page(&self) -> Option<Page<VideoRecord>> {
        self.filter
            .as_ref()
            .map(|filter| self.result.clone().into_page(filter))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Applied {
        generation: u64,
        result: QueryResult,
    },
    /// Published as an empty result with the error attached.
    Failed {
        generation: u64,
        error: CatalogError,
    },
    /// A newer query started before this one's response arrived.
    Superseded { generation: u64, latest: u64 },
}

impl QueryOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            QueryOutcome::Applied { generation, .. }
            | QueryOutcome::Failed { generation, .. }
            | QueryOutcome::Superseded { generation, .. } => *generation,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, QueryOutcome::Superseded { .. })
    }
}

pub struct CatalogQueryEngine {
    gateway: Arc<dyn CatalogGateway>,
    event_bus: Option<EventBus>,
    settle_delay: Duration,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<QuerySnapshot>>,
}

impl CatalogQueryEngine {
    pub fn new(gateway: Arc<dyn CatalogGateway>, settle_delay: Duration) -> Self {
        let (state, _) = watch::channel(QuerySnapshot::default());
        Self {
            gateway,
            event_bus: None,
            settle_delay,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Receiver that is notified whenever the displayed snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.state.borrow().clone()
    }

    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Runs one query and publishes it unless a newer one has started.
    pub async fn query(&self, filter: QueryFilter) -> QueryOutcome {
        let ticket = self.begin();
        self.query_as(ticket, filter).await
    }

    /// Reserves the next generation and raises `in_flight`.
    ///
    /// Generations are ordered by the call to `begin`, not by when the query
    /// future is first polled. Callers that spawn the query should reserve
    /// the ticket before spawning.
    pub fn begin(&self) -> QueryTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|snapshot| snapshot.in_flight = true);
        QueryTicket {
            generation,
            started: Instant::now(),
            state: Arc::clone(&self.state),
            latest: Arc::clone(&self.generation),
            landed: false,
        }
    }

    /// Runs the query reserved by `ticket`.
    ///
    /// Dropping the returned future before it completes lowers `in_flight`
    /// again if this generation is still the latest.
    #[instrument(skip(self, ticket, filter), fields(generation = ticket.generation, date = %filter.date, page = filter.page))]
    pub async fn query_as(&self, mut ticket: QueryTicket, filter: QueryFilter) -> QueryOutcome {
        let generation = ticket.generation;

        debug!(generation, "Fetching catalog");
        let (result, error) = match self.gateway.fetch_videos(&filter.list_request()).await {
            Ok(records) => (apply_filter(records, &filter), None),
            Err(error) => {
                warn!(generation, error = %error, "Catalog fetch failed");
                (QueryResult::empty(), Some(error))
            }
        };

        let published = self.state.send_if_modified(|snapshot| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *snapshot = QuerySnapshot {
                generation,
                filter: Some(filter.clone()),
                result: result.clone(),
                error: error.clone(),
                in_flight: true,
            };
            true
        });

        if !published {
            let latest = self.latest_generation();
            debug!(generation, latest, "Dropping superseded catalog response");
            self.emit(CatalogEvent::QuerySuperseded { generation, latest });
            return QueryOutcome::Superseded { generation, latest };
        }

        ticket.landed = true;
        self.schedule_settle(generation, ticket.started);

        match error {
            None => {
                self.emit(CatalogEvent::QueryApplied {
                    generation,
                    date: filter.date.clone(),
                    page: filter.page,
                    total_count: result.total_count,
                });
                QueryOutcome::Applied { generation, result }
            }
            Some(error) => {
                self.emit(CatalogEvent::QueryFailed {
                    generation,
                    date: filter.date.clone(),
                    message: error.to_string(),
                });
                QueryOutcome::Failed { generation, error }
            }
        }
    }

    /// Clears `in_flight` once the settle delay since `started` has elapsed,
    /// provided `generation` is still the one on display.
    fn schedule_settle(&self, generation: u64, started: Instant) {
        let remaining = self.settle_delay.saturating_sub(started.elapsed());
        let state = Arc::clone(&self.state);
        let latest = Arc::clone(&self.generation);

        let settle = move || {
            lower_in_flight(&state, &latest, generation, |snapshot| {
                snapshot.generation == generation
            });
        };

        if remaining.is_zero() {
            settle();
        } else {
            tokio::spawn(async move {
                tokio::time::sleep(remaining).await;
                settle();
            });
        }
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Catalog(event)).ok();
        }
    }
}

/// A generation reserved by [`CatalogQueryEngine::begin`].
pub struct QueryTicket {
    generation: u64,
    started: Instant,
    state: Arc<watch::Sender<QuerySnapshot>>,
    latest: Arc<AtomicU64>,
    landed: bool,
}

impl QueryTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for QueryTicket {
    fn drop(&mut self) {
        if !self.landed {
            lower_in_flight(&self.state, &self.latest, self.generation, |_| true);
        }
    }
}

impl std::fmt::Debug for QueryTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryTicket")
            .field("generation", &self.generation)
            .field("landed", &self.landed)
            .finish()
    }
}

/// Clears `in_flight` if `generation` is still the latest and `applies` holds.
fn lower_in_flight(
    state: &watch::Sender<QuerySnapshot>,
    latest: &AtomicU64,
    generation: u64,
    applies: impl Fn(&QuerySnapshot) -> bool,
) {
    state.send_if_modified(|snapshot| {
        let current = latest.load(Ordering::SeqCst) == generation && applies(snapshot);
        if current && snapshot.in_flight {
            snapshot.in_flight = false;
            true
        } else {
            false
        }
    });
}

impl std::fmt::Debug for CatalogQueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogQueryEngine")
            .field("settle_delay", &self.settle_delay)
            .field("latest_generation", &self.latest_generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::gateway::VideoListRequest;
    use crate::models::{
        CrawlStatus, DetailUpdate, ImagePayload, RawVideoRecord, VideoDetail, VideoLookup,
        ZoneStats,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers `fetch_videos` from a fixed catalog, or fails if told to.
    struct StaticGateway {
        records: Vec<VideoRecord>,
        fail_with: Option<CatalogError>,
        requests: Mutex<Vec<VideoListRequest>>,
    }

    impl StaticGateway {
        fn new(records: Vec<VideoRecord>) -> Self {
            Self {
                records,
                fail_with: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: CatalogError) -> Self {
            Self {
                fail_with: Some(error),
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl CatalogGateway for StaticGateway {
        async fn list_dates(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn fetch_videos(&self, request: &VideoListRequest) -> Result<Vec<VideoRecord>> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(self.records.clone()),
            }
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
            unimplemented!()
        }

        async fn start_crawl(&self) -> Result<String> {
            unimplemented!()
        }

        async fn proxy_image(&self, _url: &str) -> Result<ImagePayload> {
            unimplemented!()
        }
    }

    fn records(titles: &[&str]) -> Vec<VideoRecord> {
        titles
            .iter()
            .enumerate()
            .map(|(n, title)| {
                RawVideoRecord {
                    bvid: Some(format!("BV{n}")),
                    title: Some(title.to_string()),
                    ..Default::default()
                }
                .into()
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_publishes_filtered_page() {
        let gateway = Arc::new(StaticGateway::new(records(&["魔理沙A", "灵梦", "魔理沙B"])));
        let engine = CatalogQueryEngine::new(gateway.clone(), Duration::from_millis(300));

        let outcome = engine
            .query(QueryFilter::new("2025-08-13").with_search("魔理沙"))
            .await;

        match outcome {
            QueryOutcome::Applied { generation, result } => {
                assert_eq!(generation, 1);
                assert_eq!(result.total_count, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.result.items.len(), 2);
        assert!(!snapshot.is_failed());

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[0].date.as_deref(), Some("2025-08-13"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_clears_after_settle_delay() {
        let gateway = Arc::new(StaticGateway::new(records(&["a"])));
        let engine = CatalogQueryEngine::new(gateway, Duration::from_millis(300));

        engine.query(QueryFilter::new("2025-08-13")).await;
        assert!(engine.snapshot().in_flight);

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(engine.snapshot().in_flight);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!engine.snapshot().in_flight);
    }

    #[tokio::test]
    async fn test_zero_settle_delay_clears_immediately() {
        let gateway = Arc::new(StaticGateway::new(records(&["a"])));
        let engine = CatalogQueryEngine::new(gateway, Duration::ZERO);

        engine.query(QueryFilter::new("2025-08-13")).await;
        assert!(!engine.snapshot().in_flight);
    }

    #[tokio::test]
    async fn test_gateway_failure_publishes_empty_result_with_error() {
        let gateway = Arc::new(StaticGateway::failing(CatalogError::Network(
            "connection refused".to_string(),
        )));
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let engine = CatalogQueryEngine::new(gateway, Duration::ZERO).with_event_bus(bus);

        let outcome = engine.query(QueryFilter::new("2025-08-13")).await;
        assert!(matches!(outcome, QueryOutcome::Failed { .. }));

        let snapshot = engine.snapshot();
        assert!(snapshot.is_failed());
        assert!(snapshot.result.items.is_empty());
        assert_eq!(snapshot.result.total_count, 0);

        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Catalog(CatalogEvent::QueryFailed { generation: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_generation_follows_reservation_order() {
        let gateway = Arc::new(StaticGateway::new(records(&["a"])));
        let engine = CatalogQueryEngine::new(gateway, Duration::ZERO);

        let older = engine.begin();
        let newer = engine.begin();
        assert_eq!((older.generation(), newer.generation()), (1, 2));

        let applied = engine.query_as(newer, QueryFilter::new("2025-08-13")).await;
        assert!(matches!(applied, QueryOutcome::Applied { generation: 2, .. }));

        let late = engine.query_as(older, QueryFilter::new("2025-08-12")).await;
        assert_eq!(late, QueryOutcome::Superseded { generation: 1, latest: 2 });
        assert_eq!(engine.snapshot().filter.unwrap().date, "2025-08-13");
    }

    #[tokio::test]
    async fn test_abandoned_query_lowers_in_flight() {
        let gateway = Arc::new(StaticGateway::new(records(&["a"])));
        let engine = CatalogQueryEngine::new(gateway, Duration::from_millis(300));

        let pending = engine.query_as(engine.begin(), QueryFilter::new("2025-08-13"));
        assert!(engine.snapshot().in_flight);

        drop(pending);
        assert!(!engine.snapshot().in_flight);
        assert_eq!(engine.snapshot().generation, 0);
    }

    #[tokio::test]
    async fn test_abandoned_older_ticket_keeps_newer_in_flight() {
        let gateway = Arc::new(StaticGateway::new(records(&["a"])));
        let engine = CatalogQueryEngine::new(gateway, Duration::from_millis(300));

        let older = engine.begin();
        let _newer = engine.begin();
        drop(older);

        assert!(engine.snapshot().in_flight);
    }

    #[tokio::test]
    async fn test_out_of_range_page_is_empty_not_error() {
        let gateway = Arc::new(StaticGateway::new(records(&["a", "b"])));
        let engine = CatalogQueryEngine::new(gateway, Duration::ZERO);

        let outcome = engine
            .query(QueryFilter::new("2025-08-13").with_page(5, 15))
            .await;

        match outcome {
            QueryOutcome::Applied { result, .. } => {
                assert!(result.items.is_empty());
                assert_eq!(result.total_count, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(engine.snapshot().page().unwrap().total_pages, 1);
    }
}
