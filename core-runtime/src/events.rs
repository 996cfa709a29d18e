//! # Event Bus System
//!
//! Typed event broadcasting for the catalog core, built on
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! Components publish what happened; hosts subscribe and render. Nothing in
//! the core depends on an event being received, so emitting with no
//! subscribers is harmless.
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐  subscribe   ┌────────────┐
//! │ CatalogQueryEng. ├──────────>│           ├─────────────>│ UI binding │
//! └──────────────────┘           │ EventBus  │              └────────────┘
//! ┌──────────────────┐   emit    │ (broadcast│  subscribe   ┌────────────┐
//! │ BatchSyncOrch.   ├──────────>│  channel) ├─────────────>│ Logger     │
//! └──────────────────┘           │           │              └────────────┘
//! ┌──────────────────┐   emit    │           │
//! │ CrawlMonitor     ├──────────>│           │
//! └──────────────────┘           └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, CrawlEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Crawl(CrawlEvent::StatusChanged { is_crawling: true }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Crawl(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep reading.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// A batch run over a full day emits two progress events per video, so the
/// buffer is sized for bursts of a few hundred.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Catalog query lifecycle
    Catalog(CatalogEvent),
    /// Batch detail synchronization
    BatchSync(BatchSyncEvent),
    /// Backend crawler status and control
    Crawl(CrawlEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Catalog(e) => e.description(),
            CoreEvent::BatchSync(e) => e.description(),
            CoreEvent::Crawl(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Catalog(CatalogEvent::QueryFailed { .. }) => EventSeverity::Warning,
            CoreEvent::BatchSync(BatchSyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Crawl(CrawlEvent::StartFailed { .. }) => EventSeverity::Error,
            CoreEvent::BatchSync(BatchSyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Crawl(CrawlEvent::StartRequested { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Catalog query events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// A query result became the displayed result.
    QueryApplied {
        generation: u64,
        date: String,
        page: u32,
        total_count: usize,
    },
    /// The gateway failed; the displayed result is empty with an error attached.
    QueryFailed {
        generation: u64,
        date: String,
        message: String,
    },
    /// A response arrived after a newer query had been issued and was dropped.
    QuerySuperseded { generation: u64, latest: u64 },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::QueryApplied { .. } => "Catalog query applied",
            CatalogEvent::QueryFailed { .. } => "Catalog query failed",
            CatalogEvent::QuerySuperseded { .. } => "Catalog query superseded",
        }
    }
}

/// Batch detail-synchronization events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BatchSyncEvent {
    Started {
        date: String,
        total: usize,
    },
    Progress {
        date: String,
        current: usize,
        total: usize,
        percentage: u8,
        status: String,
        message: String,
    },
    Completed {
        date: String,
        success: usize,
        skipped: usize,
        failed: usize,
    },
    /// The run could not start (catalog fetch failed or the day is empty).
    Failed {
        date: String,
        message: String,
    },
}

impl BatchSyncEvent {
    fn description(&self) -> &str {
        match self {
            BatchSyncEvent::Started { .. } => "Batch sync started",
            BatchSyncEvent::Progress { .. } => "Batch sync progress",
            BatchSyncEvent::Completed { .. } => "Batch sync completed",
            BatchSyncEvent::Failed { .. } => "Batch sync failed",
        }
    }
}

/// Backend crawler events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CrawlEvent {
    StatusChanged { is_crawling: bool },
    StartRequested { message: String },
    StartFailed { message: String },
}

impl CrawlEvent {
    fn description(&self) -> &str {
        match self {
            CrawlEvent::StatusChanged { .. } => "Crawl status changed",
            CrawlEvent::StartRequested { .. } => "Crawl start requested",
            CrawlEvent::StartFailed { .. } => "Crawl start failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every `subscribe()` gets an independent
/// receiver that sees events emitted after it subscribed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none. Callers that don't care use `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(16);
/// let batch_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::BatchSync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. `None` when nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn crawl_started() -> CoreEvent {
        CoreEvent::Crawl(CrawlEvent::StartRequested {
            message: "热门视频爬取任务已启动".to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(crawl_started()).is_err());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.emit(crawl_started()).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap(), crawl_started());
        assert_eq!(second.recv().await.unwrap(), crawl_started());
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|e| matches!(e, CoreEvent::BatchSync(_)));

        bus.emit(crawl_started()).unwrap();
        bus.emit(CoreEvent::BatchSync(BatchSyncEvent::Started {
            date: "2025-08-13".to_string(),
            total: 20,
        }))
        .unwrap();

        let event = stream.recv().await.unwrap();
        assert!(matches!(
            event,
            CoreEvent::BatchSync(BatchSyncEvent::Started { total: 20, .. })
        ));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut receiver = bus.subscribe();

        for _ in 0..5 {
            bus.emit(crawl_started()).unwrap();
        }

        assert!(matches!(receiver.recv().await, Err(RecvError::Lagged(_))));
        assert!(receiver.recv().await.is_ok());
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::BatchSync(BatchSyncEvent::Failed {
            date: "2025-08-13".to_string(),
            message: "2025-08-13 没有找到任何视频数据".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let superseded = CoreEvent::Catalog(CatalogEvent::QuerySuperseded {
            generation: 1,
            latest: 2,
        });
        assert_eq!(superseded.severity(), EventSeverity::Debug);
        assert!(EventSeverity::Error > EventSeverity::Warning);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Catalog(CatalogEvent::QueryApplied {
            generation: 3,
            date: "2025-08-13".to_string(),
            page: 1,
            total_count: 2,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Catalog\""));
        assert!(json.contains("\"event\":\"QueryApplied\""));

        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.description(), "Catalog query applied");
    }
}
