//! Owns the catalog filter and turns user edits into engine queries.
//!
//! - Date, sort and zone edits reset the page to 1 and query immediately.
//! - Page edits query immediately and keep everything else.
//! - Search edits are debounced: only a term that stays unchanged for the
//!   quiet period is applied.
//!
//! Each edit reserves its query generation while the filter lock is held,
//! so the engine orders queries by edit, whatever order the spawned tasks
//! happen to run in.
//!
//! All timers and spawned queries hang off one [`CancellationToken`], which
//! `shutdown()` (or dropping the controller) cancels.

use crate::engine::{CatalogQueryEngine, QueryOutcome, QueryTicket};
use crate::query::{QueryFilter, SortField, SortOrder};
use crate::zones::ZoneId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Resolves to `None` when the query was cancelled or not needed.
pub type QueryHandle = JoinHandle<Option<QueryOutcome>>;

pub struct QueryController {
    engine: Arc<CatalogQueryEngine>,
    filter: Arc<Mutex<QueryFilter>>,
    debounce: Duration,
    shutdown: CancellationToken,
    pending_search: Mutex<Option<CancellationToken>>,
}

impl QueryController {
    pub fn new(engine: Arc<CatalogQueryEngine>, initial: QueryFilter, debounce: Duration) -> Self {
        Self {
            engine,
            filter: Arc::new(Mutex::new(initial)),
            debounce,
            shutdown: CancellationToken::new(),
            pending_search: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<CatalogQueryEngine> {
        &self.engine
    }

    /// The committed filter (a pending search term is not included).
    pub fn filter(&self) -> QueryFilter {
        lock(&self.filter).clone()
    }

    /// Re-runs the current filter.
    pub fn refresh(&self) -> QueryHandle {
        let (ticket, filter) = {
            let filter = lock(&self.filter);
            (self.engine.begin(), filter.clone())
        };
        self.issue(ticket, filter)
    }

    pub fn set_date(&self, date: impl Into<String>) -> QueryHandle {
        let date = date.into();
        self.update(|filter| filter.date = date)
    }

    pub fn set_sort(&self, sort_by: SortField, order: SortOrder) -> QueryHandle {
        self.update(|filter| {
            filter.sort_by = sort_by;
            filter.order = order;
        })
    }

    /// Selecting a main zone clears the sub-zone.
    pub fn set_main_zone(&self, main_zone: Option<ZoneId>) -> QueryHandle {
        self.update(|filter| {
            filter.main_zone = main_zone;
            filter.sub_zone = None;
        })
    }

    pub fn set_sub_zone(&self, sub_zone: Option<ZoneId>) -> QueryHandle {
        self.update(|filter| filter.sub_zone = sub_zone)
    }

    /// Moves to `page` (clamped to at least 1) without touching anything else.
    pub fn set_page(&self, page: u32) -> QueryHandle {
        let (ticket, filter) = {
            let mut filter = lock(&self.filter);
            filter.page = page.max(1);
            (self.engine.begin(), filter.clone())
        };
        self.issue(ticket, filter)
    }

    /// Schedules `term` to be applied after the debounce period.
    ///
    /// A later call before the period ends replaces this one. When it fires,
    /// an unchanged term issues nothing.
    pub fn set_search(&self, term: impl Into<String>) -> QueryHandle {
        let term = term.into();
        let token = self.shutdown.child_token();
        if let Some(previous) = lock(&self.pending_search).replace(token.clone()) {
            previous.cancel();
        }

        let engine = Arc::clone(&self.engine);
        let filter = Arc::clone(&self.filter);
        let shutdown = self.shutdown.clone();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!("Search edit replaced before debounce elapsed");
                    None
                }
                _ = tokio::time::sleep(debounce) => {
                    let (ticket, next) = {
                        let mut filter = lock(&filter);
                        if filter.search == term {
                            return None;
                        }
                        filter.search = term;
                        filter.page = 1;
                        (engine.begin(), filter.clone())
                    };
                    debug!(search = %next.search, generation = ticket.generation(), "Applying debounced search");
                    tokio::select! {
                        _ = shutdown.cancelled() => None,
                        outcome = engine.query_as(ticket, next) => Some(outcome),
                    }
                }
            }
        })
    }

    /// Cancels pending debounce timers and in-flight queries.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Applies a non-page edit: page goes back to 1.
    fn update(&self, edit: impl FnOnce(&mut QueryFilter)) -> QueryHandle {
        let (ticket, filter) = {
            let mut filter = lock(&self.filter);
            edit(&mut filter);
            filter.page = 1;
            (self.engine.begin(), filter.clone())
        };
        self.issue(ticket, filter)
    }

    fn issue(&self, ticket: QueryTicket, filter: QueryFilter) -> QueryHandle {
        let engine = Arc::clone(&self.engine);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => None,
                outcome = engine.query_as(ticket, filter) => Some(outcome),
            }
        })
    }
}

impl Drop for QueryController {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for QueryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryController")
            .field("filter", &self.filter())
            .field("debounce", &self.debounce)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
