//! Refresh jobs: one asynchronous "fetch the items of this calendar over this range" operation
//!
//! A job is spawned on the tokio runtime, and streams its results back to the view that started it through the view event queue.
//! The view is the only one that acts on these results, so that its state is only ever mutated from a single place.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::calendar::{CalendarId, ItemFilter};
use crate::expander;
use crate::item::Item;
use crate::notification::ViewEvent;
use crate::occurrence::Occurrence;
use crate::range::DateRange;
use crate::registry::JobRegistry;
use crate::state::ViewFilters;
use crate::traits::{CalendarSource, QueryError};


/// The kind of operation that has completed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationType {
    Get,
    Add,
    Modify,
    Delete,
}

/// Unique identifier of a refresh job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a job is tracked by in the [`JobRegistry`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum JobKey {
    /// The aggregate calendar, refreshed as a whole
    Composite,
    Calendar(CalendarId),
}

impl JobKey {
    pub fn of(calendar: &dyn CalendarSource) -> Self {
        if calendar.is_composite() {
            JobKey::Composite
        } else {
            JobKey::Calendar(calendar.id().clone())
        }
    }

    pub fn is_composite(&self) -> bool {
        *self == JobKey::Composite
    }
}

impl Display for JobKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKey::Composite => write!(f, "composite"),
            JobKey::Calendar(id) => write!(f, "{}", id),
        }
    }
}


/// Travels along with every message a job sends, so that the view knows which job (and which range) results belong to
#[derive(Clone, Debug)]
pub struct JobTicket {
    id: JobId,
    key: JobKey,
    range: DateRange,
    cancelled: Arc<AtomicBool>,
}

impl JobTicket {
    pub fn id(&self) -> JobId { self.id }
    pub fn key(&self) -> &JobKey { &self.key }
    pub fn range(&self) -> &DateRange { &self.range }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Progress of a refresh job
#[derive(Debug)]
pub enum JobEvent {
    /// A batch of results
    Results { ticket: JobTicket, result: Result<Vec<Item>, QueryError> },
    /// The query is over. This is always the last event of a job (unless it has been aborted)
    Completed { ticket: JobTicket, status: Result<(), QueryError> },
}

impl JobEvent {
    pub fn ticket(&self) -> &JobTicket {
        match self {
            JobEvent::Results{ ticket, .. } => ticket,
            JobEvent::Completed{ ticket, .. } => ticket,
        }
    }
}


/// Receives the results of a calendar query.
///
/// Calendars call [`ResultListener::on_result`] once per batch of items they have found.
pub struct ResultListener {
    ticket: JobTicket,
    sender: UnboundedSender<ViewEvent>,
}

impl ResultListener {
    /// Create a listener that is not bound to any refresh job. Its results are sent as [`JobEvent::Results`] to `sender`
    pub fn new(key: JobKey, range: DateRange, sender: UnboundedSender<ViewEvent>) -> Self {
        let ticket = JobTicket {
            id: JobId::next(),
            key,
            range,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        Self { ticket, sender }
    }

    pub fn ticket(&self) -> &JobTicket {
        &self.ticket
    }

    /// Whether the job this listener belongs to has been canceled. Calendars may use this to stop early
    pub fn is_cancelled(&self) -> bool {
        self.ticket.is_cancelled()
    }

    pub fn on_result(&self, result: Result<Vec<Item>, QueryError>) {
        if self.is_cancelled() {
            return;
        }
        let event = JobEvent::Results{ ticket: self.ticket.clone(), result };
        if self.sender.send(ViewEvent::Job(event)).is_err() {
            log::trace!("View is gone, dropping results of refresh job for {}", self.ticket.key);
        }
    }

    fn complete(self, status: Result<(), QueryError>) {
        let event = JobEvent::Completed{ ticket: self.ticket, status };
        let _ = self.sender.send(ViewEvent::Job(event));
    }
}


/// Completes a job whose calendar query has panicked, so that the view does not wait for it forever
struct PanicGuard<'a> {
    listener: &'a ResultListener,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() == false {
            return;
        }
        let ticket = self.listener.ticket.clone();
        log::warn!("Refresh of calendar {} has panicked", ticket.key);
        let status: Result<(), QueryError> = Err(format!("Query of calendar {} has panicked", ticket.key).into());
        let _ = self.listener.sender.send(ViewEvent::Job(JobEvent::Completed{ ticket, status }));
    }
}


/// What [`RefreshJob::execute`] has done
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execution {
    /// Nothing, because the view has no range or no calendar yet
    Skipped,
    /// A query has been started
    Started,
    /// A query over the composite calendar has been started, every other pending job has been canceled.
    /// The view must discard what it currently displays
    Composite,
}


/// A cancellable refresh of one calendar over one date range
pub struct RefreshJob {
    id: JobId,
    calendar: Option<Arc<dyn CalendarSource>>,
    range: Option<DateRange>,
    filters: ViewFilters,
    sender: UnboundedSender<ViewEvent>,

    cancelled: Arc<AtomicBool>,
    operation: Option<JoinHandle<()>>,
}

impl RefreshJob {
    pub fn new(calendar: Option<Arc<dyn CalendarSource>>, range: Option<DateRange>, filters: ViewFilters, sender: UnboundedSender<ViewEvent>) -> Self {
        Self {
            id: JobId::next(),
            calendar, range, filters, sender,
            cancelled: Arc::new(AtomicBool::new(false)),
            operation: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// The registry key of this job, if it has a calendar
    pub fn key(&self) -> Option<JobKey> {
        self.calendar.as_ref().map(|cal| JobKey::of(cal.as_ref()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The filter flags sent to the calendar
    pub fn query_filter(&self) -> ItemFilter {
        let mut filter = ItemFilter::CLASS_OCCURRENCES;
        if self.filters.show_completed {
            filter |= ItemFilter::COMPLETED_ALL;
        } else {
            filter |= ItemFilter::COMPLETED_NO;
        }

        if self.filters.tasks_in_view {
            filter |= ItemFilter::TYPE_ALL;
        } else {
            filter |= ItemFilter::TYPE_EVENT;
        }
        filter
    }

    /// Start the query, and track this job in `registry`.
    ///
    /// A composite refresh supersedes every pending refresh, that are all canceled.
    /// Otherwise, only a pending refresh of the same calendar is canceled.
    ///
    /// This spawns a task, and must thus be called from within a tokio runtime
    pub fn execute(mut self, registry: &mut JobRegistry) -> Execution {
        let (calendar, range) = match (&self.calendar, self.range) {
            (Some(calendar), Some(range)) => (Arc::clone(calendar), range),
            _ => return Execution::Skipped,
        };
        let key = JobKey::of(calendar.as_ref());

        let execution = if key.is_composite() {
            log::info!("Refreshing composite calendar, cancelling all pending refreshes");
            registry.cancel_all();
            Execution::Composite
        } else {
            registry.cancel(&key);
            Execution::Started
        };

        let filter = self.query_filter();
        log::info!("Refreshing calendar {} over {}", key, range);
        let listener = ResultListener {
            ticket: JobTicket {
                id: self.id,
                key,
                range,
                cancelled: Arc::clone(&self.cancelled),
            },
            sender: self.sender.clone(),
        };

        self.operation = Some(tokio::spawn(async move {
            let status = {
                let _guard = PanicGuard{ listener: &listener };
                calendar.get_items(filter, 0, range, &listener).await
            };
            listener.complete(status);
        }));

        registry.submit(self);
        execution
    }

    /// Mark this job as canceled, and abort its query if it is still pending.
    ///
    /// Returns whether this call actually canceled the job (i.e. `false` if it had already been canceled)
    pub fn cancel(&mut self) -> bool {
        let newly_cancelled = self.cancelled.swap(true, Ordering::SeqCst) == false;
        if newly_cancelled {
            match self.key() {
                Some(key) => log::info!("Refresh cancelled for calendar {}", key),
                None => log::info!("Refresh cancelled"),
            }
        }
        if let Some(operation) = self.operation.take() {
            operation.abort();
        }
        newly_cancelled
    }
}

/// Turns a batch of query results into the occurrences a view should display.
///
/// Tasks without any date are dropped. Recurring items the calendar did not expand are expanded over the job range
pub fn relevant_occurrences(ticket: &JobTicket, items: Vec<Item>) -> Vec<Occurrence> {
    let range = *ticket.range();
    items.into_iter()
        .filter(|item| {
            if item.is_dateless_task() {
                log::trace!("Ignoring dateless task {}", item.id());
                return false;
            }
            true
        })
        .flat_map(|item| expander::expand(&item, &range).collect::<Vec<_>>())
        .collect()
}
