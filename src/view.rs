//! Calendar views
//!
//! A [`CalendarView`] owns everything a view displays ([`ViewState`]) and the refresh jobs it has started ([`JobRegistry`]).
//! Hosts notify it through its [`Observer`] handle; the view handles these notifications (and the progress of its own refresh jobs) one at a time, from its event queue.
//! What ends up being displayed is forwarded to a [`ViewRenderer`].

use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config;
use crate::item::Item;
use crate::notification::{Observer, ViewEvent};
use crate::observer::{ViewHooks, ViewObserver};
use crate::occurrence::Occurrence;
use crate::range::DateRange;
use crate::refresh::{self, Execution, JobEvent, JobKey, OperationType, RefreshJob};
use crate::registry::JobRegistry;
use crate::state::{ViewFilters, ViewState};
use crate::traits::{AlarmService, CalendarSource, PreferenceStore, ViewRenderer};


/// Errors of operations a view may not be able to perform
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewError {
    /// This view does not support this operation
    Unsupported(&'static str),
    /// This view has no display calendar or no range yet
    NotInitialized,
}

impl Display for ViewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewError::Unsupported(operation) => write!(f, "this view does not support {}", operation),
            ViewError::NotInitialized => write!(f, "this view has not been initialized"),
        }
    }
}

impl Error for ViewError {}


/// The host services a view subscribes to while it is started
#[derive(Clone, Default)]
pub struct Hosts {
    pub alarms: Option<Arc<dyn AlarmService>>,
    pub preferences: Option<Arc<dyn PreferenceStore>>,
}

impl Hosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alarms(mut self, alarms: Arc<dyn AlarmService>) -> Self {
        self.alarms = Some(alarms);
        self
    }

    pub fn with_preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }
}


pub struct CalendarView<R: ViewRenderer> {
    renderer: R,
    state: ViewState,
    registry: JobRegistry,
    observer: ViewObserver,

    calendar: Option<Arc<dyn CalendarSource>>,
    hosts: Hosts,
    started: bool,

    handle: Observer,
    sender: UnboundedSender<ViewEvent>,
    events: UnboundedReceiver<ViewEvent>,
}

impl<R: ViewRenderer> CalendarView<R> {
    /// Create a view, using the current [`DEFAULT_VIEW_SETTINGS`](crate::config::DEFAULT_VIEW_SETTINGS).
    ///
    /// The view does nothing until it is given a range and a display calendar, and it does not receive any notification until it is [`started`](Self::start)
    pub fn new(renderer: R) -> Self {
        let (sender, events) = mpsc::unbounded_channel();
        Self {
            renderer,
            state: ViewState::new(&config::default_view_settings()),
            registry: JobRegistry::new(),
            observer: ViewObserver::new(),
            calendar: None,
            hosts: Hosts::default(),
            started: false,
            handle: Observer::new(sender.clone()),
            sender,
            events,
        }
    }

    pub fn state(&self) -> &ViewState { &self.state }
    pub fn renderer(&self) -> &R { &self.renderer }
    pub fn renderer_mut(&mut self) -> &mut R { &mut self.renderer }
    pub fn display_calendar(&self) -> Option<&Arc<dyn CalendarSource>> { self.calendar.as_ref() }

    /// The handle hosts use to notify this view
    pub fn observer(&self) -> Observer {
        self.handle.clone()
    }

    /// Whether this view has both a display calendar and a range
    pub fn initialized(&self) -> bool {
        self.calendar.is_some() && self.state.visible_range().is_some()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }


    /// Subscribe to the display calendar and to the host services, and read the preferences.
    ///
    /// Starting a view that is already started restarts it with the new hosts
    pub fn start(&mut self, hosts: &Hosts) {
        if self.started {
            self.stop();
        }
        log::debug!("Starting view ({})", self.handle.id());

        if let Some(calendar) = &self.calendar {
            calendar.add_observer(self.handle.clone());
        }
        if let Some(alarms) = &hosts.alarms {
            alarms.add_observer(self.handle.clone());
        }
        if let Some(preferences) = &hosts.preferences {
            preferences.add_observer(self.handle.clone());
        }
        self.observer.set_preferences(hosts.preferences.clone());
        self.hosts = hosts.clone();
        self.started = true;

        self.load_preferences();
    }

    /// Unsubscribe from everything, and cancel pending refreshes.
    ///
    /// Stopping a view that is not started does nothing
    pub fn stop(&mut self) {
        if self.started == false {
            return;
        }
        log::debug!("Stopping view ({})", self.handle.id());

        let id = self.handle.id();
        if let Some(calendar) = &self.calendar {
            calendar.remove_observer(id);
        }
        if let Some(alarms) = &self.hosts.alarms {
            alarms.remove_observer(id);
        }
        if let Some(preferences) = &self.hosts.preferences {
            preferences.remove_observer(id);
        }
        self.observer.set_preferences(None);
        self.hosts = Hosts::default();
        self.started = false;

        self.registry.cancel_all();
    }

    /// Display the items of `calendar` (usually a composite calendar)
    pub fn set_display_calendar(&mut self, calendar: Arc<dyn CalendarSource>) {
        if self.started {
            if let Some(previous) = &self.calendar {
                previous.remove_observer(self.handle.id());
            }
            calendar.add_observer(self.handle.clone());
        }
        self.calendar = Some(calendar);
        self.refresh(false);
    }

    /// Display days `first..=last`.
    ///
    /// Refreshes that were pending for the previous range are canceled, and the view is refreshed.
    /// Returns false (and changes nothing) if `last` is before `first`
    pub fn set_range(&mut self, first: NaiveDate, last: NaiveDate) -> bool {
        if self.state.visible_range() == Some((first, last)) {
            return true;
        }
        if self.state.set_visible_range(first, last) == false {
            return false;
        }
        self.registry.cancel_all();
        self.relayout();
        self.refresh(false);
        true
    }


    /// The range calendars are queried over. Its end is one day past the last visible day
    pub fn query_range(&self) -> Option<DateRange> {
        self.state.query_range()
    }


    /// Refresh the view if it is visible, or if `force` is set
    pub fn refresh(&mut self, force: bool) {
        if self.renderer.is_visible() || force {
            let calendar = self.calendar.clone();
            self.start_refresh(calendar);
        }
    }

    /// Refresh this view, even if it is not visible.
    ///
    /// Hidden views must be refreshed when a preference changes: their range does not change, so switching to them would not refresh them
    pub fn force_refresh(&mut self) {
        self.refresh(true);
    }

    /// Redraw the view from scratch. Nothing happens until the view has a range
    pub fn refresh_view(&mut self) {
        if self.state.visible_range().is_none() {
            return;
        }
        self.relayout();
        self.force_refresh();
    }

    /// Query the items of `calendar`, and display them
    pub fn add_items_from_calendar(&mut self, calendar: Arc<dyn CalendarSource>) {
        self.start_refresh(Some(calendar));
    }

    fn start_refresh(&mut self, calendar: Option<Arc<dyn CalendarSource>>) {
        let job = RefreshJob::new(calendar, self.state.query_range(), self.state.filters(), self.sender.clone());
        if job.execute(&mut self.registry) == Execution::Composite {
            self.relayout();
        }
    }

    /// Stop displaying every item of `calendar`, and cancel its pending refresh.
    ///
    /// Only views whose renderer [`supports_calendar_deletion`](ViewRenderer::supports_calendar_deletion) can do that
    pub fn delete_items_from_calendar(&mut self, calendar: &dyn CalendarSource) -> Result<usize, ViewError> {
        if self.renderer.supports_calendar_deletion() == false {
            return Err(ViewError::Unsupported("delete_items_from_calendar"));
        }
        self.registry.cancel(&JobKey::of(calendar));

        let keys = self.state.rendered_keys_of_calendar(calendar.id());
        for key in &keys {
            if let Some(removed) = self.state.remove_rendered(key) {
                self.renderer.item_deleted(&removed);
            }
        }
        Ok(keys.len())
    }

    /// Display an occurrence. Displaying it again updates it.
    ///
    /// Occurrences that only cover hidden days are ignored
    pub fn do_add_item(&mut self, occurrence: Occurrence) {
        if self.state.is_on_visible_day(&occurrence) == false {
            log::trace!("Not displaying {}, that only covers days off", occurrence.key());
            return;
        }
        self.renderer.item_added(&occurrence);
        self.state.insert_rendered(occurrence);
    }

    /// Stop displaying an occurrence. Nothing happens if it is not displayed
    pub fn do_delete_item(&mut self, occurrence: &Occurrence) {
        if let Some(removed) = self.state.remove_rendered(&occurrence.key()) {
            self.renderer.item_deleted(&removed);
        }
    }

    /// Discard everything that is displayed
    pub fn relayout(&mut self) {
        self.state.clear_rendered();
        self.renderer.relayout();
    }

    /// Start (or stop) flashing an item whose alarm has fired
    pub fn flash_alarm(&mut self, item: &Item, stop: bool) {
        if stop {
            if self.state.flashing_mut().remove(item.id()).is_some() {
                self.renderer.set_flashing(item, false);
            }
            return;
        }

        let default = config::default_view_settings().alarms_indicator_show;
        if self.preference_bool(config::PREF_ALARMS_INDICATOR_SHOW, default) == false {
            return;
        }
        self.state.flashing_mut().insert(item.id().clone(), item.clone());
        self.renderer.set_flashing(item, true);
    }


    pub fn set_tasks_in_view(&mut self, tasks_in_view: bool) {
        let filters = ViewFilters { tasks_in_view, ..self.state.filters() };
        self.apply_filters(filters, true);
    }

    pub fn set_show_completed(&mut self, show_completed: bool) {
        let filters = ViewFilters { show_completed, ..self.state.filters() };
        self.apply_filters(filters, true);
    }

    pub fn set_workdays_only(&mut self, workdays_only: bool) {
        let filters = ViewFilters { workdays_only, ..self.state.filters() };
        self.apply_filters(filters, true);
    }

    fn apply_filters(&mut self, filters: ViewFilters, persist: bool) {
        if filters == self.state.filters() {
            return;
        }
        self.state.set_filters(filters);
        if persist {
            if let Some(prefs) = &self.hosts.preferences {
                prefs.set_bool(config::PREF_TASKS_IN_VIEW, filters.tasks_in_view);
                prefs.set_bool(config::PREF_SHOW_COMPLETED, filters.show_completed);
                prefs.set_bool(config::PREF_WORKDAYS_ONLY, filters.workdays_only);
            }
        }
        self.refresh_view();
    }

    fn filters_from_preferences(&self) -> ViewFilters {
        let current = self.state.filters();
        ViewFilters {
            tasks_in_view: self.preference_bool(config::PREF_TASKS_IN_VIEW, current.tasks_in_view),
            show_completed: self.preference_bool(config::PREF_SHOW_COMPLETED, current.show_completed),
            workdays_only: self.preference_bool(config::PREF_WORKDAYS_ONLY, current.workdays_only),
        }
    }

    fn preference_bool(&self, name: &str, default: bool) -> bool {
        match &self.hosts.preferences {
            Some(prefs) => prefs.get_bool(name, default),
            None => default,
        }
    }

    /// Read every preference this view depends on.
    ///
    /// The view is redrawn if what it displays depends on a preference that differs from its current state
    fn load_preferences(&mut self) {
        let prefs = match &self.hosts.preferences {
            Some(prefs) => Arc::clone(prefs),
            None => return,
        };
        let previous_filters = self.state.filters();
        let previous_days_off = self.state.days_off().clone();

        let filters = self.filters_from_preferences();
        self.state.set_filters(filters);
        let offset = prefs.get_int(config::PREF_WEEK_START, i64::from(self.state.week_start_offset()));
        self.state.set_week_start_offset(offset.rem_euclid(7) as u32);
        self.update_days_off_prefs();

        if filters != previous_filters || *self.state.days_off() != previous_days_off {
            log::debug!("Preferences of view ({}) differ from its state", self.handle.id());
            self.refresh_view();
        }
    }

    /// Check preferences and update which days are days off
    fn update_days_off_prefs(&mut self) {
        let days_off: HashSet<_> = config::DAYS_OFF_PREFS.iter()
            .filter(|(_, name, default)| self.preference_bool(name, *default))
            .map(|(day, _, _)| *day)
            .collect();
        self.state.set_days_off(days_off);
    }

    /// React to a preference change
    pub fn handle_preference(&mut self, name: &str) {
        if name.starts_with(config::PREF_CATEGORY_COLOR_PREFIX) {
            let category = &name[config::PREF_CATEGORY_COLOR_PREFIX.len()..];
            let color = self.hosts.preferences.as_ref()
                .and_then(|prefs| prefs.get_string(name))
                .and_then(|value| match csscolorparser::parse(&value) {
                    Ok(color) => Some(color),
                    Err(err) => {
                        log::debug!("Ignoring invalid colour {:?} for category {}: {}", value, category, err);
                        None
                    },
                });
            self.state.set_category_color(category, color);
            self.refresh_view();
            return;
        }

        if config::DAYS_OFF_PREFS.iter().any(|(_, pref, _)| *pref == name) {
            self.update_days_off_prefs();
            self.refresh_view();
            return;
        }

        match name {
            config::PREF_TASKS_IN_VIEW | config::PREF_SHOW_COMPLETED | config::PREF_WORKDAYS_ONLY => {
                let filters = self.filters_from_preferences();
                self.apply_filters(filters, false);
            },
            config::PREF_WEEK_START => {
                let offset = self.hosts.preferences.as_ref()
                    .map(|prefs| prefs.get_int(name, 0))
                    .unwrap_or(0);
                self.state.set_week_start_offset(offset.rem_euclid(7) as u32);
                self.refresh_view();
            },
            config::PREF_ALARMS_INDICATOR_SHOW
            | config::PREF_DATE_FORMAT
            | config::PREF_SHOW_LOCATION => self.refresh_view(),
            _ => {},
        }
    }


    /// Handle one event
    pub fn handle_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Calendar(notification) => {
                let observer = std::mem::take(&mut self.observer);
                observer.handle(self, notification);
                self.observer = observer;
            },
            ViewEvent::Alarm(notification) => {
                let observer = std::mem::take(&mut self.observer);
                observer.handle_alarm(self, notification);
                self.observer = observer;
            },
            ViewEvent::Preference(name) => self.handle_preference(&name),
            ViewEvent::Job(event) => self.handle_job_event(event),
        }
    }

    fn handle_job_event(&mut self, event: JobEvent) {
        match event {
            JobEvent::Results{ ticket, result } => {
                if ticket.is_cancelled() {
                    log::trace!("Discarding results of a cancelled refresh of {}", ticket.key());
                    return;
                }
                match result {
                    Err(err) => log::debug!("Ignoring failed results from {}: {}", ticket.key(), err),
                    Ok(items) => {
                        for occurrence in refresh::relevant_occurrences(&ticket, items) {
                            self.do_add_item(occurrence);
                        }
                    },
                }
            },
            JobEvent::Completed{ ticket, status } => {
                log::info!("Refresh complete of calendar {}", ticket.key());
                self.registry.remove(ticket.key(), ticket.id());
                if ticket.is_cancelled() {
                    return;
                }
                match status {
                    Ok(()) => self.renderer.view_loaded(OperationType::Get),
                    Err(err) => log::debug!("Refresh of {} failed: {}", ticket.key(), err),
                }
            },
        }
    }

    /// Handle every event that is already queued. Returns how many were handled
    pub fn process_pending_events(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            count += 1;
        }
        count
    }

    /// Wait for the next event, and handle it
    pub async fn next_event(&mut self) {
        if let Some(event) = self.events.recv().await {
            self.handle_event(event);
        }
    }

    /// Handle events until no refresh is pending anymore and the queue is empty
    pub async fn run_until_idle(&mut self) {
        loop {
            self.process_pending_events();
            if self.registry.is_empty() {
                break;
            }
            self.next_event().await;
        }
    }


    /// How many refresh jobs are in flight
    pub fn pending_refreshes(&self) -> usize {
        self.registry.len()
    }

    pub fn has_pending_refresh(&self, key: &JobKey) -> bool {
        self.registry.contains(key)
    }

    /// Cancel every refresh in flight. Returns how many were canceled
    pub fn cancel_pending_refreshes(&mut self) -> usize {
        self.registry.cancel_all()
    }
}

impl<R: ViewRenderer> ViewHooks for CalendarView<R> {
    fn state(&self) -> &ViewState {
        &self.state
    }

    fn do_add_item(&mut self, occurrence: Occurrence) {
        CalendarView::do_add_item(self, occurrence)
    }

    fn do_delete_item(&mut self, occurrence: &Occurrence) {
        CalendarView::do_delete_item(self, occurrence)
    }

    fn refresh(&mut self, force: bool) {
        CalendarView::refresh(self, force)
    }

    fn add_items_from_calendar(&mut self, calendar: Arc<dyn CalendarSource>) {
        CalendarView::add_items_from_calendar(self, calendar)
    }

    fn delete_items_from_calendar(&mut self, calendar: &dyn CalendarSource) -> Result<usize, ViewError> {
        CalendarView::delete_items_from_calendar(self, calendar)
    }

    fn flash_alarm(&mut self, item: &Item, stop: bool) {
        CalendarView::flash_alarm(self, item, stop)
    }
}

impl<R: ViewRenderer> Drop for CalendarView<R> {
    fn drop(&mut self) {
        self.stop();
    }
}
