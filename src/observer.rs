//! Translates calendar and alarm notifications into view mutations
//!
//! The observer decides whether a notification is relevant to a view (date range, task visibility, completion visibility), expands items into occurrences, and forwards them to the view hooks.
//! It never touches the view state directly.

use std::sync::Arc;

use crate::calendar::PropertyValue;
use crate::config;
use crate::expander;
use crate::item::Item;
use crate::notification::{AlarmNotification, CalendarNotification};
use crate::occurrence::Occurrence;
use crate::state::{ViewFilters, ViewState};
use crate::traits::{CalendarSource, PreferenceStore};
use crate::view::ViewError;

/// What a view exposes to its observer
pub trait ViewHooks {
    fn state(&self) -> &ViewState;

    /// Display an occurrence
    fn do_add_item(&mut self, occurrence: Occurrence);
    /// Stop displaying an occurrence
    fn do_delete_item(&mut self, occurrence: &Occurrence);

    /// Re-query the display calendar. Hidden views ignore this unless `force` is set
    fn refresh(&mut self, force: bool);
    /// Query the items of a single calendar, and display them
    fn add_items_from_calendar(&mut self, calendar: Arc<dyn CalendarSource>);
    /// Stop displaying every item of a calendar. Returns how many occurrences have been removed
    fn delete_items_from_calendar(&mut self, calendar: &dyn CalendarSource) -> Result<usize, ViewError>;

    /// Start (or stop) flashing an item whose alarm has fired
    fn flash_alarm(&mut self, item: &Item, stop: bool);
}


/// Whether a view with these filters must ignore this item
fn is_filtered_out(item: &Item, filters: &ViewFilters) -> bool {
    if item.is_task() == false {
        return false;
    }
    item.is_dateless_task()
        || filters.tasks_in_view == false
        || (item.is_completed() && filters.show_completed == false)
}


#[derive(Default)]
pub struct ViewObserver {
    preferences: Option<Arc<dyn PreferenceStore>>,
}

impl ViewObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The preference store used to decide whether alarm-related property changes matter
    pub fn set_preferences(&mut self, preferences: Option<Arc<dyn PreferenceStore>>) {
        self.preferences = preferences;
    }

    /// Handle a notification sent by a calendar
    pub fn handle<V: ViewHooks + ?Sized>(&self, view: &mut V, notification: CalendarNotification) {
        match notification {
            CalendarNotification::Load => view.refresh(false),
            CalendarNotification::ItemAdded(item) => self.on_add_item(view, &item),
            CalendarNotification::ItemModified{ old, new } => self.on_modify_item(view, &old, &new),
            CalendarNotification::ItemDeleted(item) => self.on_delete_item(view, &item),
            CalendarNotification::PropertyChanged{ calendar, name, .. } => {
                self.on_property_changed(view, calendar.as_ref(), &name)
            },
            CalendarNotification::PropertyDeleting{ calendar, name } => {
                // Values are not relevant here
                self.on_property_changed(view, calendar.as_ref(), &name)
            },
            CalendarNotification::CalendarAdded(calendar) => {
                if calendar.is_disabled() == false {
                    view.add_items_from_calendar(calendar);
                }
            },
            CalendarNotification::CalendarRemoved(calendar) => {
                if calendar.is_disabled() == false {
                    if let Err(err) = view.delete_items_from_calendar(calendar.as_ref()) {
                        log::debug!("Not removing items of calendar {}: {}", calendar.id(), err);
                    }
                }
            },
            CalendarNotification::Error{ calendar, message } => {
                log::debug!("Calendar {} reported an error: {}", calendar, message);
            },
            CalendarNotification::StartBatch
            | CalendarNotification::EndBatch
            | CalendarNotification::DefaultCalendarChanged(_) => {},
        }
    }

    /// Handle a notification sent by the alarm service
    pub fn handle_alarm<V: ViewHooks + ?Sized>(&self, view: &mut V, notification: AlarmNotification) {
        match notification {
            AlarmNotification::AlarmFired(item) => view.flash_alarm(&item, false),
            AlarmNotification::AlarmsRemovedForItem(item) => view.flash_alarm(&item, true),
            AlarmNotification::AlarmsRemovedForCalendar(calendar_id) => {
                let items: Vec<Item> = view.state().flashing()
                    .filter(|item| item.calendar_id() == &calendar_id)
                    .cloned()
                    .collect();
                for item in items {
                    view.flash_alarm(&item, true);
                }
            },
            AlarmNotification::AlarmsLoaded(_) => {},
        }
    }

    fn on_add_item<V: ViewHooks + ?Sized>(&self, view: &mut V, item: &Item) {
        if is_filtered_out(item, &view.state().filters()) {
            log::trace!("Ignoring addition of hidden item {}", item.id());
            return;
        }
        let range = match view.state().query_range() {
            Some(range) => range,
            None => return,
        };
        for occurrence in expander::expand(item, &range) {
            view.do_add_item(occurrence);
        }
    }

    fn on_delete_item<V: ViewHooks + ?Sized>(&self, view: &mut V, item: &Item) {
        if is_filtered_out(item, &view.state().filters()) {
            return;
        }
        self.delete_occurrences(view, item);
    }

    /// Changes in dates, recurrence or completion may move occurrences in or out of the view.
    /// The old version is removed as a whole, then the new version is added as if it were brand new
    fn on_modify_item<V: ViewHooks + ?Sized>(&self, view: &mut V, old: &Item, new: &Item) {
        // Removing an occurrence that is not displayed is harmless, so only tasks that can never be displayed are skipped
        if old.is_dateless_task() == false {
            self.delete_occurrences(view, old);
        }
        self.on_add_item(view, new);
    }

    fn delete_occurrences<V: ViewHooks + ?Sized>(&self, view: &mut V, item: &Item) {
        let range = match view.state().query_range() {
            Some(range) => range,
            None => return,
        };
        for occurrence in expander::expand(item, &range) {
            view.do_delete_item(&occurrence);
        }
    }

    fn on_property_changed<V: ViewHooks + ?Sized>(&self, view: &mut V, calendar: &dyn CalendarSource, name: &str) {
        match name {
            config::PROP_SUPPRESS_ALARMS => {
                if self.alarms_indicator_shown() == false
                    || calendar.property(config::PROP_ALARMS_POPUP_SUPPORTED) == Some(PropertyValue::Bool(false))
                {
                    return;
                }
                view.refresh(false);
            },
            config::PROP_READ_ONLY | config::PROP_DISABLED => view.refresh(false),
            _ => {},
        }
    }

    fn alarms_indicator_shown(&self) -> bool {
        let default = config::default_view_settings().alarms_indicator_show;
        match &self.preferences {
            Some(prefs) => prefs.get_bool(config::PREF_ALARMS_INDICATOR_SHOW, default),
            None => default,
        }
    }
}
