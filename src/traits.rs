//! Interfaces between calendar views and the host environment
//!
//! Calendars, the alarm service and the preference store are provided by the host.
//! A view only knows them through these traits. This crate ships in-memory implementations of all of them.

use std::error::Error;

use async_trait::async_trait;

use crate::calendar::{CalendarId, ItemFilter, PropertyValue};
use crate::config;
use crate::item::Item;
use crate::notification::{Observer, ObserverId};
use crate::occurrence::Occurrence;
use crate::range::DateRange;
use crate::refresh::{OperationType, ResultListener};

/// The error a calendar query may fail with
pub type QueryError = Box<dyn Error + Send + Sync>;


/// Something views can subscribe to
pub trait Observable {
    /// Start sending notifications to this observer
    fn add_observer(&self, observer: Observer);
    /// Stop sending notifications to the observer that has this ID.
    /// Unknown IDs are ignored
    fn remove_observer(&self, id: ObserverId);
}

#[async_trait]
pub trait CalendarSource: Observable + Send + Sync {
    /// Returns the calendar ID
    fn id(&self) -> &CalendarId;
    /// Returns the calendar name
    fn name(&self) -> &str;
    /// Whether this calendar aggregates other calendars
    fn is_composite(&self) -> bool {
        false
    }
    /// Returns a calendar property (e.g. `readOnly`, `disabled`, or capabilities such as `capabilities.alarms.popup.supported`)
    fn property(&self, name: &str) -> Option<PropertyValue>;

    fn is_disabled(&self) -> bool {
        self.property(config::PROP_DISABLED)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    /// Query the items that match `filter` within `range`.
    ///
    /// Results may be delivered in several batches through `listener`, before this function returns.
    /// A `max_results` of 0 means "no limit".
    /// Dropping the returned future cancels the query.
    async fn get_items(&self, filter: ItemFilter, max_results: usize, range: DateRange, listener: &ResultListener) -> Result<(), QueryError>;
}

/// The source of alarm notifications (see [`AlarmNotification`](crate::notification::AlarmNotification))
pub trait AlarmService: Observable + Send + Sync {}

/// The preference store.
///
/// Observers receive a [`ViewEvent::Preference`](crate::notification::ViewEvent::Preference) every time a value changes
pub trait PreferenceStore: Observable + Send + Sync {
    fn get_bool(&self, name: &str, default: bool) -> bool;
    fn get_int(&self, name: &str, default: i64) -> i64;
    fn get_string(&self, name: &str) -> Option<String>;

    fn set_bool(&self, name: &str, value: bool);
    fn set_int(&self, name: &str, value: i64);
    fn set_string(&self, name: &str, value: &str);
}


/// What actually draws a view.
///
/// A [`CalendarView`](crate::view::CalendarView) decides what has to be displayed, and tells its renderer through these hooks.
/// Hooks may be called in any order, and results of different calendars may interleave.
pub trait ViewRenderer {
    /// Whether this view is currently displayed. Hidden views only refresh when forced to
    fn is_visible(&self) -> bool {
        true
    }

    /// An occurrence has been added to the view (or has been updated, in case it was already displayed)
    fn item_added(&mut self, occurrence: &Occurrence);

    /// An occurrence has been removed from the view
    fn item_deleted(&mut self, occurrence: &Occurrence);

    /// Every displayed occurrence has been discarded, the view should redraw from scratch
    fn relayout(&mut self) {}

    /// A refresh of the whole view has completed
    fn view_loaded(&mut self, _operation: OperationType) {}

    /// Start or stop flashing an item whose alarm has fired
    fn set_flashing(&mut self, _item: &Item, _flashing: bool) {}

    /// Whether this view is able to remove every item of a single calendar
    fn supports_calendar_deletion(&self) -> bool {
        false
    }
}
