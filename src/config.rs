//! Support for library configuration options

use std::sync::{Arc, Mutex};
use once_cell::sync::Lazy;
use chrono::Weekday;

pub const PREF_TASKS_IN_VIEW: &str = "calendar.view.tasksInView";
pub const PREF_SHOW_COMPLETED: &str = "calendar.view.showCompleted";
pub const PREF_WORKDAYS_ONLY: &str = "calendar.view.workdaysOnly";
pub const PREF_WEEK_START: &str = "calendar.week.start";
pub const PREF_ALARMS_INDICATOR_SHOW: &str = "calendar.alarms.indicator.show";
pub const PREF_CATEGORY_COLOR_PREFIX: &str = "calendar.category.color.";
pub const PREF_DATE_FORMAT: &str = "calendar.date.format";
pub const PREF_SHOW_LOCATION: &str = "calendar.view.showLocation";

/// Preferences that tell which weekdays are days off, and their default values
pub const DAYS_OFF_PREFS: [(Weekday, &str, bool); 7] = [
    (Weekday::Sun, "calendar.week.d0sundaysoff", true),
    (Weekday::Mon, "calendar.week.d1mondaysoff", false),
    (Weekday::Tue, "calendar.week.d2tuesdaysoff", false),
    (Weekday::Wed, "calendar.week.d3wednesdaysoff", false),
    (Weekday::Thu, "calendar.week.d4thursdaysoff", false),
    (Weekday::Fri, "calendar.week.d5fridaysoff", false),
    (Weekday::Sat, "calendar.week.d6saturdaysoff", true),
];

pub const PROP_DISABLED: &str = "disabled";
pub const PROP_READ_ONLY: &str = "readOnly";
pub const PROP_SUPPRESS_ALARMS: &str = "suppressAlarms";
pub const PROP_ALARMS_POPUP_SUPPORTED: &str = "capabilities.alarms.popup.supported";


/// Values a view starts with, before the preference store is read
#[derive(Clone, Debug, PartialEq)]
pub struct ViewSettings {
    pub tasks_in_view: bool,
    pub show_completed: bool,
    pub workdays_only: bool,
    /// 0 means weeks start on Sunday, 1 on Monday, etc.
    pub week_start_offset: u32,
    pub days_off: Vec<Weekday>,
    pub alarms_indicator_show: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            tasks_in_view: false,
            show_completed: false,
            workdays_only: false,
            week_start_offset: 0,
            days_off: DAYS_OFF_PREFS.iter()
                .filter(|(_, _, off)| *off)
                .map(|(day, _, _)| *day)
                .collect(),
            alarms_indicator_show: true,
        }
    }
}

/// Defaults used by every view created from now on.
/// Feel free to override them when initing this library.
pub static DEFAULT_VIEW_SETTINGS: Lazy<Arc<Mutex<ViewSettings>>> = Lazy::new(|| Arc::new(Mutex::new(ViewSettings::default())));

/// Returns a copy of the current [`DEFAULT_VIEW_SETTINGS`]
pub fn default_view_settings() -> ViewSettings {
    match DEFAULT_VIEW_SETTINGS.lock() {
        Ok(settings) => settings.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
