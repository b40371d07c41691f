//! Everything a calendar view displays, and how it displays it

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use bitflags::bitflags;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use csscolorparser::Color;

use crate::config::ViewSettings;
use crate::item::{Item, ItemId};
use crate::calendar::CalendarId;
use crate::occurrence::{Occurrence, OccurrenceKey};
use crate::range::DateRange;

/// Which items a view displays
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilters {
    /// Display tasks along with events
    pub tasks_in_view: bool,
    /// Display completed tasks (only relevant when `tasks_in_view` is set)
    pub show_completed: bool,
    /// Hide days off
    pub workdays_only: bool,
}

bitflags! {
    /// A compact summary of [`ViewFilters`]
    pub struct ToggleStatus: u8 {
        const WORKDAYS_ONLY = 1;
        const TASKS_IN_VIEW = 2;
        const SHOW_COMPLETED = 4;
    }
}

impl From<ViewFilters> for ToggleStatus {
    fn from(filters: ViewFilters) -> Self {
        let mut status = ToggleStatus::empty();
        status.set(ToggleStatus::WORKDAYS_ONLY, filters.workdays_only);
        status.set(ToggleStatus::TASKS_IN_VIEW, filters.tasks_in_view);
        status.set(ToggleStatus::SHOW_COMPLETED, filters.show_completed);
        status
    }
}


/// The state of a view.
///
/// Only the owning [`CalendarView`](crate::view::CalendarView) mutates the displayed items, through its add and delete hooks
#[derive(Debug)]
pub struct ViewState {
    first_day: Option<NaiveDate>,
    last_day: Option<NaiveDate>,

    filters: ViewFilters,
    days_off: HashSet<Weekday>,
    week_start_offset: u32,
    category_colors: HashMap<String, Color>,

    rendered: HashMap<OccurrenceKey, Occurrence>,
    flashing: HashMap<ItemId, Item>,
}

impl ViewState {
    pub fn new(settings: &ViewSettings) -> Self {
        Self {
            first_day: None,
            last_day: None,
            filters: ViewFilters {
                tasks_in_view: settings.tasks_in_view,
                show_completed: settings.show_completed,
                workdays_only: settings.workdays_only,
            },
            days_off: settings.days_off.iter().cloned().collect(),
            week_start_offset: settings.week_start_offset,
            category_colors: HashMap::new(),
            rendered: HashMap::new(),
            flashing: HashMap::new(),
        }
    }

    /// The first and last visible days, if the view has been given a range yet
    pub fn visible_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.first_day, self.last_day) {
            (Some(first), Some(last)) => Some((first, last)),
            _ => None,
        }
    }

    /// Returns false (and keeps the current range) in case `last` is before `first`
    pub fn set_visible_range(&mut self, first: NaiveDate, last: NaiveDate) -> bool {
        if last < first {
            return false;
        }
        self.first_day = Some(first);
        self.last_day = Some(last);
        true
    }

    /// The range calendars must be queried over. Its end is one day past the last visible day
    pub fn query_range(&self) -> Option<DateRange> {
        let (first, last) = self.visible_range()?;
        DateRange::from_days(first, last)
    }

    pub fn filters(&self) -> ViewFilters { self.filters }
    pub fn set_filters(&mut self, filters: ViewFilters) { self.filters = filters; }
    pub fn toggle_status(&self) -> ToggleStatus { ToggleStatus::from(self.filters) }

    pub fn days_off(&self) -> &HashSet<Weekday> { &self.days_off }
    pub fn set_days_off(&mut self, days_off: HashSet<Weekday>) { self.days_off = days_off; }
    /// Days off are displayed unless the view only shows work days
    pub fn display_days_off(&self) -> bool { self.filters.workdays_only == false }
    pub fn week_start_offset(&self) -> u32 { self.week_start_offset }
    pub fn set_week_start_offset(&mut self, offset: u32) { self.week_start_offset = offset % 7; }

    pub fn category_color(&self, category: &str) -> Option<&Color> {
        self.category_colors.get(category)
    }
    pub fn set_category_color(&mut self, category: &str, color: Option<Color>) {
        match color {
            Some(color) => { self.category_colors.insert(category.to_string(), color); },
            None => { self.category_colors.remove(category); },
        }
    }

    /// Today's date
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    pub fn is_day_off(&self, date: NaiveDate) -> bool {
        self.days_off.contains(&date.weekday())
    }

    pub fn is_day_visible(&self, date: NaiveDate) -> bool {
        self.display_days_off() || self.is_day_off(date) == false
    }

    /// The days this view displays, in order
    pub fn visible_days(&self) -> Vec<NaiveDate> {
        let (first, last) = match self.visible_range() {
            None => return Vec::new(),
            Some(range) => range,
        };
        first.iter_days()
            .take_while(|day| *day <= last)
            .filter(|day| self.is_day_visible(*day))
            .collect()
    }

    /// Whether at least one of the visible days is covered by this occurrence
    pub fn is_on_visible_day(&self, occurrence: &Occurrence) -> bool {
        if self.display_days_off() {
            return true;
        }
        let (start, end) = match (occurrence.start(), occurrence.end()) {
            (Some(start), Some(end)) => (start, end),
            _ => return false,
        };
        let first = start.date_naive();
        let last = if end > start { (end - Duration::nanoseconds(1)).date_naive() } else { first };
        first.iter_days()
            .take_while(|day| *day <= last)
            .any(|day| self.is_day_visible(day))
    }


    /// Returns the occurrences that are currently displayed
    pub fn rendered(&self) -> impl Iterator<Item = &Occurrence> {
        self.rendered.values()
    }

    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_rendered(&self, key: &OccurrenceKey) -> bool {
        self.rendered.contains_key(key)
    }

    /// Returns the displayed occurrences of an item
    pub fn rendered_occurrences_of(&self, item_id: &ItemId) -> Vec<&Occurrence> {
        self.rendered.values().filter(|occ| occ.id() == item_id).collect()
    }

    pub fn rendered_keys_of_calendar(&self, calendar: &CalendarId) -> Vec<OccurrenceKey> {
        self.rendered.iter()
            .filter(|(_, occ)| occ.calendar_id() == calendar)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub(crate) fn insert_rendered(&mut self, occurrence: Occurrence) -> Option<Occurrence> {
        self.rendered.insert(occurrence.key(), occurrence)
    }

    pub(crate) fn remove_rendered(&mut self, key: &OccurrenceKey) -> Option<Occurrence> {
        self.rendered.remove(key)
    }

    pub(crate) fn clear_rendered(&mut self) {
        self.rendered.clear();
    }


    /// Items whose alarm is currently flashing
    pub fn flashing(&self) -> impl Iterator<Item = &Item> {
        self.flashing.values()
    }

    pub fn is_flashing(&self, item_id: &ItemId) -> bool {
        self.flashing.contains_key(item_id)
    }

    pub(crate) fn flashing_mut(&mut self) -> &mut HashMap<ItemId, Item> {
        &mut self.flashing
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use chrono::TimeZone;
    use crate::Event;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn state() -> ViewState {
        ViewState::new(&ViewSettings::default())
    }

    #[test]
    fn test_visible_days() {
        let mut state = state();
        assert!(state.visible_days().is_empty());
        assert!(state.query_range().is_none());

        // Friday to Monday
        assert!(state.set_visible_range(date(2024, 3, 1), date(2024, 3, 4)));
        assert_eq!(state.visible_days().len(), 4);
        assert!(state.display_days_off());

        let mut filters = state.filters();
        filters.workdays_only = true;
        state.set_filters(filters);
        assert!(state.display_days_off() == false);
        assert!(state.is_day_visible(date(2024, 3, 2)) == false);
        assert_eq!(state.visible_days(), vec![date(2024, 3, 1), date(2024, 3, 4)]);

        // Saturday becomes a work day
        state.set_days_off(vec![Weekday::Sun].into_iter().collect());
        assert_eq!(state.visible_days(), vec![date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 4)]);
        assert!(state.toggle_status().contains(ToggleStatus::WORKDAYS_ONLY));

        assert!(state.set_visible_range(date(2024, 3, 4), date(2024, 3, 1)) == false);
    }

    #[test]
    fn test_occurrence_on_days_off() {
        let mut state = state();
        state.set_visible_range(date(2024, 3, 1), date(2024, 3, 7));
        state.set_filters(ViewFilters { workdays_only: true, ..ViewFilters::default() });

        let cal: CalendarId = "https://some.calend.ar/main/".parse().unwrap();
        let saturday = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let weekend = Event::new("Hike".to_string(), saturday, saturday + Duration::days(2), &cal);
        let long_weekend = Event::new("Trip".to_string(), saturday, saturday + Duration::days(3), &cal);

        assert!(state.is_on_visible_day(&Occurrence::single(Arc::new(Item::Event(weekend)))) == false);
        assert!(state.is_on_visible_day(&Occurrence::single(Arc::new(Item::Event(long_weekend)))));
    }

    #[test]
    fn test_today() {
        let state = state();
        let before = Utc::now().date_naive();
        let today = state.today();
        let after = Utc::now().date_naive();
        assert!(before <= today && today <= after);
    }
}
