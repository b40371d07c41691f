//! Helpers shared by the view tests: a renderer that records what it is asked to draw, and ways to build calendars
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use calview::calendar::CalendarId;
use calview::refresh::OperationType;
use calview::traits::{CalendarSource, ViewRenderer};
use calview::{Event, Item, ItemId, MemoryCalendar, Occurrence, OccurrenceKey};

/// A renderer that records every hook it receives
pub struct RecordingRenderer {
    pub visible: bool,
    pub calendar_deletion: bool,

    pub added: Vec<OccurrenceKey>,
    pub deleted: Vec<OccurrenceKey>,
    pub relayouts: usize,
    pub loaded: usize,
    pub flashing: HashSet<ItemId>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            visible: true,
            calendar_deletion: false,
            added: Vec::new(),
            deleted: Vec::new(),
            relayouts: 0,
            loaded: 0,
            flashing: HashSet::new(),
        }
    }

    pub fn hidden() -> Self {
        Self { visible: false, ..Self::new() }
    }

    pub fn with_calendar_deletion() -> Self {
        Self { calendar_deletion: true, ..Self::new() }
    }

    /// How many times an item has been added, in total
    pub fn additions_of(&self, id: &ItemId) -> usize {
        self.added.iter().filter(|key| &key.item_id == id).count()
    }
}

impl ViewRenderer for RecordingRenderer {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn item_added(&mut self, occurrence: &Occurrence) {
        self.added.push(occurrence.key());
    }

    fn item_deleted(&mut self, occurrence: &Occurrence) {
        self.deleted.push(occurrence.key());
    }

    fn relayout(&mut self) {
        self.relayouts += 1;
    }

    fn view_loaded(&mut self, operation: OperationType) {
        assert_eq!(operation, OperationType::Get);
        self.loaded += 1;
    }

    fn set_flashing(&mut self, item: &Item, flashing: bool) {
        if flashing {
            self.flashing.insert(item.id().clone());
        } else {
            self.flashing.remove(item.id());
        }
    }

    fn supports_calendar_deletion(&self) -> bool {
        self.calendar_deletion
    }
}


pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn calendar(name: &str) -> Arc<MemoryCalendar> {
    let id: CalendarId = format!("https://some.calend.ar/{}/", name).parse().unwrap();
    Arc::new(MemoryCalendar::new(name.to_string(), id))
}

/// A day of March 2024
pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

/// A time of March 2024
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn event(calendar: &MemoryCalendar, name: &str, start: DateTime<Utc>, hours: i64) -> Event {
    Event::new(name.to_string(), start, start + Duration::hours(hours), calendar.id())
}

/// Let spawned tasks run until `condition` holds
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("Condition not met in time");
}
