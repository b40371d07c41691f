//! Calendar events (iCal `VEVENT` item)

use serde::{Deserialize, Serialize};
use chrono::{Utc, DateTime};

use crate::item::ItemId;
use crate::item::Recurrence;
use crate::calendar::CalendarId;

/// A calendar event, that spans from `start` (inclusive) to `end` (exclusive)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: ItemId,
    calendar_id: CalendarId,
    name: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    last_modified: DateTime<Utc>,

    recurrence: Option<Recurrence>,
    /// Set on instances of a recurring event. This is the nominal start of this instance
    recurrence_id: Option<DateTime<Utc>>,
}

impl Event {
    /// Create a brand new event, with a random ID.
    ///
    /// `end` is clamped so that it is never before `start`
    pub fn new(name: String, start: DateTime<Utc>, end: DateTime<Utc>, parent_calendar_id: &CalendarId) -> Self {
        Self::new_with_parameters(name, ItemId::random(parent_calendar_id), parent_calendar_id.clone(), start, end, Utc::now())
    }

    /// Create a new Event instance, with a known ID
    pub fn new_with_parameters(name: String, id: ItemId, calendar_id: CalendarId,
                               start: DateTime<Utc>, end: DateTime<Utc>,
                               last_modified: DateTime<Utc>) -> Self
    {
        let end = if end < start { start } else { end };
        Self {
            id, calendar_id, name, start, end, last_modified,
            recurrence: None,
            recurrence_id: None,
        }
    }

    /// Make this event repeat
    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn id(&self) -> &ItemId                   { &self.id }
    pub fn calendar_id(&self) -> &CalendarId      { &self.calendar_id }
    pub fn name(&self) -> &str                    { &self.name }
    pub fn start(&self) -> DateTime<Utc>          { self.start }
    pub fn end(&self) -> DateTime<Utc>            { self.end }
    pub fn last_modified(&self) -> &DateTime<Utc> { &self.last_modified }
    pub fn recurrence(&self) -> Option<&Recurrence>        { self.recurrence.as_ref() }
    pub fn recurrence_id(&self) -> Option<&DateTime<Utc>>  { self.recurrence_id.as_ref() }

    /// Events always have a span
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.start, self.end))
    }

    /// Rename an event.
    /// This updates its "last modified" field
    pub fn set_name(&mut self, new_name: String) {
        self.last_modified = Utc::now();
        self.name = new_name;
    }

    /// Move an event.
    /// This updates its "last modified" field
    pub fn set_times(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.last_modified = Utc::now();
        self.start = start;
        self.end = if end < start { start } else { end };
    }

    pub(crate) fn project(&self, start: DateTime<Utc>, recurrence_id: DateTime<Utc>) -> Event {
        let mut instance = self.clone();
        instance.end = start + (self.end - self.start);
        instance.start = start;
        instance.recurrence_id = Some(recurrence_id);
        instance
    }
}
