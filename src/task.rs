//! To-do tasks (iCal `VTODO` item)

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::item::ItemId;
use crate::item::Recurrence;
use crate::calendar::CalendarId;

/// RFC5545 defines the completion as several optional fields, yet some combinations make no sense.
/// This enum provides an API that forbids such impossible combinations.
///
/// * `COMPLETED` is an optional timestamp that tells whether this task is completed
/// * `STATUS` is an optional field, that can be set to `NEEDS-ACTION`, `COMPLETED`, or others.
/// Even though having a `COMPLETED` date but a `STATUS:NEEDS-ACTION` is theorically possible, it obviously makes no sense. This API ensures this cannot happen
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CompletionStatus {
    Completed(Option<DateTime<Utc>>),
    Uncompleted,
}
impl CompletionStatus {
    pub fn is_completed(&self) -> bool {
        match self {
            CompletionStatus::Completed(_) => true,
            _ => false,
        }
    }
}

/// A to-do task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// The task URL
    id: ItemId,
    /// The calendar this task belongs to
    calendar_id: CalendarId,

    /// The time this item was created.
    creation_date: Option<DateTime<Utc>>,
    /// The last time this item was modified
    last_modified: DateTime<Utc>,
    /// The completion status of this task
    completion_status: CompletionStatus,

    /// The display name of the task
    name: String,

    /// `DTSTART`, i.e. when the task is supposed to be started
    entry: Option<DateTime<Utc>>,
    /// `DUE`
    due: Option<DateTime<Utc>>,

    recurrence: Option<Recurrence>,
    /// Set on instances of a recurring task. This is the nominal anchor of this instance
    recurrence_id: Option<DateTime<Utc>>,
}


impl Task {
    /// Create a brand new Task, without any date.
    /// This will pick a new (random) task ID.
    pub fn new(name: String, completed: bool, parent_calendar_id: &CalendarId) -> Self {
        let new_item_id = ItemId::random(parent_calendar_id);
        let new_creation_date = Some(Utc::now());
        let new_last_modified = Utc::now();
        let new_completion_status = if completed {
                CompletionStatus::Completed(Some(Utc::now()))
            } else { CompletionStatus::Uncompleted };
        Self::new_with_parameters(name, new_item_id, parent_calendar_id.clone(), new_completion_status, new_creation_date, new_last_modified)
    }

    /// Create a new Task instance, with a known ID
    pub fn new_with_parameters(name: String, id: ItemId, calendar_id: CalendarId,
                               completion_status: CompletionStatus,
                               creation_date: Option<DateTime<Utc>>, last_modified: DateTime<Utc>,
                            ) -> Self
    {
        Self {
            id,
            calendar_id,
            name,
            completion_status,
            creation_date,
            last_modified,
            entry: None,
            due: None,
            recurrence: None,
            recurrence_id: None,
        }
    }

    /// Set the entry date (builder-style)
    pub fn with_entry(mut self, entry: DateTime<Utc>) -> Self {
        self.entry = Some(entry);
        self
    }

    /// Set the due date (builder-style)
    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.due = Some(due);
        self
    }

    /// Make this task repeat
    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn id(&self) -> &ItemId     { &self.id          }
    pub fn calendar_id(&self) -> &CalendarId { &self.calendar_id }
    pub fn name(&self) -> &str      { &self.name        }
    pub fn completed(&self) -> bool { self.completion_status.is_completed() }
    pub fn entry(&self) -> Option<DateTime<Utc>>  { self.entry }
    pub fn due(&self) -> Option<DateTime<Utc>>    { self.due }
    pub fn last_modified(&self) -> &DateTime<Utc> { &self.last_modified }
    pub fn creation_date(&self) -> Option<&DateTime<Utc>>   { self.creation_date.as_ref() }
    pub fn completion_status(&self) -> &CompletionStatus    { &self.completion_status }
    pub fn recurrence(&self) -> Option<&Recurrence>         { self.recurrence.as_ref() }
    pub fn recurrence_id(&self) -> Option<&DateTime<Utc>>   { self.recurrence_id.as_ref() }

    pub fn is_dateless(&self) -> bool {
        self.entry.is_none() && self.due.is_none()
    }

    /// The time interval covered by this task.
    ///
    /// A task that only has one of its dates set is a single point in time.
    /// Dateless tasks have no span
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.entry, self.due) {
            (None, None) => None,
            (Some(entry), None) => Some((entry, entry)),
            (None, Some(due)) => Some((due, due)),
            (Some(entry), Some(due)) if due < entry => Some((entry, entry)),
            (Some(entry), Some(due)) => Some((entry, due)),
        }
    }

    fn update_last_modified(&mut self) {
        self.last_modified = Utc::now();
    }


    /// Rename a task.
    /// This updates its "last modified" field
    pub fn set_name(&mut self, new_name: String) {
        self.update_last_modified();
        self.name = new_name;
    }

    /// Set the completion status
    pub fn set_completion_status(&mut self, new_completion_status: CompletionStatus) {
        self.update_last_modified();
        self.completion_status = new_completion_status;
    }

    /// Set (or clear) the entry and due dates
    pub fn set_dates(&mut self, entry: Option<DateTime<Utc>>, due: Option<DateTime<Utc>>) {
        self.update_last_modified();
        self.entry = entry;
        self.due = due;
    }

    pub(crate) fn project(&self, start: DateTime<Utc>, recurrence_id: DateTime<Utc>) -> Task {
        let mut instance = self.clone();
        if let Some((anchor, _)) = self.span() {
            let shift = start - anchor;
            instance.entry = self.entry.map(|d| d + shift);
            instance.due = self.due.map(|d| d + shift);
        }
        instance.recurrence_id = Some(recurrence_id);
        instance
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_span() {
        let cal: CalendarId = "https://some.calend.ar/main/".parse().unwrap();
        let entry = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let due = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();

        let dateless = Task::new("nothing".to_string(), false, &cal);
        assert!(dateless.is_dateless());
        assert_eq!(dateless.span(), None);

        let only_due = Task::new("due".to_string(), false, &cal).with_due(due);
        assert_eq!(only_due.span(), Some((due, due)));

        let both = Task::new("both".to_string(), false, &cal).with_entry(entry).with_due(due);
        assert_eq!(both.span(), Some((entry, due)));

        let moved = both.project(entry + chrono::Duration::days(7), entry + chrono::Duration::days(7));
        assert_eq!(moved.due(), Some(due + chrono::Duration::days(7)));
        assert_eq!(moved.recurrence_id(), Some(&(entry + chrono::Duration::days(7))));
    }
}
