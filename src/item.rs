//! Calendar items (events and tasks)

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;
use chrono::{DateTime, Utc};

use crate::calendar::CalendarId;



#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Event(crate::event::Event),
    Task(crate::task::Task),
}

/// Returns `task.$property_name` or `event.$property_name`, depending on whether self is a Task or an Event
macro_rules! synthetise_common_getter {
    ($property_name:ident, $return_type:ty) => {
        pub fn $property_name(&self) -> $return_type {
            match self {
                Item::Event(e) => e.$property_name(),
                Item::Task(t) => t.$property_name(),
            }
        }
    }
}

impl Item {
    synthetise_common_getter!(id, &ItemId);
    synthetise_common_getter!(calendar_id, &CalendarId);
    synthetise_common_getter!(name, &str);
    synthetise_common_getter!(recurrence, Option<&Recurrence>);
    synthetise_common_getter!(recurrence_id, Option<&DateTime<Utc>>);
    synthetise_common_getter!(span, Option<(DateTime<Utc>, DateTime<Utc>)>);

    pub fn is_event(&self) -> bool {
        match &self {
            Item::Event(_) => true,
            _ => false,
        }
    }

    pub fn is_task(&self) -> bool {
        match &self {
            Item::Task(_) => true,
            _ => false,
        }
    }

    /// Whether this item is a task that has neither an entry date nor a due date.
    ///
    /// Such tasks cannot be placed on a time grid, so views never display them
    pub fn is_dateless_task(&self) -> bool {
        match self {
            Item::Task(t) => t.is_dateless(),
            _ => false,
        }
    }

    /// Whether this item is a completed task (events are never completed)
    pub fn is_completed(&self) -> bool {
        match self {
            Item::Task(t) => t.completed(),
            _ => false,
        }
    }

    /// Whether this is a recurrence master, i.e. an item with a recurrence rule that has not been projected on a single instance yet
    pub fn is_recurring(&self) -> bool {
        self.recurrence().is_some() && self.recurrence_id().is_none()
    }

    /// Returns a copy of this item, moved so that it starts at `start`, and tagged with `recurrence_id`
    pub(crate) fn project(&self, start: DateTime<Utc>, recurrence_id: DateTime<Utc>) -> Item {
        match self {
            Item::Event(e) => Item::Event(e.project(start, recurrence_id)),
            Item::Task(t) => Item::Task(t.project(start, recurrence_id)),
        }
    }
}


#[derive(Clone, Debug, PartialEq, Hash)]
pub struct ItemId {
    content: Url,
}
impl ItemId{
    /// Generate a random ItemId.
    pub fn random(parent_calendar: &CalendarId) -> Self {
        let random = uuid::Uuid::new_v4().to_hyphenated().to_string();
        let u = parent_calendar.join(&random).unwrap(/* this cannot panic since we've just created a string that is a valid URL */);
        Self { content:u }
    }

    pub fn as_url(&self) -> &Url {
        &self.content
    }
}
impl From<Url> for ItemId {
    fn from(url: Url) -> Self {
        Self { content: url }
    }
}
impl FromStr for ItemId {
    type Err = url::ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let u: Url = s.parse()?;
        Ok(Self::from(u))
    }
}

impl Eq for ItemId {}
impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// Used to support serde
impl Serialize for ItemId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.content.as_str())
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<ItemId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let u = Url::deserialize(deserializer)?;
        Ok(ItemId{ content: u })
    }
}



/// How an item repeats over time
///
/// `rule` is the value of an iCal `RRULE` property (e.g. `FREQ=DAILY;COUNT=10`), without the `RRULE:` prefix.
/// `UNTIL` values must be expressed in UTC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    rule: String,
    exceptions: Vec<DateTime<Utc>>,
}

impl Recurrence {
    pub fn new<S: Into<String>>(rule: S) -> Self {
        Self { rule: rule.into(), exceptions: Vec::new() }
    }

    /// Add an `EXDATE`, i.e. an instance that must be skipped
    pub fn with_exception(mut self, instance: DateTime<Utc>) -> Self {
        self.exceptions.push(instance);
        self
    }

    pub fn rule(&self) -> &str { &self.rule }
    pub fn exceptions(&self) -> &[DateTime<Utc>] { &self.exceptions }
}
