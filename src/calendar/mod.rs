pub mod memory_calendar;
pub mod composite_calendar;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use bitflags::bitflags;

bitflags! {
    /// Flags that tell a [`CalendarSource`](crate::traits::CalendarSource) which items a query should return
    pub struct ItemFilter: u32 {
        /// Return tasks whose completion is done
        const COMPLETED_YES = 1 << 0;
        /// Return tasks that are not completed yet
        const COMPLETED_NO = 1 << 1;
        /// Return tasks regardless of their completion
        const COMPLETED_ALL = Self::COMPLETED_YES.bits | Self::COMPLETED_NO.bits;

        /// Return events
        const TYPE_EVENT = 1 << 3;
        /// Return tasks
        const TYPE_TODO = 1 << 4;
        /// Return every kind of item
        const TYPE_ALL = Self::TYPE_EVENT.bits | Self::TYPE_TODO.bits;

        /// Expand recurring items into their occurrences within the queried range
        const CLASS_OCCURRENCES = 1 << 10;
    }
}

impl ItemFilter {
    /// Whether an item matches the type and completion parts of this filter
    pub fn accepts(&self, item: &crate::Item) -> bool {
        if item.is_event() {
            return self.contains(Self::TYPE_EVENT);
        }
        if self.contains(Self::TYPE_TODO) == false {
            return false;
        }
        if item.is_completed() {
            self.contains(Self::COMPLETED_YES)
        } else {
            self.contains(Self::COMPLETED_NO)
        }
    }
}


/// The value of a calendar property (e.g. `readOnly`, `disabled`...)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Str(s) => write!(f, "{}", s),
        }
    }
}


pub type CalendarId = url::Url;

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Event, Item, Task};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_filter_accepts() {
        let cal: CalendarId = "https://some.calend.ar/main/".parse().unwrap();
        let date = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let event = Item::Event(Event::new("ev".to_string(), date, date, &cal));
        let done = Item::Task(Task::new("done".to_string(), true, &cal).with_due(date));
        let todo = Item::Task(Task::new("todo".to_string(), false, &cal).with_due(date));

        let events_only = ItemFilter::TYPE_EVENT | ItemFilter::COMPLETED_ALL;
        assert!(events_only.accepts(&event));
        assert!(events_only.accepts(&todo) == false);

        let pending = ItemFilter::TYPE_ALL | ItemFilter::COMPLETED_NO;
        assert!(pending.accepts(&event));
        assert!(pending.accepts(&todo));
        assert!(pending.accepts(&done) == false);
    }
}
