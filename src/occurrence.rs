//! Concrete instances of (possibly recurring) items

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::calendar::CalendarId;
use crate::item::{Item, ItemId};

/// Identifies an occurrence among the items a view displays
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OccurrenceKey {
    pub item_id: ItemId,
    pub recurrence_id: Option<DateTime<Utc>>,
}

impl Display for OccurrenceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.recurrence_id {
            None => write!(f, "{}", self.item_id),
            Some(rid) => write!(f, "{} @ {}", self.item_id, rid.to_rfc3339()),
        }
    }
}


/// One concrete time-instance of an item.
///
/// For non-recurring items, this is the item itself.
/// For recurring items, `instance` is a copy of the parent that has been moved to the instance time, and that carries a recurrence ID.
#[derive(Clone, Debug, PartialEq)]
pub struct Occurrence {
    parent: Arc<Item>,
    instance: Item,
}

impl Occurrence {
    /// The occurrence of a non-recurring item
    pub fn single(parent: Arc<Item>) -> Self {
        let instance = (*parent).clone();
        Self { parent, instance }
    }

    /// The instance of a recurring item that starts at `start`
    pub fn instance(parent: Arc<Item>, start: DateTime<Utc>) -> Self {
        let instance = parent.project(start, start);
        Self { parent, instance }
    }

    /// The item this occurrence has been derived from
    pub fn parent(&self) -> &Item { &self.parent }
    /// The item, as it looks at the time of this occurrence
    pub fn item(&self) -> &Item { &self.instance }

    pub fn id(&self) -> &ItemId { self.instance.id() }
    pub fn calendar_id(&self) -> &CalendarId { self.instance.calendar_id() }
    pub fn recurrence_id(&self) -> Option<&DateTime<Utc>> { self.instance.recurrence_id() }
    pub fn is_task(&self) -> bool { self.instance.is_task() }
    pub fn is_event(&self) -> bool { self.instance.is_event() }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.instance.span().map(|(start, _)| start)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.instance.span().map(|(_, end)| end)
    }

    pub fn key(&self) -> OccurrenceKey {
        OccurrenceKey {
            item_id: self.id().clone(),
            recurrence_id: self.recurrence_id().cloned(),
        }
    }
}
