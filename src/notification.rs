//! Notifications that hosts send to calendar views
//!
//! Every host (calendars, alarm service, preference store) talks to a view through an [`Observer`], which forwards tagged [`ViewEvent`]s into the view's event queue.
//! The view then handles them one at a time, in the order they were sent.

use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;

use crate::calendar::{CalendarId, PropertyValue};
use crate::item::Item;
use crate::refresh::JobEvent;
use crate::traits::CalendarSource;


/// Mutation and lifecycle notifications emitted by calendars
#[derive(Clone)]
pub enum CalendarNotification {
    /// The calendar has (re)loaded its items
    Load,
    StartBatch,
    EndBatch,
    ItemAdded(Item),
    ItemModified { old: Item, new: Item },
    ItemDeleted(Item),
    Error { calendar: CalendarId, message: String },
    PropertyChanged {
        calendar: Arc<dyn CalendarSource>,
        name: String,
        value: Option<PropertyValue>,
        old_value: Option<PropertyValue>,
    },
    PropertyDeleting { calendar: Arc<dyn CalendarSource>, name: String },
    /// A calendar has been registered in a composite calendar
    CalendarAdded(Arc<dyn CalendarSource>),
    /// A calendar has been unregistered from a composite calendar
    CalendarRemoved(Arc<dyn CalendarSource>),
    DefaultCalendarChanged(CalendarId),
}

impl std::fmt::Debug for CalendarNotification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "Load"),
            Self::StartBatch => write!(f, "StartBatch"),
            Self::EndBatch => write!(f, "EndBatch"),
            Self::ItemAdded(item) => write!(f, "ItemAdded({})", item.id()),
            Self::ItemModified{ new, .. } => write!(f, "ItemModified({})", new.id()),
            Self::ItemDeleted(item) => write!(f, "ItemDeleted({})", item.id()),
            Self::Error{ calendar, message } => write!(f, "Error({}: {})", calendar, message),
            Self::PropertyChanged{ calendar, name, .. } => write!(f, "PropertyChanged({}, {})", calendar.id(), name),
            Self::PropertyDeleting{ calendar, name } => write!(f, "PropertyDeleting({}, {})", calendar.id(), name),
            Self::CalendarAdded(cal) => write!(f, "CalendarAdded({})", cal.id()),
            Self::CalendarRemoved(cal) => write!(f, "CalendarRemoved({})", cal.id()),
            Self::DefaultCalendarChanged(id) => write!(f, "DefaultCalendarChanged({})", id),
        }
    }
}

/// Notifications emitted by the alarm service
#[derive(Clone, Debug)]
pub enum AlarmNotification {
    AlarmFired(Item),
    AlarmsRemovedForItem(Item),
    AlarmsRemovedForCalendar(CalendarId),
    AlarmsLoaded(CalendarId),
}

/// Everything a view may have to react to
#[derive(Debug)]
pub enum ViewEvent {
    Calendar(CalendarNotification),
    Alarm(AlarmNotification),
    /// The preference with this name has changed
    Preference(String),
    /// Progress of a refresh job
    Job(JobEvent),
}


/// Identifies an observer, so that it can be unregistered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for ObserverId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}


/// A handle hosts use to notify a view.
///
/// Sending never blocks. Notifications sent to a view that has been dropped are silently discarded
#[derive(Clone, Debug)]
pub struct Observer {
    id: ObserverId,
    sender: UnboundedSender<ViewEvent>,
}

impl Observer {
    pub fn new(sender: UnboundedSender<ViewEvent>) -> Self {
        Self { id: ObserverId::next(), sender }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn notify(&self, event: ViewEvent) {
        if self.sender.send(event).is_err() {
            log::trace!("{} is gone, dropping a notification", self.id);
        }
    }

    pub fn notify_calendar(&self, notification: CalendarNotification) {
        self.notify(ViewEvent::Calendar(notification))
    }

    pub fn notify_alarm(&self, notification: AlarmNotification) {
        self.notify(ViewEvent::Alarm(notification))
    }

    pub fn notify_preference(&self, name: &str) {
        self.notify(ViewEvent::Preference(name.to_string()))
    }
}


/// The observers of a host.
///
/// Registering the same observer twice has no effect
#[derive(Debug, Default)]
pub struct ObserverList {
    observers: Mutex<Vec<Observer>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Observer) {
        let mut observers = self.observers.lock().unwrap();
        if observers.iter().any(|obs| obs.id() == observer.id()) {
            return;
        }
        observers.push(observer);
    }

    pub fn remove(&self, id: ObserverId) {
        self.observers.lock().unwrap().retain(|obs| obs.id() != id);
    }

    pub fn len(&self) -> usize {
        self.observers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the registered observers
    pub fn snapshot(&self) -> Vec<Observer> {
        self.observers.lock().unwrap().clone()
    }

    pub fn notify_calendar(&self, notification: CalendarNotification) {
        for observer in self.snapshot() {
            observer.notify_calendar(notification.clone());
        }
    }

    pub fn notify_alarm(&self, notification: AlarmNotification) {
        for observer in self.snapshot() {
            observer.notify_alarm(notification.clone());
        }
    }

    pub fn notify_preference(&self, name: &str) {
        for observer in self.snapshot() {
            observer.notify_preference(name);
        }
    }
}
