//! An in-memory alarm service

use std::collections::HashMap;
use std::sync::Mutex;

use crate::calendar::CalendarId;
use crate::item::{Item, ItemId};
use crate::notification::{AlarmNotification, Observer, ObserverId, ObserverList};
use crate::traits::{AlarmService, Observable};

/// Keeps track of fired alarms, and tells its observers about them
#[derive(Debug, Default)]
pub struct AlarmMonitor {
    fired: Mutex<HashMap<ItemId, Item>>,
    observers: ObserverList,
}

impl AlarmMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The alarm of `item` has gone off
    pub fn fire(&self, item: Item) {
        log::info!("Alarm fired for item {}", item.id());
        self.fired.lock().unwrap().insert(item.id().clone(), item.clone());
        self.observers.notify_alarm(AlarmNotification::AlarmFired(item));
    }

    /// The alarms of `item` have been dismissed
    pub fn remove_by_item(&self, item: &Item) {
        self.fired.lock().unwrap().remove(item.id());
        self.observers.notify_alarm(AlarmNotification::AlarmsRemovedForItem(item.clone()));
    }

    /// Every alarm of a calendar has been dismissed
    pub fn remove_by_calendar(&self, calendar: &CalendarId) {
        self.fired.lock().unwrap().retain(|_, item| item.calendar_id() != calendar);
        self.observers.notify_alarm(AlarmNotification::AlarmsRemovedForCalendar(calendar.clone()));
    }

    /// The alarms of a calendar have been loaded
    pub fn loaded(&self, calendar: &CalendarId) {
        self.observers.notify_alarm(AlarmNotification::AlarmsLoaded(calendar.clone()));
    }

    /// Items whose alarm has fired and has not been dismissed yet
    pub fn fired(&self) -> Vec<Item> {
        self.fired.lock().unwrap().values().cloned().collect()
    }
}

impl Observable for AlarmMonitor {
    fn add_observer(&self, observer: Observer) {
        self.observers.add(observer);
    }

    fn remove_observer(&self, id: ObserverId) {
        self.observers.remove(id);
    }
}

impl AlarmService for AlarmMonitor {}
