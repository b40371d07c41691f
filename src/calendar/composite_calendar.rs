use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::calendar::{CalendarId, ItemFilter, PropertyValue};
use crate::notification::{CalendarNotification, Observer, ObserverId, ObserverList};
use crate::range::DateRange;
use crate::refresh::ResultListener;
use crate::traits::{CalendarSource, Observable, QueryError};

/// A calendar that aggregates other calendars.
///
/// Observers of a composite calendar also observe every calendar it contains, and are told when calendars are added or removed
pub struct CompositeCalendar {
    name: String,
    id: CalendarId,

    calendars: Mutex<Vec<Arc<dyn CalendarSource>>>,
    default_calendar: Mutex<Option<CalendarId>>,
    observers: ObserverList,
}

impl CompositeCalendar {
    pub fn new(name: String, id: CalendarId) -> Self {
        Self {
            name, id,
            calendars: Mutex::new(Vec::new()),
            default_calendar: Mutex::new(None),
            observers: ObserverList::new(),
        }
    }

    /// Returns the calendars this composite contains
    pub fn calendars(&self) -> Vec<Arc<dyn CalendarSource>> {
        self.calendars.lock().unwrap().clone()
    }

    pub fn get_calendar(&self, id: &CalendarId) -> Option<Arc<dyn CalendarSource>> {
        self.calendars.lock().unwrap().iter()
            .find(|cal| cal.id() == id)
            .cloned()
    }

    /// Register a calendar. Nothing happens if a calendar with the same ID is already registered
    pub fn add_calendar(&self, calendar: Arc<dyn CalendarSource>) {
        {
            let mut calendars = self.calendars.lock().unwrap();
            if calendars.iter().any(|cal| cal.id() == calendar.id()) {
                log::debug!("Calendar {} is already part of {}", calendar.id(), self.id);
                return;
            }
            calendars.push(Arc::clone(&calendar));
        }

        for observer in self.observers.snapshot() {
            calendar.add_observer(observer);
        }
        self.observers.notify_calendar(CalendarNotification::CalendarAdded(calendar));
    }

    /// Unregister a calendar, and return it
    pub fn remove_calendar(&self, id: &CalendarId) -> Option<Arc<dyn CalendarSource>> {
        let removed = {
            let mut calendars = self.calendars.lock().unwrap();
            let index = calendars.iter().position(|cal| cal.id() == id)?;
            calendars.remove(index)
        };

        for observer in self.observers.snapshot() {
            removed.remove_observer(observer.id());
        }
        self.observers.notify_calendar(CalendarNotification::CalendarRemoved(Arc::clone(&removed)));
        Some(removed)
    }

    pub fn default_calendar(&self) -> Option<CalendarId> {
        self.default_calendar.lock().unwrap().clone()
    }

    pub fn set_default_calendar(&self, id: CalendarId) {
        *self.default_calendar.lock().unwrap() = Some(id.clone());
        self.observers.notify_calendar(CalendarNotification::DefaultCalendarChanged(id));
    }
}

impl Observable for CompositeCalendar {
    fn add_observer(&self, observer: Observer) {
        for calendar in self.calendars() {
            calendar.add_observer(observer.clone());
        }
        self.observers.add(observer);
    }

    fn remove_observer(&self, id: ObserverId) {
        for calendar in self.calendars() {
            calendar.remove_observer(id);
        }
        self.observers.remove(id);
    }
}

#[async_trait]
impl CalendarSource for CompositeCalendar {
    fn id(&self) -> &CalendarId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn property(&self, _name: &str) -> Option<PropertyValue> {
        None
    }

    /// Query every enabled calendar, one after the other.
    ///
    /// A calendar that fails does not prevent the other ones from being queried, but the whole query is reported as failed
    async fn get_items(&self, filter: ItemFilter, max_results: usize, range: DateRange, listener: &ResultListener) -> Result<(), QueryError> {
        let mut failures = Vec::new();

        for calendar in self.calendars() {
            if calendar.is_disabled() {
                log::trace!("Not querying disabled calendar {}", calendar.id());
                continue;
            }
            if listener.is_cancelled() {
                return Ok(());
            }
            if let Err(err) = calendar.get_items(filter, max_results, range, listener).await {
                log::warn!("Unable to query calendar {}: {}", calendar.id(), err);
                failures.push(calendar.id().clone());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            let ids: Vec<String> = failures.iter().map(|id| id.to_string()).collect();
            Err(format!("Unable to query {} calendar(s): {}", failures.len(), ids.join(", ")).into())
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::calendar::memory_calendar::MemoryCalendar;
    use crate::config;
    use crate::item::Item;
    use crate::mock_behaviour::MockBehaviour;
    use crate::notification::ViewEvent;
    use crate::refresh::{JobEvent, JobKey};
    use crate::Event;

    fn member(name: &str) -> Arc<MemoryCalendar> {
        let url = format!("https://some.calend.ar/{}/", name).parse().unwrap();
        let cal = Arc::new(MemoryCalendar::new(name.to_string(), url));
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        cal.add_item(Item::Event(Event::new(format!("Event of {}", name), start, start + Duration::hours(1), cal.id())));
        cal
    }

    #[test]
    fn test_observers_follow_members() {
        let composite = CompositeCalendar::new("all".to_string(), "https://some.calend.ar/".parse().unwrap());
        let work = member("work");
        composite.add_calendar(work.clone());

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let observer = Observer::new(tx);
        composite.add_observer(observer.clone());
        assert_eq!(work.observer_count(), 1);

        let home = member("home");
        composite.add_calendar(home.clone());
        composite.add_calendar(home.clone());
        assert_eq!(home.observer_count(), 1);
        assert_eq!(composite.calendars().len(), 2);

        assert!(composite.remove_calendar(work.id()).is_some());
        assert!(composite.remove_calendar(work.id()).is_none());
        assert_eq!(work.observer_count(), 0);

        let mut notifications = Vec::new();
        while let Ok(ViewEvent::Calendar(notification)) = rx.try_recv() {
            notifications.push(notification);
        }
        assert_eq!(notifications.len(), 2);
        assert!(matches!(notifications[0], CalendarNotification::CalendarAdded(_)));
        assert!(matches!(notifications[1], CalendarNotification::CalendarRemoved(_)));

        composite.remove_observer(observer.id());
        assert_eq!(home.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_get_items_fans_out() {
        let composite = CompositeCalendar::new("all".to_string(), "https://some.calend.ar/".parse().unwrap());
        let work = member("work");
        let home = member("home");
        let broken = member("broken");
        let disabled = member("disabled");
        broken.set_mock_behaviour(MockBehaviour::fail_now(1));
        disabled.set_property(config::PROP_DISABLED, PropertyValue::Bool(true));
        for cal in &[&work, &home, &broken, &disabled] {
            composite.add_calendar(Arc::clone(cal) as Arc<dyn CalendarSource>);
        }

        let range = DateRange::new(Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap(), Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let listener = ResultListener::new(JobKey::Composite, range, tx);
        let status = composite.get_items(ItemFilter::TYPE_ALL | ItemFilter::COMPLETED_ALL, 0, range, &listener).await;
        assert!(status.is_err());

        let mut items = 0;
        let mut errors = 0;
        while let Ok(ViewEvent::Job(JobEvent::Results{ result, .. })) = rx.try_recv() {
            match result {
                Ok(batch) => items += batch.len(),
                Err(_) => errors += 1,
            }
        }
        assert_eq!(items, 2);
        assert_eq!(errors, 1);
        assert_eq!(disabled.started_fetches(), 0);
    }
}
