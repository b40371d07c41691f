use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::calendar::{CalendarId, ItemFilter, PropertyValue};
use crate::expander;
use crate::item::{Item, ItemId};
use crate::mock_behaviour::MockBehaviour;
use crate::notification::{CalendarNotification, Observer, ObserverId, ObserverList};
use crate::range::DateRange;
use crate::refresh::ResultListener;
use crate::traits::{CalendarSource, Observable, QueryError};

/// How many items are sent at once to the listener of a query
pub const BATCH_SIZE: usize = 20;

/// Increments a counter when dropped, unless it has been disarmed first
struct AbortGuard<'a> {
    counter: &'a AtomicUsize,
    armed: bool,
}

impl<'a> AbortGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        Self { counter, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<'a> Drop for AbortGuard<'a> {
    fn drop(&mut self) {
        if self.armed {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}


/// A calendar that keeps its items in memory.
///
/// Every mutation notifies the observers of this calendar.
/// Queries can be held (see [`MemoryCalendar::hold_fetches`]) so that tests can control when results are delivered
#[derive(Debug)]
pub struct MemoryCalendar {
    name: String,
    id: CalendarId,

    items: Mutex<HashMap<ItemId, Item>>,
    properties: Mutex<HashMap<String, PropertyValue>>,
    observers: ObserverList,
    mock_behaviour: Mutex<MockBehaviour>,

    held: AtomicBool,
    gate: Semaphore,
    started_fetches: AtomicUsize,
    completed_fetches: AtomicUsize,
    aborted_fetches: AtomicUsize,
}

impl MemoryCalendar {
    /// Create a new calendar
    pub fn new(name: String, id: CalendarId) -> Self {
        Self {
            name, id,
            items: Mutex::new(HashMap::new()),
            properties: Mutex::new(HashMap::new()),
            observers: ObserverList::new(),
            mock_behaviour: Mutex::new(MockBehaviour::new()),
            held: AtomicBool::new(false),
            gate: Semaphore::new(0),
            started_fetches: AtomicUsize::new(0),
            completed_fetches: AtomicUsize::new(0),
            aborted_fetches: AtomicUsize::new(0),
        }
    }

    /// Returns a copy of the items this calendar contains
    pub fn items(&self) -> Vec<Item> {
        self.items.lock().unwrap().values().cloned().collect()
    }

    pub fn get_item_by_id(&self, id: &ItemId) -> Option<Item> {
        self.items.lock().unwrap().get(id).cloned()
    }

    /// Add an item, or replace the item that has the same ID
    pub fn add_item(&self, item: Item) {
        let previous = self.items.lock().unwrap().insert(item.id().clone(), item.clone());
        match previous {
            None => self.observers.notify_calendar(CalendarNotification::ItemAdded(item)),
            Some(old) => self.observers.notify_calendar(CalendarNotification::ItemModified{ old, new: item }),
        }
    }

    /// Replace an existing item
    pub fn modify_item(&self, item: Item) -> Result<(), QueryError> {
        let old = {
            let mut items = self.items.lock().unwrap();
            match items.get_mut(item.id()) {
                None => return Err(format!("No item {} in calendar {}", item.id(), self.id).into()),
                Some(existing) => std::mem::replace(existing, item.clone()),
            }
        };
        self.observers.notify_calendar(CalendarNotification::ItemModified{ old, new: item });
        Ok(())
    }

    pub fn delete_item(&self, id: &ItemId) -> Result<Item, QueryError> {
        let removed = match self.items.lock().unwrap().remove(id) {
            None => return Err("This key does not exist.".into()),
            Some(removed) => removed,
        };
        self.observers.notify_calendar(CalendarNotification::ItemDeleted(removed.clone()));
        Ok(removed)
    }

    /// Set a property, and notify observers
    pub fn set_property(self: &Arc<Self>, name: &str, value: PropertyValue) {
        let old_value = self.properties.lock().unwrap().insert(name.to_string(), value.clone());
        if old_value.as_ref() == Some(&value) {
            return;
        }
        let calendar: Arc<dyn CalendarSource> = Arc::clone(self) as Arc<dyn CalendarSource>;
        self.observers.notify_calendar(CalendarNotification::PropertyChanged{
            calendar,
            name: name.to_string(),
            value: Some(value),
            old_value,
        });
    }

    /// Remove a property. Observers are notified before it is actually removed
    pub fn remove_property(self: &Arc<Self>, name: &str) -> Option<PropertyValue> {
        if self.properties.lock().unwrap().contains_key(name) == false {
            return None;
        }
        let calendar: Arc<dyn CalendarSource> = Arc::clone(self) as Arc<dyn CalendarSource>;
        self.observers.notify_calendar(CalendarNotification::PropertyDeleting{ calendar, name: name.to_string() });
        self.properties.lock().unwrap().remove(name)
    }

    /// Tell observers this calendar has (re)loaded its items
    pub fn notify_loaded(&self) {
        self.observers.notify_calendar(CalendarNotification::Load);
    }

    /// Tell observers this calendar has encountered an error
    pub fn notify_error(&self, message: &str) {
        self.observers.notify_calendar(CalendarNotification::Error{ calendar: self.id.clone(), message: message.to_string() });
    }

    pub fn set_mock_behaviour(&self, behaviour: MockBehaviour) {
        *self.mock_behaviour.lock().unwrap() = behaviour;
    }

    /// Make queries wait until [`MemoryCalendar::release_fetches`] lets them go
    pub fn hold_fetches(&self, hold: bool) {
        self.held.store(hold, Ordering::SeqCst);
    }

    /// Let `count` held queries go on
    pub fn release_fetches(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// How many queries have started
    pub fn started_fetches(&self) -> usize {
        self.started_fetches.load(Ordering::SeqCst)
    }

    /// How many queries have run to completion, successfully or not
    pub fn completed_fetches(&self) -> usize {
        self.completed_fetches.load(Ordering::SeqCst)
    }

    /// How many queries have been dropped before they could complete
    pub fn aborted_fetches(&self) -> usize {
        self.aborted_fetches.load(Ordering::SeqCst)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// The items that match a query. Recurring items are expanded into their instances if `filter` asks for it
    fn matching_items(&self, filter: ItemFilter, range: &DateRange) -> Vec<Item> {
        let items = self.items.lock().unwrap();
        let mut result = Vec::new();
        for item in items.values().filter(|item| filter.accepts(item)) {
            if item.is_dateless_task() {
                result.push(item.clone());
                continue;
            }
            let mut occurrences = expander::expand(item, range).peekable();
            if item.is_recurring() && filter.contains(ItemFilter::CLASS_OCCURRENCES) {
                result.extend(occurrences.map(|occ| occ.item().clone()));
            } else if occurrences.peek().is_some() {
                result.push(item.clone());
            }
        }
        result
    }
}

impl Observable for MemoryCalendar {
    fn add_observer(&self, observer: Observer) {
        self.observers.add(observer);
    }

    fn remove_observer(&self, id: ObserverId) {
        self.observers.remove(id);
    }
}

#[async_trait]
impl CalendarSource for MemoryCalendar {
    fn id(&self) -> &CalendarId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.properties.lock().unwrap().get(name).cloned()
    }

    async fn get_items(&self, filter: ItemFilter, max_results: usize, range: DateRange, listener: &ResultListener) -> Result<(), QueryError> {
        self.started_fetches.fetch_add(1, Ordering::SeqCst);
        let mut guard = AbortGuard::new(&self.aborted_fetches);

        if self.held.load(Ordering::SeqCst) {
            self.gate.acquire().await?.forget();
        }

        let result = self.run_query(filter, max_results, range, listener).await;
        guard.disarm();
        self.completed_fetches.fetch_add(1, Ordering::SeqCst);
        result
    }
}

impl MemoryCalendar {
    async fn run_query(&self, filter: ItemFilter, max_results: usize, range: DateRange, listener: &ResultListener) -> Result<(), QueryError> {
        let allowed = self.mock_behaviour.lock().unwrap().can_get_items();
        if let Err(err) = allowed {
            listener.on_result(Err(format!("Unable to query calendar {}: {}", self.id, err).into()));
            return Err(err);
        }

        let mut items = self.matching_items(filter, &range);
        if max_results > 0 {
            items.truncate(max_results);
        }

        for batch in items.chunks(BATCH_SIZE) {
            if listener.is_cancelled() {
                log::debug!("Query of calendar {} cancelled", self.id);
                return Ok(());
            }
            listener.on_result(Ok(batch.to_vec()));
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}
