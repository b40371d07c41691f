//! This crate keeps calendar views in sync with the calendars they display.
//!
//! A [`CalendarView`](view::CalendarView) displays the occurrences of the items of a calendar (usually a [composite calendar](calendar::composite_calendar::CompositeCalendar)) over a range of days.
//! Recurring items are expanded into their occurrences by the [`expander`].
//!
//! Views refresh themselves through cancellable [refresh jobs](refresh::RefreshJob), that run on the tokio runtime and stream their results back to the view.
//! At most one refresh is pending per calendar (see [`registry`]), so that results of an outdated query never mix with the results of a newer one. \
//! Hosts (calendars, the alarm service, the preference store) notify views through [`Observer`](notification::Observer)s, and the [`observer`] module decides how each notification affects a view.
//!
//! In-memory implementations of the host services are provided: [`MemoryCalendar`](calendar::memory_calendar::MemoryCalendar), [`AlarmMonitor`](alarms::AlarmMonitor) and [`Preferences`](prefs::Preferences).

pub mod traits;

pub mod calendar;
pub use calendar::memory_calendar::MemoryCalendar;
pub use calendar::composite_calendar::CompositeCalendar;
mod item;
pub use item::Item;
pub use item::ItemId;
pub use item::Recurrence;
mod task;
pub use task::Task;
pub use task::CompletionStatus;
mod event;
pub use event::Event;
mod range;
pub use range::DateRange;
mod occurrence;
pub use occurrence::{Occurrence, OccurrenceKey};

pub mod expander;
pub mod notification;
pub mod refresh;
pub mod registry;
pub mod state;
pub mod observer;
pub mod view;
pub use view::CalendarView;

pub mod alarms;
pub mod prefs;
pub mod mock_behaviour;

pub mod config;
pub mod utils;
