//! Refreshes of a calendar view: job scheduling, cancellation and completion
mod scenarii;

use std::sync::Arc;

use async_trait::async_trait;

use calview::alarms::AlarmMonitor;
use calview::calendar::{CalendarId, ItemFilter, PropertyValue};
use calview::config;
use calview::mock_behaviour::MockBehaviour;
use calview::notification::{Observer, ObserverId};
use calview::prefs::Preferences;
use calview::refresh::{JobKey, ResultListener};
use calview::traits::{CalendarSource, Observable, PreferenceStore, QueryError};
use calview::view::{CalendarView, Hosts};
use calview::{CompositeCalendar, DateRange, Item, Recurrence, Task};

use scenarii::*;

/// A calendar whose queries always panic
struct PanickingCalendar {
    id: CalendarId,
}

impl Observable for PanickingCalendar {
    fn add_observer(&self, _observer: Observer) {}
    fn remove_observer(&self, _id: ObserverId) {}
}

#[async_trait]
impl CalendarSource for PanickingCalendar {
    fn id(&self) -> &CalendarId { &self.id }
    fn name(&self) -> &str { "panicking" }
    fn property(&self, _name: &str) -> Option<PropertyValue> { None }

    async fn get_items(&self, _filter: ItemFilter, _max_results: usize, _range: DateRange, _listener: &ResultListener) -> Result<(), QueryError> {
        panic!("This calendar is broken");
    }
}

#[tokio::test]
async fn test_second_refresh_supersedes_the_first() {
    init_logger();

    let cal1 = calendar("cal1");
    let lunch = event(&cal1, "Lunch", at(4, 12), 1);
    cal1.add_item(Item::Event(lunch.clone()));
    cal1.hold_fetches(true);

    let mut view = CalendarView::new(RecordingRenderer::new());
    view.start(&Hosts::new());
    view.set_display_calendar(cal1.clone());
    assert!(view.set_range(date(4), date(10)));
    assert_eq!(view.pending_refreshes(), 1);

    // The first fetch is pending when the second refresh starts
    wait_until(|| cal1.started_fetches() == 1).await;
    view.force_refresh();
    assert_eq!(view.pending_refreshes(), 1);
    assert!(view.has_pending_refresh(&JobKey::Calendar(cal1.id().clone())));

    cal1.release_fetches(1);
    view.run_until_idle().await;
    wait_until(|| cal1.aborted_fetches() == 1).await;

    assert_eq!(cal1.started_fetches(), 2);
    assert_eq!(cal1.completed_fetches(), 1);
    assert_eq!(cal1.aborted_fetches(), 1);
    assert_eq!(view.pending_refreshes(), 0);
    assert_eq!(view.renderer().additions_of(lunch.id()), 1);
    assert_eq!(view.renderer().loaded, 1);
    assert_eq!(view.state().rendered_count(), 1);
}

#[tokio::test]
async fn test_composite_refresh_cancels_every_pending_refresh() {
    init_logger();

    let cal1 = calendar("cal1");
    let cal2 = calendar("cal2");
    cal1.add_item(Item::Event(event(&cal1, "Lunch", at(4, 12), 1)));
    cal2.add_item(Item::Event(event(&cal2, "Gym", at(5, 18), 1)));
    cal1.hold_fetches(true);
    cal2.hold_fetches(true);

    let composite = Arc::new(CompositeCalendar::new("all".to_string(), "https://some.calend.ar/".parse().unwrap()));
    composite.add_calendar(cal1.clone());
    composite.add_calendar(cal2.clone());

    let mut view = CalendarView::new(RecordingRenderer::new());
    view.start(&Hosts::new());
    view.set_display_calendar(composite.clone());
    view.set_range(date(4), date(10));
    view.add_items_from_calendar(cal1.clone());
    view.add_items_from_calendar(cal2.clone());
    assert_eq!(view.pending_refreshes(), 3);

    let relayouts = view.renderer().relayouts;
    view.refresh(false);
    assert_eq!(view.pending_refreshes(), 1);
    assert!(view.has_pending_refresh(&JobKey::Composite));
    assert!(view.renderer().relayouts > relayouts);

    cal1.hold_fetches(false);
    cal2.hold_fetches(false);
    view.run_until_idle().await;

    assert_eq!(view.state().rendered_count(), 2);
    assert_eq!(view.renderer().added.len(), 2);
    assert_eq!(view.renderer().loaded, 1);
}

#[tokio::test]
async fn test_cancel_after_completion_suppresses_view_loaded() {
    init_logger();

    let cal1 = calendar("cal1");
    cal1.add_item(Item::Event(event(&cal1, "Lunch", at(4, 12), 1)));

    let mut view = CalendarView::new(RecordingRenderer::new());
    view.start(&Hosts::new());
    view.set_display_calendar(cal1.clone());
    view.set_range(date(4), date(10));

    // The fetch completes, but the view has not processed its completion yet
    wait_until(|| cal1.completed_fetches() == 1).await;
    assert_eq!(view.cancel_pending_refreshes(), 1);
    view.process_pending_events();

    assert_eq!(view.renderer().loaded, 0);
    assert_eq!(view.state().rendered_count(), 0);
    assert_eq!(view.pending_refreshes(), 0);

    // Without cancellation, the view is notified
    view.force_refresh();
    view.run_until_idle().await;
    assert_eq!(view.renderer().loaded, 1);
    assert_eq!(view.state().rendered_count(), 1);
}

#[tokio::test]
async fn test_failed_refresh() {
    init_logger();

    let cal1 = calendar("cal1");
    cal1.add_item(Item::Event(event(&cal1, "Lunch", at(4, 12), 1)));
    cal1.set_mock_behaviour(MockBehaviour::fail_now(1));

    let mut view = CalendarView::new(RecordingRenderer::new());
    view.start(&Hosts::new());
    view.set_display_calendar(cal1.clone());
    view.set_range(date(4), date(10));
    view.run_until_idle().await;
    assert_eq!(view.renderer().loaded, 0);
    assert_eq!(view.state().rendered_count(), 0);

    // Failures are not retried, but the next refresh works
    view.force_refresh();
    view.run_until_idle().await;
    assert_eq!(view.renderer().loaded, 1);
    assert_eq!(view.state().rendered_count(), 1);
}

#[tokio::test]
async fn test_daily_recurrence_over_two_days() {
    init_logger();

    let cal1 = calendar("cal1");
    let daily = event(&cal1, "Stand-up", at(1, 10), 1).with_recurrence(Recurrence::new("FREQ=DAILY;COUNT=10"));
    cal1.add_item(Item::Event(daily.clone()));

    let mut view = CalendarView::new(RecordingRenderer::new());
    view.start(&Hosts::new());
    view.set_display_calendar(cal1.clone());
    view.set_range(date(1), date(2));
    view.run_until_idle().await;

    let occurrences = view.state().rendered_occurrences_of(daily.id());
    assert_eq!(occurrences.len(), 2);
    assert!(occurrences.iter().all(|occ| occ.recurrence_id().is_some()));
}

#[tokio::test]
async fn test_hidden_views_only_refresh_when_forced() {
    init_logger();

    let cal1 = calendar("cal1");
    cal1.add_item(Item::Event(event(&cal1, "Lunch", at(4, 12), 1)));

    let mut view = CalendarView::new(RecordingRenderer::hidden());
    view.start(&Hosts::new());
    view.set_display_calendar(cal1.clone());
    view.set_range(date(4), date(10));
    assert_eq!(view.pending_refreshes(), 0);
    assert!(view.initialized());

    view.force_refresh();
    view.run_until_idle().await;
    assert_eq!(view.state().rendered_count(), 1);
}

#[tokio::test]
async fn test_workdays_only() {
    init_logger();

    let cal1 = calendar("cal1");
    // 2024-03-01 is a Friday
    cal1.add_item(Item::Event(event(&cal1, "Friday", at(1, 9), 1)));
    cal1.add_item(Item::Event(event(&cal1, "Saturday", at(2, 9), 1)));
    cal1.add_item(Item::Event(event(&cal1, "Monday", at(4, 9), 1)));

    let prefs: Arc<dyn PreferenceStore> = Arc::new(Preferences::new_in_memory());
    let mut view = CalendarView::new(RecordingRenderer::new());
    view.start(&Hosts::new().with_preferences(Arc::clone(&prefs)));
    view.set_display_calendar(cal1.clone());
    view.set_range(date(1), date(4));
    view.run_until_idle().await;
    assert_eq!(view.state().rendered_count(), 3);

    view.set_workdays_only(true);
    view.run_until_idle().await;
    assert_eq!(view.state().rendered_count(), 2);
    assert_eq!(view.state().visible_days(), vec![date(1), date(4)]);
    assert!(prefs.get_bool(config::PREF_WORKDAYS_ONLY, false));

    // Saturday becomes a work day
    prefs.set_bool("calendar.week.d6saturdaysoff", false);
    view.run_until_idle().await;
    assert_eq!(view.state().rendered_count(), 3);
}

#[tokio::test]
async fn test_preferences_are_applied() {
    init_logger();

    let prefs: Arc<dyn PreferenceStore> = Arc::new(Preferences::new_in_memory());
    prefs.set_bool(config::PREF_TASKS_IN_VIEW, true);
    prefs.set_int(config::PREF_WEEK_START, 1);

    let mut view = CalendarView::new(RecordingRenderer::new());
    view.start(&Hosts::new().with_preferences(Arc::clone(&prefs)));
    assert!(view.state().filters().tasks_in_view);
    assert_eq!(view.state().week_start_offset(), 1);

    prefs.set_int(config::PREF_WEEK_START, 8);
    prefs.set_string("calendar.category.color.work", "rebeccapurple");
    prefs.set_string("calendar.category.color.home", "not a colour");
    prefs.set_bool(config::PREF_SHOW_COMPLETED, true);
    view.process_pending_events();

    assert_eq!(view.state().week_start_offset(), 1);
    assert!(view.state().category_color("work").is_some());
    assert!(view.state().category_color("home").is_none());
    assert!(view.state().filters().show_completed);

    view.set_tasks_in_view(false);
    assert!(prefs.get_bool(config::PREF_TASKS_IN_VIEW, true) == false);
}

#[tokio::test]
async fn test_stop_unregisters_everything() {
    init_logger();

    let cal1 = calendar("cal1");
    cal1.hold_fetches(true);
    let prefs = Arc::new(Preferences::new_in_memory());
    let alarms = Arc::new(AlarmMonitor::new());

    let mut view = CalendarView::new(RecordingRenderer::new());
    view.set_display_calendar(cal1.clone());
    assert_eq!(cal1.observer_count(), 0);
    view.start(&Hosts::new().with_preferences(prefs.clone()).with_alarms(alarms.clone()));
    assert_eq!(cal1.observer_count(), 1);
    view.set_range(date(4), date(10));
    assert_eq!(view.pending_refreshes(), 1);

    view.stop();
    view.stop();
    assert!(view.is_started() == false);
    assert_eq!(cal1.observer_count(), 0);
    assert_eq!(view.pending_refreshes(), 0);

    // Nothing reaches a stopped view anymore
    cal1.add_item(Item::Event(event(&cal1, "Lunch", at(4, 12), 1)));
    alarms.fire(Item::Event(event(&cal1, "Alarm", at(4, 12), 1)));
    assert_eq!(view.process_pending_events(), 0);
    assert_eq!(view.state().rendered_count(), 0);
}

#[tokio::test]
async fn test_alarms_flash() {
    init_logger();

    let cal1 = calendar("cal1");
    let prefs: Arc<dyn PreferenceStore> = Arc::new(Preferences::new_in_memory());
    let alarms = Arc::new(AlarmMonitor::new());
    let mut view = CalendarView::new(RecordingRenderer::new());
    view.start(&Hosts::new().with_preferences(Arc::clone(&prefs)).with_alarms(alarms.clone()));

    let lunch = Item::Event(event(&cal1, "Lunch", at(4, 12), 1));
    alarms.fire(lunch.clone());
    view.process_pending_events();
    assert!(view.state().is_flashing(lunch.id()));
    assert!(view.renderer().flashing.contains(lunch.id()));

    alarms.remove_by_calendar(cal1.id());
    view.process_pending_events();
    assert!(view.state().is_flashing(lunch.id()) == false);
    assert!(view.renderer().flashing.is_empty());

    // Alarm indicators can be disabled
    prefs.set_bool(config::PREF_ALARMS_INDICATOR_SHOW, false);
    alarms.fire(lunch.clone());
    view.process_pending_events();
    assert!(view.state().is_flashing(lunch.id()) == false);
}

#[tokio::test]
async fn test_preferences_read_at_start_redraw_the_view() {
    init_logger();

    let cal1 = calendar("cal1");
    let lunch = event(&cal1, "Lunch", at(4, 12), 1);
    let taxes = Task::new("Taxes".to_string(), false, cal1.id()).with_due(at(5, 12));
    cal1.add_item(Item::Event(lunch.clone()));
    cal1.add_item(Item::Task(taxes.clone()));

    // The view is given a range before it is started
    let mut view = CalendarView::new(RecordingRenderer::new());
    view.set_display_calendar(cal1.clone());
    view.set_range(date(1), date(7));
    view.run_until_idle().await;
    assert_eq!(view.state().rendered_count(), 1);

    let prefs: Arc<dyn PreferenceStore> = Arc::new(Preferences::new_in_memory());
    prefs.set_bool(config::PREF_TASKS_IN_VIEW, true);
    view.start(&Hosts::new().with_preferences(Arc::clone(&prefs)));
    view.run_until_idle().await;
    assert!(view.state().filters().tasks_in_view);
    assert_eq!(view.state().rendered_occurrences_of(taxes.id()).len(), 1);
    assert_eq!(view.state().rendered_count(), 2);

    // Restarting with the same preferences does not redraw anything
    let relayouts = view.renderer().relayouts;
    view.start(&Hosts::new().with_preferences(Arc::clone(&prefs)));
    assert_eq!(view.pending_refreshes(), 0);
    assert_eq!(view.renderer().relayouts, relayouts);
}

#[tokio::test]
async fn test_panicking_calendar_does_not_block_the_view() {
    init_logger();

    let broken = Arc::new(PanickingCalendar{ id: "https://some.calend.ar/broken/".parse().unwrap() });
    let mut view = CalendarView::new(RecordingRenderer::new());
    view.start(&Hosts::new());
    view.set_display_calendar(broken);
    view.set_range(date(4), date(10));
    assert_eq!(view.pending_refreshes(), 1);

    view.run_until_idle().await;
    assert_eq!(view.pending_refreshes(), 0);
    assert_eq!(view.renderer().loaded, 0);
}
