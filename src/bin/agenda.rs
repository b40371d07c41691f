use std::path::Path;
use std::sync::Arc;

use chrono::{Datelike, Duration, TimeZone, Utc};

use calview::alarms::AlarmMonitor;
use calview::calendar::composite_calendar::CompositeCalendar;
use calview::calendar::memory_calendar::MemoryCalendar;
use calview::prefs::Preferences;
use calview::traits::{CalendarSource, PreferenceStore, ViewRenderer};
use calview::utils::print_view_state;
use calview::view::{CalendarView, Hosts};
use calview::{Event, Item, Occurrence, Recurrence, Task};

/// A renderer that only logs what happens
struct LogRenderer;

impl ViewRenderer for LogRenderer {
    fn item_added(&mut self, occurrence: &Occurrence) {
        log::debug!("+ {}", occurrence.key());
    }

    fn item_deleted(&mut self, occurrence: &Occurrence) {
        log::debug!("- {}", occurrence.key());
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let prefs = match std::env::args().nth(1) {
        None => Preferences::new_in_memory(),
        Some(path) => {
            let path = Path::new(&path);
            Preferences::from_file(path).unwrap_or_else(|err| {
                log::warn!("Invalid preferences file: {}", err);
                Preferences::new(path)
            })
        },
    };
    let prefs: Arc<dyn PreferenceStore> = Arc::new(prefs);
    prefs.set_bool(calview::config::PREF_TASKS_IN_VIEW, true);

    let mut view = CalendarView::new(LogRenderer);
    let today = view.state().today();
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let sunday = monday + Duration::days(6);
    let nine = Utc.from_utc_datetime(&monday.and_hms_opt(9, 0, 0).unwrap());

    let work = Arc::new(MemoryCalendar::new("Work".to_string(), "https://my.calend.ar/work/".parse().unwrap()));
    let home = Arc::new(MemoryCalendar::new("Home".to_string(), "https://my.calend.ar/home/".parse().unwrap()));
    work.add_item(Item::Event(
        Event::new("Stand-up".to_string(), nine, nine + Duration::minutes(15), work.id())
            .with_recurrence(Recurrence::new("FREQ=DAILY;BYDAY=MO,TU,WE,TH,FR"))
    ));
    work.add_item(Item::Task(Task::new("Expense report".to_string(), false, work.id()).with_due(nine + Duration::days(3))));
    home.add_item(Item::Event(Event::new("Hike".to_string(), nine + Duration::days(5), nine + Duration::days(5) + Duration::hours(6), home.id())));

    let composite = Arc::new(CompositeCalendar::new("All".to_string(), "https://my.calend.ar/".parse().unwrap()));
    composite.add_calendar(work.clone());
    composite.add_calendar(home.clone());

    let alarms = Arc::new(AlarmMonitor::new());
    view.start(&Hosts::new().with_preferences(Arc::clone(&prefs)).with_alarms(alarms.clone()));
    view.set_display_calendar(composite.clone());
    view.set_range(monday, sunday);
    view.run_until_idle().await;
    print_view_state(view.state());

    println!("\nToggling workdays only...\n");
    view.set_workdays_only(true);
    view.run_until_idle().await;
    print_view_state(view.state());

    view.stop();
}
