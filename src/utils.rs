//! Some utility functions

use chrono::{DateTime, Utc};

use crate::item::Item;
use crate::occurrence::Occurrence;
use crate::state::ViewState;

/// A debug utility that pretty-prints what a view displays, day by day
pub fn print_view_state(state: &ViewState) {
    let (first, last) = match state.visible_range() {
        None => {
            println!("(no range)");
            return;
        },
        Some(range) => range,
    };
    println!("VIEW {} - {} ({} occurrences, filters {:?})", first, last, state.rendered_count(), state.toggle_status());

    let mut occurrences: Vec<&Occurrence> = state.rendered().collect();
    occurrences.sort_by_key(|occ| occ.start());
    for day in state.visible_days() {
        println!("  {}{}", day, if state.is_day_off(day) { " (off)" } else { "" });
        for occ in occurrences.iter().filter(|occ| occ.start().map(|start| start.date_naive()) == Some(day)) {
            print_occurrence(occ);
        }
    }
}

pub fn print_occurrence(occurrence: &Occurrence) {
    let flag = match occurrence.item() {
        Item::Task(task) => if task.completed() { "✓" } else { " " },
        Item::Event(_) => "·",
    };
    let recurring = if occurrence.recurrence_id().is_some() { "↻" } else { " " };
    println!("    {}{} {}\t{}\t{}", flag, recurring, format_time(occurrence.start()), occurrence.item().name(), occurrence.id());
}

fn format_time(date: Option<DateTime<Utc>>) -> String {
    match date {
        None => "--:--".to_string(),
        Some(date) => date.format("%H:%M").to_string(),
    }
}
