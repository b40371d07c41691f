//! Projection of items onto a date range
//!
//! This is pure date geometry: visibility filters (hidden tasks, hidden completed tasks...) are up to the callers.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rrule::{RRuleSet, Tz};

use crate::item::Item;
use crate::occurrence::Occurrence;
use crate::range::DateRange;

/// Returns the occurrences of `item` that intersect `range`.
///
/// * a non-recurring item yields at most one occurrence, the item itself
/// * a recurring item yields one occurrence per instance that intersects `range`, each with its own recurrence ID
/// * dateless tasks never yield anything
pub fn expand(item: &Item, range: &DateRange) -> impl Iterator<Item = Occurrence> {
    let parent = Arc::new(item.clone());

    let starts: Vec<Option<DateTime<Utc>>> = if item.is_recurring() {
        instance_starts(item, range).into_iter().map(Some).collect()
    } else {
        match item.span() {
            Some((start, end)) if range.intersects(start, end) => vec![None],
            _ => Vec::new(),
        }
    };

    starts.into_iter().map(move |start| match start {
        None => Occurrence::single(Arc::clone(&parent)),
        Some(start) => Occurrence::instance(Arc::clone(&parent), start),
    })
}

/// Start times of the instances of a recurring item that intersect `range`
fn instance_starts(item: &Item, range: &DateRange) -> Vec<DateTime<Utc>> {
    let (anchor, anchor_end) = match item.span() {
        Some(span) => span,
        None => return Vec::new(),
    };
    let recurrence = match item.recurrence() {
        Some(r) => r,
        None => return Vec::new(),
    };
    let duration = anchor_end - anchor;

    let mut text = format!("DTSTART:{}\nRRULE:{}", ical_utc(&anchor), recurrence.rule());
    for exception in recurrence.exceptions() {
        text.push_str(&format!("\nEXDATE:{}", ical_utc(exception)));
    }

    let rrule_set: RRuleSet = match text.parse() {
        Ok(set) => set,
        Err(err) => {
            log::debug!("Ignoring item {} with an invalid recurrence rule: {}", item.id(), err);
            return Vec::new();
        }
    };

    // Instances that started before the range may still overlap it.
    // Bounds are widened on purpose, the exact half-open test is done below
    let after = (range.start() - duration - Duration::seconds(1)).with_timezone(&Tz::UTC);
    let before = (range.end() + Duration::seconds(1)).with_timezone(&Tz::UTC);
    let result = rrule_set.after(after).before(before).all(u16::MAX);
    if result.limited {
        log::debug!("Expansion of item {} over {} has been truncated to {} instances", item.id(), range, result.dates.len());
    }

    result.dates
        .into_iter()
        .map(|date| date.with_timezone(&Utc))
        .filter(|start| range.intersects(*start, *start + duration))
        .collect()
}

fn ical_utc(date: &DateTime<Utc>) -> String {
    date.format("%Y%m%dT%H%M%SZ").to_string()
}
