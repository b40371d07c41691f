//! Half-open date ranges used to query calendars

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// The `[start, end)` interval: `start` is included, `end` is not
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Returns `None` if `end` is before `start`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if end < start {
            return None;
        }
        Some(Self { start, end })
    }

    /// The range a view displaying days `first..=last` must query, or `None` if its end cannot be represented.
    ///
    /// The end of a view is date-only, so the query ends at midnight one day past `last`.
    /// This captures all-day items that sit on the last visible day.
    pub fn from_days(first: NaiveDate, last: NaiveDate) -> Option<Self> {
        let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?);
        let end = Utc.from_utc_datetime(&last.and_hms_opt(0, 0, 0)?).checked_add_signed(Duration::days(1))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> { self.start }
    pub fn end(&self) -> DateTime<Utc> { self.end }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the `[start, end)` span of an item overlaps this range.
    ///
    /// A span where `start == end` is a single point in time, and intersects when that point is in the range.
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start >= self.end {
            return false;
        }
        if start == end {
            return start >= self.start;
        }
        end > self.start
    }

    /// Whether the given instant is within the range
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
