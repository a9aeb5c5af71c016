//! Event start/end values and the listing window.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Start or end of an event, in the calendar API's wire shape.
///
/// Timed events carry `{"dateTime": "...", "timeZone": "..."}`, all-day
/// events carry `{"date": "YYYY-MM-DD"}`.
///
/// Equality and ordering both compare the denoted instant, so the same
/// moment written with two offsets is equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    #[serde(rename_all = "camelCase")]
    DateTime {
        date_time: DateTime<FixedOffset>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_zone: Option<String>,
    },
    Date { date: NaiveDate },
}

impl EventTime {
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self::DateTime {
            date_time: instant.fixed_offset(),
            time_zone: None,
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date { date }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date { .. })
    }

    /// The instant this value denotes; an all-day date maps to its UTC midnight.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime { date_time, .. } => date_time.with_timezone(&Utc),
            Self::Date { date } => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

/// Renders the date-time as RFC 3339 with its original offset, or the bare
/// date for all-day values.
impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTime { date_time, .. } => f.write_str(&date_time.to_rfc3339()),
            Self::Date { date } => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl PartialEq for EventTime {
    fn eq(&self, other: &Self) -> bool {
        self.to_utc_datetime() == other.to_utc_datetime()
    }
}

impl Eq for EventTime {}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A window whose end does not fit in the supported date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a window of {days} days from {start} is out of range")]
pub struct WindowOutOfRange {
    pub start: DateTime<Utc>,
    pub days: u32,
}

/// Closed listing window `[start, end]` sent as `timeMin`/`timeMax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The window from `now` to `days` days later.
    pub fn days_ahead(now: DateTime<Utc>, days: u32) -> Result<Self, WindowOutOfRange> {
        now.checked_add_signed(Duration::days(i64::from(days)))
            .map(|end| Self { start: now, end })
            .ok_or(WindowOutOfRange { start: now, days })
    }

    /// The window from the current time to `days` days later.
    pub fn upcoming(days: u32) -> Result<Self, WindowOutOfRange> {
        Self::days_ahead(Utc::now(), days)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn parses_calendar_datetime_shape() {
        let json = r#"{"dateTime": "2025-02-05T10:30:00+01:00", "timeZone": "Europe/Paris"}"#;
        let start: EventTime = serde_json::from_str(json).unwrap();

        assert!(!start.is_all_day());
        assert_eq!(start.to_utc_datetime(), utc(2025, 2, 5, 9, 30));
        assert_eq!(start.to_string(), "2025-02-05T10:30:00+01:00");
    }

    #[test]
    fn parses_calendar_date_shape() {
        let et: EventTime = serde_json::from_str(r#"{"date": "2025-03-15"}"#).unwrap();

        assert!(et.is_all_day());
        assert_eq!(et.to_utc_datetime(), utc(2025, 3, 15, 0, 0));
        assert_eq!(et.to_string(), "2025-03-15");
    }

    #[test]
    fn datetime_wins_when_both_fields_present() {
        let json = r#"{"date": "2025-03-15", "dateTime": "2025-03-15T08:00:00Z"}"#;
        let et: EventTime = serde_json::from_str(json).unwrap();
        assert!(!et.is_all_day());
    }

    #[test]
    fn ordering_compares_all_day_at_midnight() {
        let morning = EventTime::from_utc(utc(2025, 2, 5, 10, 0));
        let all_day = EventTime::from_date(NaiveDate::from_ymd_opt(2025, 2, 5).unwrap());
        assert!(all_day < morning);
    }

    #[test]
    fn equality_follows_the_instant() {
        let paris: EventTime = serde_json::from_str(
            r#"{"dateTime": "2025-02-05T10:00:00+01:00", "timeZone": "Europe/Paris"}"#,
        )
        .unwrap();
        let utc_form = EventTime::from_utc(utc(2025, 2, 5, 9, 0));

        assert_eq!(paris.cmp(&utc_form), Ordering::Equal);
        assert_eq!(paris, utc_form);
        assert_ne!(paris, EventTime::from_utc(utc(2025, 2, 5, 10, 0)));
    }

    #[test]
    fn days_ahead_window() {
        let now = utc(2025, 2, 5, 10, 0);
        let window = TimeWindow::days_ahead(now, 7).unwrap();

        assert_eq!(window.start, now);
        assert_eq!(window.end, utc(2025, 2, 12, 10, 0));
        assert_eq!(window.duration(), Duration::days(7));
    }

    #[test]
    fn zero_days_is_an_instant() {
        let now = utc(2025, 2, 5, 10, 0);
        assert_eq!(TimeWindow::days_ahead(now, 0).unwrap().duration(), Duration::zero());
    }

    #[test]
    fn oversized_window_is_rejected() {
        let now = utc(2025, 2, 5, 10, 0);
        let err = TimeWindow::days_ahead(now, 100_000_000).unwrap_err();

        assert_eq!(err, WindowOutOfRange { start: now, days: 100_000_000 });
        assert!(TimeWindow::upcoming(u32::MAX).is_err());
    }
}
