//! Calendar event values passed from the calendar adapter to the orchestrator.

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// A calendar event as returned by the calendar listing call.
///
/// The adapter passes these through untouched; only the fields the
/// notifier needs are modelled, everything else in the payload is ignored.
/// Start and end are optional so one incomplete event does not reject the
/// whole page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Provider-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event title. Calendars allow untitled events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
}

impl CalendarEvent {
    /// Creates a new event with the given summary and times.
    pub fn new(summary: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            id: None,
            summary: Some(summary.into()),
            start: Some(start),
            end: Some(end),
        }
    }

    /// Builder method to set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the summary, or `"(no title)"` for untitled events.
    pub fn title(&self) -> &str {
        self.summary.as_deref().unwrap_or("(no title)")
    }

    /// Returns the start rendered for display, or `"(no start time)"`.
    pub fn start_label(&self) -> String {
        self.start
            .as_ref()
            .map_or_else(|| "(no start time)".to_string(), ToString::to_string)
    }

    /// One log line for this event: `📅 <summary> - <start>`.
    pub fn log_line(&self) -> String {
        format!("📅 {} - {}", self.title(), self.start_label())
    }

    /// Compact line used when relaying events over SMS.
    pub fn digest_line(&self) -> String {
        format!("- {} ({})", self.title(), self.start_label())
    }
}

/// Builds an SMS body from a list of events.
pub fn digest(events: &[CalendarEvent], days_ahead: u32) -> String {
    if events.is_empty() {
        return format!("No events in the next {days_ahead} days");
    }

    let mut body = format!("{} events in the next {days_ahead} days:", events.len());
    for event in events {
        body.push('\n');
        body.push_str(&event.digest_line());
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn standup() -> CalendarEvent {
        CalendarEvent::new(
            "Standup",
            EventTime::from_utc(Utc.with_ymd_and_hms(2025, 2, 5, 9, 0, 0).unwrap()),
            EventTime::from_utc(Utc.with_ymd_and_hms(2025, 2, 5, 9, 15, 0).unwrap()),
        )
    }

    fn offsite() -> CalendarEvent {
        let day = NaiveDate::from_ymd_opt(2025, 2, 7).unwrap();
        CalendarEvent::new(
            "Offsite",
            EventTime::from_date(day),
            EventTime::from_date(day.succ_opt().unwrap()),
        )
    }

    #[test]
    fn deserializes_calendar_payload() {
        let json = r#"{
            "id": "evt-1",
            "status": "confirmed",
            "summary": "Planning",
            "start": {"dateTime": "2025-02-05T14:00:00Z"},
            "end": {"dateTime": "2025-02-05T15:00:00Z"}
        }"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id.as_deref(), Some("evt-1"));
        assert_eq!(event.title(), "Planning");
        assert!(!event.start.unwrap().is_all_day());
    }

    #[test]
    fn missing_times_are_tolerated() {
        let json = r#"[
            {"summary": "Planning", "start": {"dateTime": "2025-02-05T14:00:00Z"},
             "end": {"dateTime": "2025-02-05T15:00:00Z"}},
            {"summary": "no end", "start": {"dateTime": "2025-02-06T09:00:00Z"}},
            {"summary": "placeholder"}
        ]"#;
        let events: Vec<CalendarEvent> = serde_json::from_str(json).unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[1].end, None);
        assert_eq!(events[1].log_line(), "📅 no end - 2025-02-06T09:00:00+00:00");
        assert_eq!(events[2].log_line(), "📅 placeholder - (no start time)");
        assert_eq!(events[2].digest_line(), "- placeholder ((no start time))");
    }

    #[test]
    fn untitled_event() {
        let json = r#"{"start": {"date": "2025-02-05"}, "end": {"date": "2025-02-06"}}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.title(), "(no title)");
        assert_eq!(event.log_line(), "📅 (no title) - 2025-02-05");
    }

    #[test]
    fn log_line_prefers_datetime() {
        assert_eq!(standup().log_line(), "📅 Standup - 2025-02-05T09:00:00+00:00");
    }

    #[test]
    fn digest_body() {
        insta::assert_snapshot!(digest(&[standup(), offsite()], 7), @r"
        2 events in the next 7 days:
        - Standup (2025-02-05T09:00:00+00:00)
        - Offsite (2025-02-07)
        ");
    }

    #[test]
    fn digest_empty() {
        assert_eq!(digest(&[], 3), "No events in the next 3 days");
    }
}
