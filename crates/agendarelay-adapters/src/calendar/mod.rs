//! Calendar adapter.
//!
//! [`CalendarService`] wraps a [`CalendarApi`] client (in production a
//! [`GoogleCalendarClient`] authenticated as a service account) and offers
//! the listing operations the notifier needs on top of
//! [`use_client`](crate::adapter::Adapter::use_client).
//!
//! Two provider flavors register it under the [`Calendar`] key:
//!
//! - [`layer`] builds the client from explicit [`ServiceAccountCredentials`]
//! - [`from_env`] resolves those credentials from configuration first

mod auth;
mod client;

use agendarelay_core::{CalendarEvent, Config, TimeWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

pub use auth::{
    AccessToken, CALENDAR_READONLY_SCOPE, GOOGLE_TOKEN_URI, ServiceAccountAuth,
    ServiceAccountCredentials,
};
pub use client::{GoogleApiError, GoogleCalendarClient};

use crate::adapter::{Adapter, AdapterKind, Call, ClientHandle};
use crate::error::{AdapterError, Origin, ServiceError};
use crate::registry::{Provide, ServiceKey};

/// Tag and registry key of the calendar adapter.
#[derive(Debug, Clone, Copy)]
pub struct Calendar;

impl AdapterKind for Calendar {
    const TAG: &'static str = "Calendar";
    type Client = dyn CalendarApi;
}

impl ServiceKey for Calendar {
    const NAME: &'static str = "Calendar";
    type Service = CalendarService;
}

/// The calendar adapter.
pub type CalendarService = Adapter<Calendar>;

/// Failure raised by the calendar adapter.
pub type CalendarError = AdapterError<Calendar>;

/// Sort order accepted by the events listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderBy {
    StartTime,
    Updated,
}

impl OrderBy {
    fn as_str(&self) -> &'static str {
        match self {
            Self::StartTime => "startTime",
            Self::Updated => "updated",
        }
    }
}

/// Parameters of one `events.list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsListParams {
    pub calendar_id: String,
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    pub single_events: Option<bool>,
    pub order_by: Option<OrderBy>,
}

impl EventsListParams {
    /// Query string pairs for the request.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(t) = self.time_min {
            query.push(("timeMin", t.to_rfc3339()));
        }
        if let Some(t) = self.time_max {
            query.push(("timeMax", t.to_rfc3339()));
        }
        if let Some(single) = self.single_events {
            query.push(("singleEvents", single.to_string()));
        }
        if let Some(order) = self.order_by {
            query.push(("orderBy", order.as_str().to_string()));
        }
        query
    }
}

/// One page of the `events.list` response.
///
/// `items` is optional on the wire; callers decide what an absent list means.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<CalendarEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Calendar operations the adapter relies on.
pub trait CalendarApi: ClientHandle {
    /// Lists events of one calendar.
    fn list_events(&self, params: EventsListParams) -> Call<'_, EventList>;
}

/// Request of [`CalendarService::list_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEventsOptions {
    pub calendar_id: String,
    pub window: TimeWindow,
}

impl ListEventsOptions {
    /// Creates options for `calendar_id` over `window`.
    pub fn new(calendar_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            window,
        }
    }
}

impl Adapter<Calendar> {
    /// Wraps any calendar client.
    pub fn from_client(client: impl CalendarApi + 'static) -> Self {
        let client: Box<dyn CalendarApi> = Box::new(client);
        Self::new(client)
    }

    /// Lists single event instances in the window, ordered by start time.
    ///
    /// A response without an `items` field yields an empty list.
    #[instrument(name = "list_events", skip_all, fields(calendar_id = %options.calendar_id))]
    pub async fn list_events(
        &self,
        options: ListEventsOptions,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let params = EventsListParams {
            calendar_id: options.calendar_id,
            time_min: Some(options.window.start),
            time_max: Some(options.window.end),
            single_events: Some(true),
            order_by: Some(OrderBy::StartTime),
        };

        let response = self
            .use_client(|client| client.list_events(params))
            .await
            .map_err(|e| e.with_message("Failed to list calendar events"))?;

        let events = response.items.unwrap_or_default();
        debug!(count = events.len(), "events listed");
        Ok(events)
    }

    /// Lists events from now until `days_ahead` days later.
    pub async fn upcoming_events(
        &self,
        calendar_id: &str,
        days_ahead: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.upcoming_events_from(Utc::now(), calendar_id, days_ahead)
            .await
    }

    /// Lists events from `now` until `days_ahead` days later.
    ///
    /// A window past the supported date range fails before the client is
    /// called.
    #[instrument(name = "upcoming_events", skip(self, now))]
    pub async fn upcoming_events_from(
        &self,
        now: DateTime<Utc>,
        calendar_id: &str,
        days_ahead: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let window = TimeWindow::days_ahead(now, days_ahead).map_err(|e| {
            CalendarError::new(Origin::Synchronous)
                .with_message("Failed to list calendar events")
                .with_cause(Box::new(e))
        })?;
        let events = self
            .list_events(ListEventsOptions::new(calendar_id, window))
            .await?;

        info!(
            count = events.len(),
            days_ahead,
            "Found {} events in the next {} days",
            events.len(),
            days_ahead
        );
        Ok(events)
    }
}

/// Builds the production client for `credentials`.
///
/// A key that does not parse fails here, tagged as a calendar error.
pub fn connect(credentials: &ServiceAccountCredentials) -> Result<CalendarService, CalendarError> {
    let auth = ServiceAccountAuth::new(credentials, &[CALENDAR_READONLY_SCOPE]).map_err(|e| {
        CalendarError::construction("Failed to create service account authentication", e)
    })?;
    let client = GoogleCalendarClient::with_service_account(auth)
        .map_err(|e| CalendarError::construction("Failed to create calendar client", e))?;
    Ok(CalendarService::from_client(client))
}

/// Provider from explicit service-account credentials.
pub fn layer(credentials: ServiceAccountCredentials) -> Provide<Calendar> {
    Provide::new("service_account", move |_| Ok(connect(&credentials)?))
}

/// Provider wrapping an already constructed client.
pub fn layer_with_client(client: impl CalendarApi + 'static) -> Provide<Calendar> {
    Provide::value(CalendarService::from_client(client))
}

/// Provider resolving credentials from configuration, then building the
/// production client.
pub fn from_env() -> Provide<Calendar> {
    from_env_with(|credentials| connect(&credentials))
}

/// Provider resolving credentials from configuration and handing them to
/// `factory`.
///
/// `factory` is only invoked once every required value has been resolved.
pub fn from_env_with<F>(factory: F) -> Provide<Calendar>
where
    F: FnOnce(ServiceAccountCredentials) -> Result<CalendarService, CalendarError>
        + Send
        + 'static,
{
    Provide::new("environment", move |source| {
        let credentials = ServiceAccountCredentials::from_config(&Config::new(source))?;
        factory(credentials).map_err(ServiceError::from)
    })
}
