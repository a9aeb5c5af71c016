//! Google Calendar API client.
//!
//! This module provides a low-level HTTP client for the Google Calendar API
//! v3. It authenticates either with a service account (exchanging a signed
//! assertion for an access token, cached until it expires) or with a fixed
//! bearer token.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::auth::{AccessToken, ServiceAccountAuth, TokenResponse};
use super::{CalendarApi, EventList, EventsListParams};
use crate::adapter::{Call, ClientHandle};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures reported by [`GoogleCalendarClient`].
#[derive(Debug, Error)]
pub enum GoogleApiError {
    /// A required request parameter was empty.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// The request URL could not be built.
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Builder(#[source] reqwest::Error),

    /// Transport-level failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The assertion could not be signed.
    #[error("failed to sign service account assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The token endpoint refused the assertion.
    #[error("token exchange failed ({status}): {body}")]
    TokenExchange {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The API answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

enum Credentials {
    ServiceAccount {
        auth: ServiceAccountAuth,
        cached: Mutex<Option<AccessToken>>,
    },
    Static(String),
}

/// Google Calendar API client.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    api_base: Url,
    credentials: Credentials,
}

impl GoogleCalendarClient {
    /// Creates a client authenticating as a service account.
    pub fn with_service_account(auth: ServiceAccountAuth) -> Result<Self, GoogleApiError> {
        Self::build(Credentials::ServiceAccount {
            auth,
            cached: Mutex::new(None),
        })
    }

    /// Creates a client sending a fixed bearer token.
    pub fn with_access_token(token: impl Into<String>) -> Result<Self, GoogleApiError> {
        Self::build(Credentials::Static(token.into()))
    }

    fn build(credentials: Credentials) -> Result<Self, GoogleApiError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("agendarelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GoogleApiError::Builder)?;

        Ok(Self {
            http,
            api_base: Url::parse(CALENDAR_API_BASE)?,
            credentials,
        })
    }

    /// Points the client at a different API root.
    pub fn with_api_base(mut self, base: &str) -> Result<Self, GoogleApiError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        self.api_base = base;
        Ok(self)
    }

    /// Returns a valid access token, fetching a new one if needed.
    async fn access_token(&self) -> Result<String, GoogleApiError> {
        let (auth, cached) = match &self.credentials {
            Credentials::Static(token) => return Ok(token.clone()),
            Credentials::ServiceAccount { auth, cached } => (auth, cached),
        };

        let now = Utc::now();
        let current = cached.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(token) = current.filter(|t| !t.is_expired(now)) {
            return Ok(token.token);
        }

        debug!(token_uri = auth.token_uri(), "requesting service account token");
        let assertion = auth.assertion(now)?;
        let response = self
            .http
            .post(auth.token_uri())
            .form(&ServiceAccountAuth::grant_form(&assertion))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleApiError::TokenExchange { status, body });
        }

        let token = response.json::<TokenResponse>().await?.into_token(now);
        let value = token.token.clone();
        *cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(value)
    }

    fn events_url(&self, calendar_id: &str) -> Result<Url, GoogleApiError> {
        if calendar_id.is_empty() {
            return Err(GoogleApiError::MissingParameter("calendarId"));
        }
        let path = format!("calendars/{}/events", urlencoding::encode(calendar_id));
        Ok(self.api_base.join(&path)?)
    }

    async fn fetch_events(
        &self,
        url: Url,
        params: EventsListParams,
    ) -> Result<EventList, GoogleApiError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&params.query())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleApiError::Status { status, body });
        }

        let list = response.json::<EventList>().await?;
        debug!(
            calendar_id = %params.calendar_id,
            items = list.items.as_ref().map(Vec::len),
            "events page received"
        );
        Ok(list)
    }
}

impl ClientHandle for GoogleCalendarClient {
    fn close(&self) {
        if let Credentials::ServiceAccount { cached, .. } = &self.credentials {
            cached.lock().unwrap_or_else(PoisonError::into_inner).take();
        }
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn list_events(&self, params: EventsListParams) -> Call<'_, EventList> {
        // Parameter validation fails on the spot; only the HTTP work is deferred.
        match self.events_url(&params.calendar_id) {
            Ok(url) => Call::pending(self.fetch_events(url, params)),
            Err(err) => Call::fail(err),
        }
    }
}

impl std::fmt::Debug for GoogleCalendarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match &self.credentials {
            Credentials::ServiceAccount { .. } => "service_account",
            Credentials::Static(_) => "static_token",
        };
        f.debug_struct("GoogleCalendarClient")
            .field("api_base", &self.api_base.as_str())
            .field("auth", &auth)
            .finish_non_exhaustive()
    }
}
