//! Twilio REST client.
//!
//! Only the Messages resource is implemented. Requests authenticate with
//! HTTP basic auth (account SID and auth token) and send form-encoded
//! bodies, as the Twilio API expects.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::{CreateMessageParams, MessageInstance, MessagingApi};
use crate::adapter::{Call, ClientHandle};

/// Base URL for the Twilio REST API.
const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01/";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures reported by [`TwilioClient`].
#[derive(Debug, Error)]
pub enum TwilioApiError {
    /// The account SID is not an `AC...` identifier.
    #[error("accountSid must start with AC")]
    InvalidAccountSid,

    /// No auth token was supplied.
    #[error("username is required")]
    MissingAuthToken,

    /// A required request parameter was empty.
    #[error("Required parameter \"params['{0}']\" missing.")]
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

    /// The API rejected the request.
    #[error("Twilio error {code} ({status}): {message}")]
    Rest {
        status: u16,
        code: u32,
        message: String,
    },
}

/// Error body returned by the Twilio API.
#[derive(Debug, Deserialize)]
struct RestException {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: String,
}

/// Twilio REST client.
pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    api_base: Url,
}

impl TwilioClient {
    /// Creates a client for the given account.
    ///
    /// # Errors
    ///
    /// Fails if the SID does not start with `AC` or the token is empty.
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, TwilioApiError> {
        let account_sid = account_sid.into();
        let auth_token = auth_token.into();

        if !account_sid.starts_with("AC") {
            return Err(TwilioApiError::InvalidAccountSid);
        }
        if auth_token.is_empty() {
            return Err(TwilioApiError::MissingAuthToken);
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("agendarelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TwilioApiError::Builder)?;

        Ok(Self {
            http,
            account_sid,
            auth_token,
            api_base: Url::parse(TWILIO_API_BASE)?,
        })
    }

    /// Points the client at a different API root.
    pub fn with_api_base(mut self, base: &str) -> Result<Self, TwilioApiError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        self.api_base = base;
        Ok(self)
    }

    /// Returns the account SID.
    pub fn account_sid(&self) -> &str {
        &self.account_sid
    }

    fn messages_url(&self) -> Result<Url, TwilioApiError> {
        Ok(self
            .api_base
            .join(&format!(
                "Accounts/{}/Messages.json",
                urlencoding::encode(&self.account_sid)
            ))?)
    }

    async fn post_message(
        &self,
        url: Url,
        params: CreateMessageParams,
    ) -> Result<MessageInstance, TwilioApiError> {
        let form = [
            ("To", params.to.as_str()),
            ("From", params.from.as_str()),
            ("Body", params.body.as_str()),
        ];
        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let exception = serde_json::from_str::<RestException>(&body).unwrap_or(RestException {
                code: 0,
                message: body,
            });
            return Err(TwilioApiError::Rest {
                status: status.as_u16(),
                code: exception.code,
                message: exception.message,
            });
        }

        let message = response.json::<MessageInstance>().await?;
        debug!(sid = %message.sid, status = ?message.status, "message accepted");
        Ok(message)
    }
}

impl ClientHandle for TwilioClient {}

impl MessagingApi for TwilioClient {
    fn create_message(&self, params: CreateMessageParams) -> Call<'_, MessageInstance> {
        // Missing parameters are rejected before any request is made.
        if params.to.is_empty() {
            return Call::fail(TwilioApiError::MissingParameter("to"));
        }
        if params.from.is_empty() {
            return Call::fail(TwilioApiError::MissingParameter("from"));
        }
        match self.messages_url() {
            Ok(url) => Call::pending(self.post_message(url, params)),
            Err(err) => Call::fail(err),
        }
    }
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("account_sid", &self.account_sid)
            .field("api_base", &self.api_base.as_str())
            .finish_non_exhaustive()
    }
}
