//! Messaging adapter.
//!
//! [`MessagingService`] wraps a [`MessagingApi`] client (in production a
//! [`TwilioClient`]) and sends SMS through
//! [`use_client`](crate::adapter::Adapter::use_client).

mod client;

use std::fmt;

use agendarelay_core::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub use client::{TwilioApiError, TwilioClient};

use crate::adapter::{Adapter, AdapterKind, Call, ClientHandle};
use crate::error::{AdapterError, ServiceError};
use crate::registry::{Provide, ServiceKey};

/// Tag and registry key of the messaging adapter.
#[derive(Debug, Clone, Copy)]
pub struct Messaging;

impl AdapterKind for Messaging {
    const TAG: &'static str = "Messaging";
    type Client = dyn MessagingApi;
}

impl ServiceKey for Messaging {
    const NAME: &'static str = "Messaging";
    type Service = MessagingService;
}

/// The messaging adapter.
pub type MessagingService = Adapter<Messaging>;

/// Failure raised by the messaging adapter.
pub type MessagingError = AdapterError<Messaging>;

/// Parameters of one `messages.create` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMessageParams {
    pub from: String,
    pub to: String,
    pub body: String,
}

impl CreateMessageParams {
    pub fn new(from: impl Into<String>, to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            body: body.into(),
        }
    }
}

/// A created message, as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInstance {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Messaging operations the adapter relies on.
pub trait MessagingApi: ClientHandle {
    /// Creates (sends) one message.
    fn create_message(&self, params: CreateMessageParams) -> Call<'_, MessageInstance>;
}

/// Account credentials for the messaging provider.
#[derive(Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
}

impl TwilioCredentials {
    /// Environment variable holding the account SID.
    pub const ACCOUNT_SID_VAR: &'static str = "TWILIO_ACCOUNT_SID";
    /// Environment variable holding the auth token.
    pub const AUTH_TOKEN_VAR: &'static str = "TWILIO_AUTH_TOKEN";
    /// Environment variable holding the sender number.
    pub const PHONE_NUMBER_VAR: &'static str = "TWILIO_PHONE_NUMBER";

    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Resolves both values from configuration.
    pub fn from_config(config: &Config<'_>) -> Result<Self, ConfigError> {
        let account_sid = config.string(Self::ACCOUNT_SID_VAR)?;
        let auth_token = config.string(Self::AUTH_TOKEN_VAR)?;
        Ok(Self::new(account_sid, auth_token))
    }
}

impl fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// Resolves the sender number from configuration.
pub fn sender_from_config(config: &Config<'_>) -> Result<String, ConfigError> {
    config.string(TwilioCredentials::PHONE_NUMBER_VAR)
}

impl Adapter<Messaging> {
    /// Wraps any messaging client.
    pub fn from_client(client: impl MessagingApi + 'static) -> Self {
        let client: Box<dyn MessagingApi> = Box::new(client);
        Self::new(client)
    }

    /// Sends one SMS from `from` to `to`.
    #[instrument(name = "send_sms", skip(self, body), fields(len = body.len()))]
    pub async fn send_sms(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<MessageInstance, MessagingError> {
        let params = CreateMessageParams::new(from, to, body);
        let message = self
            .use_client(|client| client.create_message(params))
            .await?;

        info!(sid = %message.sid, "SMS sent to {}", to);
        Ok(message)
    }
}

/// Builds the production client for `credentials`.
pub fn connect(credentials: &TwilioCredentials) -> Result<MessagingService, MessagingError> {
    let client = TwilioClient::new(&credentials.account_sid, &credentials.auth_token)
        .map_err(|e| MessagingError::construction("Failed to create Twilio client", e))?;
    Ok(MessagingService::from_client(client))
}

/// Provider from explicit credentials.
pub fn layer(credentials: TwilioCredentials) -> Provide<Messaging> {
    Provide::new("account_credentials", move |_| Ok(connect(&credentials)?))
}

/// Provider wrapping an already constructed client.
pub fn layer_with_client(client: impl MessagingApi + 'static) -> Provide<Messaging> {
    Provide::value(MessagingService::from_client(client))
}

/// Provider resolving credentials from configuration, then building the
/// production client.
pub fn from_env() -> Provide<Messaging> {
    from_env_with(|credentials| connect(&credentials))
}

/// Provider resolving credentials from configuration and handing them to
/// `factory`.
pub fn from_env_with<F>(factory: F) -> Provide<Messaging>
where
    F: FnOnce(TwilioCredentials) -> Result<MessagingService, MessagingError> + Send + 'static,
{
    Provide::new("environment", move |source| {
        let credentials = TwilioCredentials::from_config(&Config::new(source))?;
        factory(credentials).map_err(ServiceError::from)
    })
}
