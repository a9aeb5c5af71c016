//! One notifier run: banner, settings, services, then the relay itself.

use agendarelay_adapters::{Calendar, Layers, Messaging, ServiceRegistry, calendar, messaging};
use agendarelay_core::{CalendarEvent, Config, ConfigError, ConfigSource, TimeWindow, digest};
use tracing::{debug, info, instrument};

use crate::banner;
use crate::cli::Cli;
use crate::error::AppResult;

/// Environment variable naming the calendar to read.
pub const CALENDAR_ID_VAR: &str = "CALENDAR_ID";
/// Environment variable holding the window length in days.
pub const LOOKAHEAD_DAYS_VAR: &str = "LOOKAHEAD_DAYS";
/// Environment variable holding the SMS recipient.
pub const SMS_TO_VAR: &str = "SMS_TO";

/// Window length used when neither the flag nor the environment sets one.
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 7;

/// Where the digest goes when SMS relaying is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsTarget {
    pub from: String,
    pub to: String,
}

/// Settings of one run, flags taking precedence over configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub calendar_id: String,
    pub days_ahead: u32,
    pub sms: Option<SmsTarget>,
}

impl Settings {
    /// Resolves the settings from `cli`, falling back to `source`.
    pub fn resolve(cli: &Cli, source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let config = Config::new(source);

        let calendar_id = match &cli.calendar_id {
            Some(id) => id.clone(),
            None => config.string(CALENDAR_ID_VAR)?,
        };
        let days_ahead = match cli.days {
            Some(days) => days,
            None => config.integer_or(LOOKAHEAD_DAYS_VAR, DEFAULT_LOOKAHEAD_DAYS)?,
        };
        TimeWindow::upcoming(days_ahead)
            .map_err(|e| ConfigError::invalid(LOOKAHEAD_DAYS_VAR, e.to_string()))?;
        let sms = match cli.sms_to.clone().or_else(|| config.optional_string(SMS_TO_VAR)) {
            Some(to) => Some(SmsTarget {
                from: messaging::sender_from_config(&config)?,
                to,
            }),
            None => None,
        };

        Ok(Self {
            calendar_id,
            days_ahead,
            sms,
        })
    }
}

/// Providers for a production run. Messaging is only acquired when an SMS
/// will be sent.
pub fn production_layers(settings: &Settings) -> Layers {
    let layers = Layers::new().provide(calendar::from_env());
    if settings.sms.is_some() {
        layers.provide(messaging::from_env())
    } else {
        layers
    }
}

/// Runs the notifier against the production services.
pub async fn run(cli: &Cli, source: &dyn ConfigSource) -> AppResult<Vec<CalendarEvent>> {
    run_with(cli, source, production_layers).await
}

/// Runs the notifier with the providers returned by `layers`.
///
/// The services are released before this returns, whether or not the run
/// succeeded.
pub async fn run_with<F>(
    cli: &Cli,
    source: &dyn ConfigSource,
    layers: F,
) -> AppResult<Vec<CalendarEvent>>
where
    F: FnOnce(&Settings) -> Layers,
{
    let banner = banner::read(&cli.banner).await?;
    info!("{}", banner);

    let settings = Settings::resolve(cli, source)?;
    debug!(?settings, "settings resolved");

    let scope = layers(&settings).build(source)?;
    let events = notify(&scope, &settings).await?;
    scope.close();
    Ok(events)
}

/// Lists upcoming events, logs them and relays the digest if enabled.
///
/// Nothing is logged per event and no SMS is sent if the listing fails.
#[instrument(name = "notify", skip_all, fields(calendar_id = %settings.calendar_id))]
pub async fn notify(
    registry: &ServiceRegistry,
    settings: &Settings,
) -> AppResult<Vec<CalendarEvent>> {
    info!("Fetching events from calendar {}", settings.calendar_id);

    let calendar = registry.get::<Calendar>();
    let events = calendar
        .upcoming_events(&settings.calendar_id, settings.days_ahead)
        .await?;

    info!(count = events.len(), "Found {} upcoming events", events.len());
    for event in &events {
        info!("{}", event.log_line());
    }

    if let Some(sms) = &settings.sms {
        let messaging = registry.get::<Messaging>();
        let body = digest(&events, settings.days_ahead);
        messaging.send_sms(&sms.from, &sms.to, &body).await?;
    }

    Ok(events)
}
