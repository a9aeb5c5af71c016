//! Error types for adapter operations.
//!
//! Every failure leaving an [`Adapter`](crate::adapter::Adapter) is an
//! [`AdapterError`] tagged with the adapter it came from. The tag is a type
//! parameter, so a calendar failure and a messaging failure are distinct
//! types ([`CalendarError`](crate::calendar::CalendarError) and
//! [`MessagingError`](crate::messaging::MessagingError)) even though they
//! share one implementation.

use std::fmt;
use std::marker::PhantomData;

use agendarelay_core::ConfigError;
use thiserror::Error;

use crate::adapter::AdapterKind;
use crate::calendar::CalendarError;
use crate::messaging::MessagingError;

/// The underlying failure reported by a wrapped client.
///
/// Adapters never inspect it; it is carried as-is for callers that want to
/// downcast.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where inside the adapter a failure was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The client call failed before producing a pending result.
    Synchronous,
    /// The client call produced a pending result that later failed.
    Asynchronous,
    /// The client could not be built from the supplied credentials.
    Construction,
}

impl Origin {
    /// Returns a short name for this origin.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synchronous => "synchronous",
            Self::Asynchronous => "asynchronous",
            Self::Construction => "construction",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure raised by the adapter tagged `K`.
pub struct AdapterError<K> {
    origin: Origin,
    message: Option<String>,
    cause: Option<Cause>,
    kind: PhantomData<fn() -> K>,
}

impl<K: AdapterKind> AdapterError<K> {
    /// Creates an error with the given origin and no message or cause.
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            message: None,
            cause: None,
            kind: PhantomData,
        }
    }

    /// A client call that failed synchronously inside `use`.
    pub fn synchronous(cause: Cause) -> Self {
        Self::new(Origin::Synchronous)
            .with_message(format!("Synchronous error in `{}.use`", K::TAG))
            .with_cause(cause)
    }

    /// A pending client result that failed inside `use`.
    pub fn asynchronous(cause: Cause) -> Self {
        Self::new(Origin::Asynchronous)
            .with_message(format!("Asynchronous error in `{}.use`", K::TAG))
            .with_cause(cause)
    }

    /// A client that could not be constructed.
    pub fn construction<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: Into<Cause>,
    {
        Self::new(Origin::Construction)
            .with_message(message)
            .with_cause(cause.into())
    }

    /// Replaces the message, keeping origin and cause.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the cause.
    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Returns the tag of the adapter that raised this error.
    pub fn tag(&self) -> &'static str {
        K::TAG
    }

    /// Returns where the failure was captured.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Returns the message, if set.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the underlying cause, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Returns the cause downcast to `E`, if it is one.
    pub fn cause_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.cause.as_deref().and_then(|c| c.downcast_ref::<E>())
    }
}

impl<K: AdapterKind> fmt::Debug for AdapterError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(&format!("{}Error", K::TAG))
            .field("origin", &self.origin)
            .field("message", &self.message)
            .field("cause", &self.cause)
            .finish()
    }
}

impl<K: AdapterKind> fmt::Display for AdapterError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Error", K::TAG)?;
        match (&self.message, &self.cause) {
            (Some(message), _) => write!(f, ": {}", message),
            (None, Some(cause)) => write!(f, ": {}", cause),
            (None, None) => write!(f, " ({})", self.origin),
        }
    }
}

impl<K: AdapterKind> std::error::Error for AdapterError<K> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// A failure while acquiring services into a scope.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required setting was missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The calendar adapter could not be built.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// The messaging adapter could not be built.
    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::calendar::Calendar;
    use crate::messaging::Messaging;

    #[derive(Debug, PartialEq, Error)]
    #[error("boom {0}")]
    struct Boom(u8);

    #[test]
    fn synchronous_message_names_adapter() {
        let err = CalendarError::synchronous(Box::new(Boom(1)));
        assert_eq!(err.origin(), Origin::Synchronous);
        assert_eq!(err.message(), Some("Synchronous error in `Calendar.use`"));
        assert_eq!(err.to_string(), "CalendarError: Synchronous error in `Calendar.use`");
        assert_eq!(err.cause_as::<Boom>(), Some(&Boom(1)));
    }

    #[test]
    fn asynchronous_message_names_adapter() {
        let err = MessagingError::asynchronous(Box::new(Boom(2)));
        assert_eq!(err.origin(), Origin::Asynchronous);
        assert_eq!(err.tag(), "Messaging");
        assert_eq!(err.message(), Some("Asynchronous error in `Messaging.use`"));
    }

    #[test]
    fn with_message_keeps_origin_and_cause() {
        let err = CalendarError::asynchronous(Box::new(Boom(3)))
            .with_message("Failed to list calendar events");
        assert_eq!(err.origin(), Origin::Asynchronous);
        assert_eq!(err.message(), Some("Failed to list calendar events"));
        assert_eq!(err.cause_as::<Boom>(), Some(&Boom(3)));
    }

    #[test]
    fn source_exposes_cause() {
        let err = AdapterError::<Messaging>::construction("bad sid", "accountSid must start with AC");
        assert_eq!(err.origin(), Origin::Construction);
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("accountSid must start with AC".to_string())
        );
    }

    #[test]
    fn display_without_message_falls_back() {
        let bare = AdapterError::<Calendar>::new(Origin::Synchronous);
        assert_eq!(bare.to_string(), "CalendarError (synchronous)");

        let caused = AdapterError::<Calendar>::new(Origin::Asynchronous).with_cause("timed out".into());
        assert_eq!(caused.to_string(), "CalendarError: timed out");
    }

    #[test]
    fn service_error_is_transparent() {
        let err: ServiceError = ConfigError::missing("CALENDAR_ID").into();
        assert_eq!(err.to_string(), "missing configuration value: CALENDAR_ID");
    }
}
