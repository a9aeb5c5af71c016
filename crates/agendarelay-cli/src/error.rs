//! Application error types.

use std::path::PathBuf;

use agendarelay_adapters::{CalendarError, MessagingError, ServiceError};
use agendarelay_core::{ConfigError, TracingError};
use thiserror::Error;

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required setting was missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The calendar adapter failed.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// The messaging adapter failed.
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    /// The banner file could not be read.
    #[error("failed to read banner {}", path.display())]
    Banner {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Logging could not be initialized.
    #[error(transparent)]
    Tracing(#[from] TracingError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Config(e) => Self::Config(e),
            ServiceError::Calendar(e) => Self::Calendar(e),
            ServiceError::Messaging(e) => Self::Messaging(e),
        }
    }
}

impl AppError {
    /// Renders the error followed by its chain of causes.
    pub fn report(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_their_variant() {
        let err: AppError = ServiceError::Config(ConfigError::missing("CALENDAR_ID")).into();
        assert!(matches!(err, AppError::Config(_)));

        let err: AppError = ServiceError::Messaging(MessagingError::construction(
            "Failed to create Twilio client",
            "accountSid must start with AC",
        ))
        .into();
        assert!(matches!(err, AppError::Messaging(_)));
    }

    #[test]
    fn report_includes_cause_chain() {
        let err = AppError::from(CalendarError::construction(
            "Failed to create service account authentication",
            "InvalidKeyFormat",
        ));
        assert_eq!(
            err.report(),
            "CalendarError: Failed to create service account authentication: InvalidKeyFormat"
        );
    }

    #[test]
    fn banner_error_names_path() {
        let err = AppError::Banner {
            path: PathBuf::from("resources/ascii.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert_eq!(
            err.report(),
            "failed to read banner resources/ascii.txt: No such file or directory"
        );
    }
}
