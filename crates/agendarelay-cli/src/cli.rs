//! Command-line interface definition.

use std::path::PathBuf;

use agendarelay_core::{TracingConfig, TracingOutputFormat};
use clap::Parser;

/// agendarelay - Relay your upcoming calendar events to the log and by SMS
#[derive(Debug, Clone, Parser)]
#[command(name = "agendarelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Banner printed at startup
    #[arg(long, env = "BANNER_PATH", default_value = "resources/ascii.txt")]
    pub banner: PathBuf,

    /// Calendar to read (falls back to CALENDAR_ID)
    #[arg(long)]
    pub calendar_id: Option<String>,

    /// Number of days to look ahead (falls back to LOOKAHEAD_DAYS, then 7)
    #[arg(long)]
    pub days: Option<u32>,

    /// Send the digest by SMS to this number (falls back to SMS_TO)
    #[arg(long)]
    pub sms_to: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long, env = "AGENDARELAY_LOG_FORMAT")]
    pub log_format: Option<TracingOutputFormat>,
}

impl Cli {
    /// Returns the tracing configuration selected by the flags.
    pub fn tracing_config(&self) -> TracingConfig {
        let config = if self.debug {
            TracingConfig::verbose()
        } else {
            TracingConfig::default()
        };
        match self.log_format {
            Some(TracingOutputFormat::Json) if !self.debug => TracingConfig::structured(),
            Some(format) => config.with_format(format),
            None => config,
        }
    }
}
