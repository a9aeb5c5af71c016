//! Core types: events, time windows, configuration resolution, tracing setup

pub mod config;
pub mod event;
pub mod time;
pub mod tracing;

pub use config::{Config, ConfigError, ConfigSource, EnvConfig, MapConfig};
pub use event::{CalendarEvent, digest};
pub use time::{EventTime, TimeWindow, WindowOutOfRange};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
