//! CLI, orchestration and startup banner
//!
//! This crate provides the `agendarelay` command-line interface: it lists the
//! upcoming events of one calendar, logs them, and optionally relays a digest
//! by SMS.

pub mod app;
pub mod banner;
pub mod cli;
pub mod error;

pub use app::{Settings, run};
pub use cli::Cli;
pub use error::{AppError, AppResult};
