//! Client adapters and the scoped service registry.
//!
//! This crate wraps third-party clients behind a uniform, failure-normalizing
//! surface:
//!
//! - [`Adapter`] - Owns one client; [`Adapter::use_client`] turns synchronous
//!   and asynchronous client failures into the adapter's tagged error
//! - [`AdapterError`] - Failure tagged with the adapter it came from
//! - [`Layers`] / [`ServiceScope`] - All-or-nothing acquisition of adapters,
//!   released when the scope ends
//! - [`calendar`] - Google Calendar (service-account auth)
//! - [`messaging`] - Twilio SMS
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐
//! │ Google Calendar  │    │   Twilio REST    │
//! └────────┬─────────┘    └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//! ┌──────────────────┐    ┌──────────────────┐
//! │  CalendarService │    │ MessagingService │
//! └────────┬─────────┘    └────────┬─────────┘
//!          │     Provide<K>        │
//!          └──────────┬────────────┘
//!                     ▼ Layers::build()
//!              ┌──────────────┐
//!              │ ServiceScope │
//!              └──────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use agendarelay_adapters::{Calendar, Layers, calendar};
//! use agendarelay_core::EnvConfig;
//!
//! let scope = Layers::new().provide(calendar::from_env()).build(&EnvConfig)?;
//! let events = scope.get::<Calendar>().upcoming_events("primary", 7).await?;
//! ```

pub mod adapter;
pub mod calendar;
pub mod error;
pub mod messaging;
pub mod registry;

#[cfg(test)]
mod test_support;

// Re-export main types at crate root
pub use adapter::{Adapter, AdapterKind, BoxFuture, Call, ClientHandle};
pub use calendar::{Calendar, CalendarApi, CalendarError, CalendarService};
pub use error::{AdapterError, Cause, Origin, ServiceError};
pub use messaging::{Messaging, MessagingApi, MessagingError, MessagingService};
pub use registry::{Layers, Provide, Scoped, ServiceKey, ServiceRegistry, ServiceScope};
