//! # Seatwatch Monitor
//!
//! Live seat availability for upcoming events.
//!
//! Events come from an [`EventCatalog`](seatwatch_core::catalog::EventCatalog);
//! availability comes from a seating report service. The
//! [`AvailabilityStore`] keeps one status per event key and refreshes a single
//! event, every event, or only the stale ones on request.
//!
//! ## Architecture
//!
//! - [`state`]: `AvailabilityState` and the actions that change it
//! - [`reducer`]: the reducer, its environment and refresh scheduling
//! - [`store`]: the `AvailabilityStore` facade over the runtime store
//! - [`seatsio`]: HTTP report client
//! - [`catalog`]: JSON file catalog
//! - [`view`]: dashboard rows
//! - [`config`]: environment configuration
//! - [`watch`]: periodic stale refresh until shutdown

pub mod catalog;
pub mod config;
pub mod error;
pub mod reducer;
pub mod seatsio;
pub mod state;
pub mod store;
pub mod view;
pub mod watch;

pub use catalog::JsonFileCatalog;
pub use config::{Config, ConfigError};
pub use error::MonitorError;
pub use reducer::{AvailabilityEnvironment, AvailabilityReducer, RefreshConfig, RefreshMode};
pub use seatsio::SeatsioReportClient;
pub use state::{AvailabilityAction, AvailabilityState, RefreshTicket};
pub use store::AvailabilityStore;
pub use view::DashboardRow;
pub use watch::{shutdown_signal, watch};
