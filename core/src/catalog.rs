//! Event catalog port.
//!
//! The catalog is whatever lists upcoming events: a warehouse query, a
//! spreadsheet, a file. The monitor only needs the records and their keys.

use crate::availability::EventKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Display format for event start times
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Errors that can occur while fetching the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog source could not be read. Prior state must be kept.
    #[error("catalog source unavailable: {0}")]
    SourceUnavailable(String),
}

/// One upcoming event as listed by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Raw identifier; may be missing or blank in the source
    #[serde(default)]
    pub event_key: Option<String>,
    /// Product the show belongs to
    pub product_name: String,
    /// Show (slot category) name
    pub show_name: String,
    /// Show start time
    pub starts_at: DateTime<Utc>,
}

impl EventRecord {
    /// Creates a record with a key
    #[must_use]
    pub fn new(
        event_key: impl Into<String>,
        product_name: impl Into<String>,
        show_name: impl Into<String>,
        starts_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_key: Some(event_key.into()),
            product_name: product_name.into(),
            show_name: show_name.into(),
            starts_at,
        }
    }

    /// The usable identifier, or `None` if missing or blank
    #[must_use]
    pub fn key(&self) -> Option<EventKey> {
        self.event_key.as_deref().and_then(EventKey::parse)
    }

    /// Start time formatted for display
    #[must_use]
    pub fn starts_at_display(&self) -> String {
        self.starts_at.format(START_TIME_FORMAT).to_string()
    }
}

/// Result type for catalog fetches
pub type CatalogResult = Result<Vec<EventRecord>, CatalogError>;

/// Trait for event catalog sources.
///
/// Dyn compatible for the same reason as the report client.
pub trait EventCatalog: Send + Sync {
    /// Fetch all records.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::SourceUnavailable`] if the source cannot be read.
    fn fetch(&self) -> Pin<Box<dyn Future<Output = CatalogResult> + Send + '_>>;
}
