//! Availability report port.
//!
//! An [`AvailabilityReportClient`] returns per-category seat counts for one
//! event. The remote side is untrusted: any of the three counts may be absent,
//! and the decode rule for that is explicit in [`CategoryReport::into_tally`].

use crate::availability::{CategoryTally, EventKey};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching an availability report.
///
/// None of these escape a refresh: the reducer records them as a
/// `Failed` status so the row can show the message inline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The reporting service could not be reached or returned a server error
    #[error("report service unavailable: {0}")]
    Unavailable(String),

    /// The reporting service does not know this event
    #[error("unknown event '{0}'")]
    UnknownEvent(EventKey),

    /// The response body could not be decoded
    #[error("malformed report: {0}")]
    Malformed(String),

    /// The call did not complete within the configured timeout
    #[error("report request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl ReportError {
    /// Whether retrying the same call could plausibly succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// One category as returned by the reporting service, before decoding.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryReport {
    /// Category label
    pub category: String,
    /// Seats sold, if reported
    #[serde(default)]
    pub booked: Option<u64>,
    /// Seats held, if reported
    #[serde(default)]
    pub held: Option<u64>,
    /// Total seats, if reported
    #[serde(default)]
    pub capacity: Option<u64>,
}

impl CategoryReport {
    /// Creates a report with all three counts present
    #[must_use]
    pub fn complete(category: impl Into<String>, booked: u64, held: u64, capacity: u64) -> Self {
        Self {
            category: category.into(),
            booked: Some(booked),
            held: Some(held),
            capacity: Some(capacity),
        }
    }

    /// Decodes into a tally. Absent counts are zero.
    #[must_use]
    pub fn into_tally(self) -> CategoryTally {
        CategoryTally {
            category: self.category,
            booked: self.booked.unwrap_or(0),
            held: self.held.unwrap_or(0),
            capacity: self.capacity.unwrap_or(0),
        }
    }
}

/// Decodes a whole report, keeping the order the service returned.
#[must_use]
pub fn decode_report(categories: Vec<CategoryReport>) -> Vec<CategoryTally> {
    categories.into_iter().map(CategoryReport::into_tally).collect()
}

/// Result type for report calls
pub type ReportResult = Result<Vec<CategoryReport>, ReportError>;

/// Trait for availability report clients.
///
/// # Dyn Compatibility
///
/// Uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn` so the
/// client can live in the reducer environment as `Arc<dyn AvailabilityReportClient>`
/// and be captured by effects.
pub trait AvailabilityReportClient: Send + Sync {
    /// Fetch the per-category report for one event.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] describing why the report could not be produced.
    fn fetch_report(
        &self,
        key: &EventKey,
    ) -> Pin<Box<dyn Future<Output = ReportResult> + Send + '_>>;
}
