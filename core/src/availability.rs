//! Availability domain types.
//!
//! An [`AvailabilityStatus`] is what the monitor knows about one event: nothing
//! yet, a per-category tally from the last successful report, or the error the
//! last report call produced. Rendering follows the dashboard convention of
//! `"{category}: {booked+held}/{capacity}"` joined with `" | "`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text shown for an event whose availability has not been loaded yet
pub const PENDING_TEXT: &str = "Pending";

/// Text shown for a loaded report that carried no categories
pub const EMPTY_REPORT_TEXT: &str = "No categories";

/// Separator between rendered categories
pub const CATEGORY_SEPARATOR: &str = " | ";

/// Opaque identifier correlating a catalog record with a seating report.
///
/// Never blank, and kept exactly as given, surrounding whitespace included.
/// Use [`EventKey::parse`] for untrusted input.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventKey(String);

impl EventKey {
    /// Parses an identifier, returning `None` for empty or blank input
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EventKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "event key cannot be blank".to_string())
    }
}

impl From<EventKey> for String {
    fn from(key: EventKey) -> Self {
        key.0
    }
}

/// Seat counts for one category of one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    /// Category label (e.g., "Adult", "VIP")
    pub category: String,
    /// Seats sold
    pub booked: u64,
    /// Seats temporarily reserved
    pub held: u64,
    /// Total seats
    pub capacity: u64,
}

impl CategoryTally {
    /// Creates a new tally
    #[must_use]
    pub fn new(category: impl Into<String>, booked: u64, held: u64, capacity: u64) -> Self {
        Self {
            category: category.into(),
            booked,
            held,
            capacity,
        }
    }

    /// Seats no longer available to buy (booked + held)
    #[must_use]
    pub const fn occupied(&self) -> u64 {
        self.booked.saturating_add(self.held)
    }
}

impl fmt::Display for CategoryTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}/{}", self.category, self.occupied(), self.capacity)
    }
}

/// What is currently known about one event's availability.
///
/// Transitions: `NotLoaded → {Loaded, Failed}`, `{Loaded, Failed} → {Loaded, Failed}`.
/// Only a reseed moves an entry back to `NotLoaded`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AvailabilityStatus {
    /// No report call has completed for this event since it was seeded
    #[default]
    NotLoaded,
    /// The last report call succeeded
    Loaded {
        /// Per-category counts in the order the report returned them
        summary: Vec<CategoryTally>,
        /// When the report was applied
        refreshed_at: DateTime<Utc>,
    },
    /// The last report call failed
    Failed {
        /// Human-readable error text
        message: String,
        /// When the failure was recorded
        refreshed_at: DateTime<Utc>,
    },
}

impl AvailabilityStatus {
    /// True if no report has been applied yet
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::NotLoaded)
    }

    /// True if the last report call succeeded
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    /// True if the last report call failed
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// When this entry was last refreshed, if ever
    #[must_use]
    pub const fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::NotLoaded => None,
            Self::Loaded { refreshed_at, .. } | Self::Failed { refreshed_at, .. } => {
                Some(*refreshed_at)
            },
        }
    }

    /// Whether the entry needs a refresh at `now` given a maximum age.
    ///
    /// Entries that were never loaded are always stale.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        self.refreshed_at()
            .is_none_or(|refreshed_at| now.signed_duration_since(refreshed_at) >= max_age)
    }

    /// Renders the status for display
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoaded => f.write_str(PENDING_TEXT),
            Self::Loaded { summary, .. } if summary.is_empty() => f.write_str(EMPTY_REPORT_TEXT),
            Self::Loaded { summary, .. } => {
                for (idx, tally) in summary.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(CATEGORY_SEPARATOR)?;
                    }
                    write!(f, "{tally}")?;
                }
                Ok(())
            },
            Self::Failed { message, .. } => write!(f, "Error: {message}"),
        }
    }
}
