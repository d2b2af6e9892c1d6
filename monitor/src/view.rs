//! Dashboard row model.

use seatwatch_core::availability::AvailabilityStatus;
use seatwatch_core::catalog::EventRecord;
use serde::Serialize;
use std::fmt;

/// Availability text for catalog records that carry no usable key
pub const MISSING_KEY_TEXT: &str = "N/A";

/// One line of the dashboard: a catalog record and its availability text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardRow {
    /// Event key, or `None` if the record had no usable key
    pub event_key: Option<String>,
    /// Product name
    pub product_name: String,
    /// Show name
    pub show_name: String,
    /// Start time as `%Y-%m-%d %H:%M`
    pub starts_at: String,
    /// Rendered availability
    pub availability: String,
}

impl DashboardRow {
    /// Builds a row from a record and its status, if it has one
    #[must_use]
    pub fn new(record: &EventRecord, status: Option<&AvailabilityStatus>) -> Self {
        let key = record.key();
        let availability = match (&key, status) {
            (Some(_), Some(status)) => status.render(),
            (Some(_), None) => AvailabilityStatus::NotLoaded.render(),
            (None, _) => MISSING_KEY_TEXT.to_string(),
        };

        Self {
            event_key: key.map(String::from),
            product_name: record.product_name.clone(),
            show_name: record.show_name.clone(),
            starts_at: record.starts_at_display(),
            availability,
        }
    }
}

impl fmt::Display for DashboardRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<24} {:<20} {:<16} {}",
            self.product_name, self.show_name, self.starts_at, self.availability
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatwatch_core::availability::CategoryTally;
    use seatwatch_core::{DateTime, Utc};

    fn starts_at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_767_286_800, 0).unwrap_or_default()
    }

    #[test]
    fn test_row_renders_loaded_status() {
        let record = EventRecord::new("evt-1", "Museum", "Morning", starts_at());
        let status = AvailabilityStatus::Loaded {
            summary: vec![CategoryTally::new("A", 3, 2, 10)],
            refreshed_at: starts_at(),
        };

        let row = DashboardRow::new(&record, Some(&status));

        assert_eq!(row.event_key.as_deref(), Some("evt-1"));
        assert_eq!(row.starts_at, "2026-01-01 17:00");
        assert_eq!(row.availability, "A: 5/10");
    }

    #[test]
    fn test_row_without_key_reads_missing() {
        let mut record = EventRecord::new("  ", "Museum", "Morning", starts_at());
        let row = DashboardRow::new(&record, None);
        assert_eq!(row.availability, MISSING_KEY_TEXT);
        assert_eq!(row.event_key, None);

        record.event_key = None;
        assert_eq!(DashboardRow::new(&record, None).availability, MISSING_KEY_TEXT);
    }

    #[test]
    fn test_row_with_untracked_key_is_pending() {
        let record = EventRecord::new("evt-1", "Museum", "Morning", starts_at());
        assert_eq!(DashboardRow::new(&record, None).availability, "Pending");
    }
}
