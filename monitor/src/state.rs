//! Availability state and actions.

use seatwatch_core::availability::{AvailabilityStatus, CategoryTally, EventKey};
use seatwatch_core::DateTime;
use seatwatch_core::Utc;
use std::collections::BTreeMap;

/// Availability for every seeded event.
///
/// `generation` changes on every seed and `epoch` on every cancel. Report
/// results carry both values from when their call started, so results that
/// arrive after a reseed or a cancel can be recognised and dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AvailabilityState {
    entries: BTreeMap<EventKey, AvailabilityStatus>,
    generation: u64,
    epoch: u64,
}

impl AvailabilityState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of `key`. Unknown keys read as not loaded.
    #[must_use]
    pub fn status_of(&self, key: &EventKey) -> AvailabilityStatus {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    /// Whether `key` is tracked
    #[must_use]
    pub fn contains(&self, key: &EventKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Tracked keys in identifier order
    pub fn keys(&self) -> impl Iterator<Item = &EventKey> {
        self.entries.keys()
    }

    /// Tracked entries in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&EventKey, &AvailabilityStatus)> {
        self.entries.iter()
    }

    /// Number of tracked events
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Seed counter
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel counter
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Keys that are not loaded or were refreshed at least `max_age` before `now`
    #[must_use]
    pub fn stale_keys(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> Vec<EventKey> {
        self.entries
            .iter()
            .filter(|(_, status)| status.is_stale(now, max_age))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Copy of every entry
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<EventKey, AvailabilityStatus> {
        self.entries.clone()
    }

    /// Replaces all entries with `NotLoaded` ones for `keys`.
    pub(crate) fn reseed(&mut self, keys: impl IntoIterator<Item = EventKey>) {
        self.entries = keys
            .into_iter()
            .map(|key| (key, AvailabilityStatus::NotLoaded))
            .collect();
        self.generation = self.generation.wrapping_add(1);
    }

    pub(crate) fn track(&mut self, key: EventKey) {
        self.entries.entry(key).or_default();
    }

    pub(crate) fn cancel(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Replaces the entry for `key` whole.
    pub(crate) fn record(&mut self, key: EventKey, status: AvailabilityStatus) {
        self.entries.insert(key, status);
    }
}

/// Where a report result came from.
///
/// Captured when the reducer starts a call and returned with the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTicket {
    /// Seed counter at the time the call started
    pub generation: u64,
    /// Cancel counter at the time the call started
    pub epoch: u64,
}

impl RefreshTicket {
    /// Ticket for a call started against `state`
    #[must_use]
    pub const fn issue(state: &AvailabilityState) -> Self {
        Self {
            generation: state.generation,
            epoch: state.epoch,
        }
    }

    /// Whether a result carrying this ticket may still be applied to `state`
    #[must_use]
    pub const fn is_current(&self, state: &AvailabilityState) -> bool {
        self.generation == state.generation && self.epoch == state.epoch
    }
}

/// Inputs to the availability reducer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AvailabilityAction {
    /// Reset the state to exactly these keys, all not loaded
    Seed {
        /// Keys to track
        keys: Vec<EventKey>,
    },
    /// Fetch the report for one key, tracking it first if needed
    Refresh {
        /// Key to refresh
        key: EventKey,
    },
    /// Fetch the report for every tracked key
    RefreshAll,
    /// Fetch the report for tracked keys that are not loaded or too old
    RefreshStale {
        /// Maximum age of a usable entry
        max_age: chrono::Duration,
    },
    /// Discard the results of every call already started
    CancelRefresh,
    /// A report call finished
    ReportReceived {
        /// Key the report is for
        key: EventKey,
        /// State counters when the call started
        ticket: RefreshTicket,
        /// Decoded categories or the error message
        outcome: Result<Vec<CategoryTally>, String>,
    },
}
