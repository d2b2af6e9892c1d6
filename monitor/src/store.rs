//! The availability store.
//!
//! [`AvailabilityStore`] is a cloneable handle over the runtime [`Store`]
//! running the [`AvailabilityReducer`]. Each operation sends one action and,
//! where the caller needs the outcome, waits on the returned effect handle so
//! that every report result has been applied before it returns.
//!
//! # Example
//!
//! ```ignore
//! let store = AvailabilityStore::new(environment);
//! store.seed(vec![key("evt-1"), key("evt-2")]).await?;
//!
//! let status = store.refresh_one(key("evt-1")).await?;
//! println!("{status}"); // "A: 5/10 | B: 0/20"
//!
//! store.refresh_all().await?;
//! ```

use crate::error::MonitorError;
use crate::reducer::{AvailabilityEnvironment, AvailabilityReducer};
use crate::state::{AvailabilityAction, AvailabilityState};
use crate::view::DashboardRow;
use seatwatch_core::availability::{AvailabilityStatus, EventKey};
use seatwatch_core::catalog::{EventCatalog, EventRecord};
use seatwatch_runtime::{Store, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

type Runtime =
    Store<AvailabilityState, AvailabilityAction, AvailabilityEnvironment, AvailabilityReducer>;

/// Per-event availability with selective and bulk refresh.
#[derive(Clone)]
pub struct AvailabilityStore {
    runtime: Runtime,
    records: Arc<RwLock<Vec<EventRecord>>>,
}

impl AvailabilityStore {
    /// Creates an empty store
    #[must_use]
    pub fn new(environment: AvailabilityEnvironment) -> Self {
        Self {
            runtime: Store::new(
                AvailabilityState::new(),
                AvailabilityReducer::new(),
                environment,
            ),
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Resets the store to exactly `keys`, all not loaded.
    ///
    /// Keys from an earlier seed that are not in `keys` are dropped, and
    /// results of calls started before the seed are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn seed(&self, keys: impl IntoIterator<Item = EventKey>) -> Result<(), StoreError> {
        let keys = keys.into_iter().collect();
        self.runtime
            .send(AvailabilityAction::Seed { keys })
            .await?
            .wait()
            .await;
        Ok(())
    }

    /// Fetches the report for `key` and returns its new status.
    ///
    /// An untracked key is added first. A failed report call is recorded as
    /// [`AvailabilityStatus::Failed`] and returned, not raised.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn refresh_one(&self, key: EventKey) -> Result<AvailabilityStatus, StoreError> {
        self.runtime
            .send(AvailabilityAction::Refresh { key: key.clone() })
            .await?
            .wait()
            .await;
        Ok(self.status_of(&key).await)
    }

    /// Fetches the report for every tracked key.
    ///
    /// One failing key never stops the others. Entries can be read while the
    /// refresh is running and show whatever has been applied so far.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn refresh_all(&self) -> Result<(), StoreError> {
        self.runtime
            .send(AvailabilityAction::RefreshAll)
            .await?
            .wait()
            .await;
        Ok(())
    }

    /// Fetches the report for keys that are not loaded or older than `max_age`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn refresh_stale(&self, max_age: chrono::Duration) -> Result<(), StoreError> {
        self.runtime
            .send(AvailabilityAction::RefreshStale { max_age })
            .await?
            .wait()
            .await;
        Ok(())
    }

    /// Discards the results of every report call already started.
    ///
    /// Entries already updated keep their new status; the rest keep their
    /// previous one. Calls that are still running finish in the background.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn cancel_refresh(&self) -> Result<(), StoreError> {
        self.runtime.send(AvailabilityAction::CancelRefresh).await?;
        Ok(())
    }

    /// Current status of `key`. Untracked keys read as not loaded.
    pub async fn status_of(&self, key: &EventKey) -> AvailabilityStatus {
        self.runtime.state(|state| state.status_of(key)).await
    }

    /// Whether `key` is not loaded or was refreshed at least `max_age` ago
    pub async fn is_stale(&self, key: &EventKey, max_age: chrono::Duration) -> bool {
        let now = self.runtime.environment().clock.now();
        self.status_of(key).await.is_stale(now, max_age)
    }

    /// Copy of every tracked entry
    pub async fn snapshot(&self) -> BTreeMap<EventKey, AvailabilityStatus> {
        self.runtime.state(AvailabilityState::snapshot).await
    }

    /// Reads `catalog` and seeds the store with its keys.
    ///
    /// Records without a usable key are kept for [`rows`](Self::rows) but not
    /// tracked. Returns the records read.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Catalog`] if the catalog cannot be read, in which
    /// case nothing changes, or [`MonitorError::Store`] after shutdown.
    pub async fn reload(
        &self,
        catalog: &dyn EventCatalog,
    ) -> Result<Vec<EventRecord>, MonitorError> {
        let records = catalog.fetch().await.inspect_err(|e| {
            tracing::warn!(error = %e, "Catalog unavailable, keeping previous events");
        })?;

        let mut keys = Vec::with_capacity(records.len());
        for record in &records {
            match record.key() {
                Some(key) => keys.push(key),
                None => tracing::warn!(
                    product = %record.product_name,
                    show = %record.show_name,
                    "Skipping catalog record without an event key"
                ),
            }
        }

        // Rows and tracked keys must come from the same catalog read.
        let mut current = self.records.write().await;
        self.seed(keys).await?;
        current.clone_from(&records);
        drop(current);

        tracing::info!(records = records.len(), "Catalog loaded");
        Ok(records)
    }

    /// [`reload`](Self::reload) followed by [`refresh_all`](Self::refresh_all).
    ///
    /// # Errors
    ///
    /// Same as [`reload`](Self::reload).
    pub async fn reload_and_refresh(
        &self,
        catalog: &dyn EventCatalog,
    ) -> Result<Vec<EventRecord>, MonitorError> {
        let records = self.reload(catalog).await?;
        self.refresh_all().await?;
        Ok(records)
    }

    /// Dashboard rows for the last catalog read, in catalog order
    pub async fn rows(&self) -> Vec<DashboardRow> {
        let records = self.records.read().await;
        self.runtime
            .state(|state| {
                records
                    .iter()
                    .map(|record| {
                        let status = record.key().map(|key| state.status_of(&key));
                        DashboardRow::new(record, status.as_ref())
                    })
                    .collect()
            })
            .await
    }

    /// Stops accepting requests and waits up to `timeout` for running calls.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if calls are still running.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!(
            running = self.runtime.pending_effects(),
            "Shutting down availability store"
        );
        self.runtime.shutdown(timeout).await
    }
}
