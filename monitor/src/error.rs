//! Errors surfaced by the availability store facade.

use seatwatch_core::catalog::CatalogError;
use seatwatch_runtime::StoreError;
use thiserror::Error;

/// Errors from [`AvailabilityStore`](crate::AvailabilityStore) operations.
///
/// Report failures never appear here; they are recorded as entry status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// The catalog could not be read; the store was left unchanged
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The store runtime rejected the request
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}
