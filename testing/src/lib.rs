//! # Seatwatch Testing
//!
//! Testing utilities and helpers for the Seatwatch monitor.
//!
//! This crate provides:
//! - Clocks with controllable time
//! - A scripted report client and in-memory catalogs
//! - The [`ReducerTest`] Given-When-Then harness
//!
//! ## Example
//!
//! ```ignore
//! use seatwatch_testing::{ScriptedReportClient, test_clock};
//!
//! #[tokio::test]
//! async fn refresh_records_report() {
//!     let client = ScriptedReportClient::new()
//!         .with_report("evt-1", vec![CategoryReport::complete("A", 3, 2, 10)]);
//!     let store = AvailabilityStore::new(environment(client));
//!
//!     let status = store.refresh_one(key("evt-1")).await?;
//!     assert_eq!(status.render(), "A: 5/10");
//! }
//! ```

use chrono::{DateTime, Utc};
use seatwatch_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits and collaborator ports
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use seatwatch_core::availability::EventKey;
    use seatwatch_core::catalog::{CatalogError, CatalogResult, EventCatalog, EventRecord};
    use seatwatch_core::report::{
        AvailabilityReportClient, CategoryReport, ReportError, ReportResult,
    };
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use seatwatch_testing::mocks::FixedClock;
    /// use seatwatch_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the environment.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move time forward
        ///
        /// # Panics
        ///
        /// Panics if the internal mutex is poisoned.
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable in tests
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap();
            *time += by;
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable in tests
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Parse an event key for tests
    ///
    /// # Panics
    ///
    /// Panics if `raw` is blank.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn key(raw: &str) -> EventKey {
        EventKey::parse(raw).expect("test event key must not be blank")
    }

    /// Report client answering from a script
    ///
    /// Unknown keys answer [`ReportError::UnknownEvent`]. Every call is
    /// counted, and the peak number of calls in flight at once is recorded.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedReportClient {
        responses: Arc<Mutex<HashMap<EventKey, ReportResult>>>,
        delays: Arc<Mutex<HashMap<EventKey, Duration>>>,
        failures_before_success: Arc<Mutex<HashMap<EventKey, usize>>>,
        calls: Arc<Mutex<Vec<EventKey>>>,
        in_flight: Arc<AtomicUsize>,
        peak_in_flight: Arc<AtomicUsize>,
    }

    impl ScriptedReportClient {
        /// Create an empty script
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer `raw` with the given categories
        #[must_use]
        pub fn with_report(self, raw: &str, categories: Vec<CategoryReport>) -> Self {
            self.set_report(raw, categories);
            self
        }

        /// Answer `raw` with an error
        #[must_use]
        pub fn with_error(self, raw: &str, error: ReportError) -> Self {
            self.set_response(raw, Err(error));
            self
        }

        /// Delay every answer for `raw`
        #[must_use]
        #[allow(clippy::unwrap_used)]
        pub fn with_delay(self, raw: &str, delay: Duration) -> Self {
            self.delays.lock().unwrap().insert(key(raw), delay);
            self
        }

        /// Fail the first `count` calls for `raw` with a transient error
        #[must_use]
        #[allow(clippy::unwrap_used)]
        pub fn with_transient_failures(self, raw: &str, count: usize) -> Self {
            self.failures_before_success
                .lock()
                .unwrap()
                .insert(key(raw), count);
            self
        }

        /// Replace the answer for `raw` (clones share the script)
        pub fn set_report(&self, raw: &str, categories: Vec<CategoryReport>) {
            self.set_response(raw, Ok(categories));
        }

        #[allow(clippy::unwrap_used)]
        fn set_response(&self, raw: &str, response: ReportResult) {
            self.responses.lock().unwrap().insert(key(raw), response);
        }

        /// Keys requested so far, in call order
        #[must_use]
        #[allow(clippy::unwrap_used)]
        pub fn calls(&self) -> Vec<EventKey> {
            self.calls.lock().unwrap().clone()
        }

        /// Number of calls made for `raw`
        #[must_use]
        pub fn calls_for(&self, raw: &str) -> usize {
            let wanted = key(raw);
            self.calls().iter().filter(|k| **k == wanted).count()
        }

        /// Highest number of calls that were running at the same time
        #[must_use]
        pub fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }

        #[allow(clippy::unwrap_used)]
        fn answer(&self, key: &EventKey) -> ReportResult {
            {
                let mut failures = self.failures_before_success.lock().unwrap();
                if let Some(remaining) = failures.get_mut(key) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(ReportError::Unavailable("scripted outage".to_string()));
                    }
                }
            }

            self.responses
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .unwrap_or_else(|| Err(ReportError::UnknownEvent(key.clone())))
        }
    }

    /// Decrements the in-flight gauge when a call ends, even if dropped early
    struct InFlight(Arc<AtomicUsize>);

    impl Drop for InFlight {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl AvailabilityReportClient for ScriptedReportClient {
        #[allow(clippy::unwrap_used)]
        fn fetch_report(
            &self,
            key: &EventKey,
        ) -> Pin<Box<dyn Future<Output = ReportResult> + Send + '_>> {
            let key = key.clone();
            Box::pin(async move {
                self.calls.lock().unwrap().push(key.clone());

                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
                let _in_flight = InFlight(Arc::clone(&self.in_flight));

                let delay = self.delays.lock().unwrap().get(&key).copied();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }

                self.answer(&key)
            })
        }
    }

    /// Catalog serving a fixed list of records
    #[derive(Debug, Clone, Default)]
    pub struct StaticCatalog {
        records: Arc<Mutex<Vec<EventRecord>>>,
        fetches: Arc<AtomicUsize>,
    }

    impl StaticCatalog {
        /// Create a catalog with the given records
        #[must_use]
        pub fn new(records: Vec<EventRecord>) -> Self {
            Self {
                records: Arc::new(Mutex::new(records)),
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Replace the records returned by the next fetch
        #[allow(clippy::unwrap_used)]
        pub fn replace(&self, records: Vec<EventRecord>) {
            *self.records.lock().unwrap() = records;
        }

        /// Number of fetches served
        #[must_use]
        pub fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl EventCatalog for StaticCatalog {
        #[allow(clippy::unwrap_used)]
        fn fetch(&self) -> Pin<Box<dyn Future<Output = CatalogResult> + Send + '_>> {
            Box::pin(async move {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                Ok(self.records.lock().unwrap().clone())
            })
        }
    }

    /// Catalog whose source is always down
    #[derive(Debug, Clone)]
    pub struct UnavailableCatalog {
        reason: String,
    }

    impl UnavailableCatalog {
        /// Create a failing catalog with the given reason
        #[must_use]
        pub fn new(reason: impl Into<String>) -> Self {
            Self {
                reason: reason.into(),
            }
        }
    }

    impl EventCatalog for UnavailableCatalog {
        fn fetch(&self) -> Pin<Box<dyn Future<Output = CatalogResult> + Send + '_>> {
            let reason = self.reason.clone();
            Box::pin(async move { Err(CatalogError::SourceUnavailable(reason)) })
        }
    }
}

// Re-export commonly used items
pub use mocks::{
    FixedClock, ManualClock, ScriptedReportClient, StaticCatalog, UnavailableCatalog, key,
    test_clock, test_epoch,
};
