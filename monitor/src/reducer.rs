//! Availability reducer and its environment.
//!
//! The reducer owns every state transition. Report calls are returned as
//! [`Effect::Future`] values; their results come back as
//! [`AvailabilityAction::ReportReceived`] and are applied one entry at a time.

use crate::state::{AvailabilityAction, AvailabilityState, RefreshTicket};
use seatwatch_core::availability::{AvailabilityStatus, EventKey};
use seatwatch_core::environment::Clock;
use seatwatch_core::report::{AvailabilityReportClient, ReportError, decode_report};
use seatwatch_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use seatwatch_runtime::retry::{RetryPolicy, retry_with_predicate};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Default per-call timeout for report requests
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a bulk refresh schedules its report calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshMode {
    /// One call at a time, in identifier order
    #[default]
    Sequential,
    /// All calls started together, at most `max_concurrent` in flight
    Parallel {
        /// Concurrency limit
        max_concurrent: usize,
    },
}

impl RefreshMode {
    /// Number of report calls allowed in flight at once
    #[must_use]
    pub fn permits(self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Parallel { max_concurrent } => max_concurrent.max(1),
        }
    }
}

/// Scheduling, timeout and retry settings for report calls.
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshConfig {
    /// Bulk refresh scheduling
    pub mode: RefreshMode,
    /// Upper bound for a single report call
    pub timeout: Duration,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            mode: RefreshMode::default(),
            timeout: DEFAULT_REPORT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Dependencies of the availability reducer.
///
/// Every report call, whichever action started it, takes a permit from the
/// same limiter, so [`RefreshMode::Sequential`] means one call at a time for
/// the whole store.
#[derive(Clone)]
pub struct AvailabilityEnvironment {
    /// Report client
    pub client: Arc<dyn AvailabilityReportClient>,
    /// Clock used for refresh timestamps and staleness
    pub clock: Arc<dyn Clock>,
    /// Call settings
    pub refresh: RefreshConfig,
    limiter: Arc<Semaphore>,
}

impl AvailabilityEnvironment {
    /// Creates an environment
    #[must_use]
    pub fn new(
        client: Arc<dyn AvailabilityReportClient>,
        clock: Arc<dyn Clock>,
        refresh: RefreshConfig,
    ) -> Self {
        let limiter = Arc::new(Semaphore::new(refresh.mode.permits()));
        Self {
            client,
            clock,
            refresh,
            limiter,
        }
    }

    /// Report call permits currently free
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Describes one report call for `key`.
    fn fetch(&self, key: EventKey, ticket: RefreshTicket) -> Effect<AvailabilityAction> {
        let client = Arc::clone(&self.client);
        let limiter = Arc::clone(&self.limiter);
        let timeout = self.refresh.timeout;
        let retry = self.refresh.retry.clone();

        Effect::Future(Box::pin(async move {
            // A closed semaphore only happens on teardown; run the call anyway.
            let _permit = limiter.acquire_owned().await.ok();

            let started = Instant::now();
            let result = retry_with_predicate(
                &retry,
                || {
                    let client = Arc::clone(&client);
                    let key = key.clone();
                    async move {
                        match tokio::time::timeout(timeout, client.fetch_report(&key)).await {
                            Ok(result) => result,
                            Err(_) => Err(ReportError::Timeout(timeout)),
                        }
                    }
                },
                ReportError::is_transient,
            )
            .await;
            metrics::histogram!("availability.report.duration_seconds")
                .record(started.elapsed().as_secs_f64());

            Some(AvailabilityAction::ReportReceived {
                key,
                ticket,
                outcome: result.map(decode_report).map_err(|e| e.to_string()),
            })
        }))
    }

    /// Describes report calls for `keys`, scheduled per the refresh mode.
    fn fetch_many(
        &self,
        keys: Vec<EventKey>,
        ticket: RefreshTicket,
    ) -> Effect<AvailabilityAction> {
        if keys.is_empty() {
            return Effect::None;
        }

        let effects = keys
            .into_iter()
            .map(|key| self.fetch(key, ticket))
            .collect();

        match self.refresh.mode {
            RefreshMode::Sequential => Effect::chain(effects),
            RefreshMode::Parallel { .. } => Effect::merge(effects),
        }
    }
}

/// Availability reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailabilityReducer;

impl AvailabilityReducer {
    /// Creates a new reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for AvailabilityReducer {
    type State = AvailabilityState;
    type Action = AvailabilityAction;
    type Environment = AvailabilityEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AvailabilityAction::Seed { keys } => {
                state.reseed(keys);
                tracing::debug!(
                    events = state.len(),
                    generation = state.generation(),
                    "Seeded availability"
                );
                smallvec![Effect::None]
            },

            AvailabilityAction::Refresh { key } => {
                state.track(key.clone());
                let ticket = RefreshTicket::issue(state);
                tracing::debug!(event_key = %key, "Refreshing availability");
                smallvec![env.fetch(key, ticket)]
            },

            AvailabilityAction::RefreshAll => {
                let keys: Vec<EventKey> = state.keys().cloned().collect();
                tracing::debug!(events = keys.len(), mode = ?env.refresh.mode, "Refreshing all");
                smallvec![env.fetch_many(keys, RefreshTicket::issue(state))]
            },

            AvailabilityAction::RefreshStale { max_age } => {
                let keys = state.stale_keys(env.clock.now(), max_age);
                tracing::debug!(
                    stale = keys.len(),
                    tracked = state.len(),
                    "Refreshing stale entries"
                );
                smallvec![env.fetch_many(keys, RefreshTicket::issue(state))]
            },

            AvailabilityAction::CancelRefresh => {
                state.cancel();
                tracing::debug!(epoch = state.epoch(), "Cancelled in-flight refreshes");
                smallvec![Effect::None]
            },

            AvailabilityAction::ReportReceived {
                key,
                ticket,
                outcome,
            } => {
                if !ticket.is_current(state) || !state.contains(&key) {
                    metrics::counter!("availability.refresh.discarded").increment(1);
                    tracing::debug!(event_key = %key, "Discarding report from an earlier refresh");
                    return smallvec![Effect::None];
                }

                let refreshed_at = env.clock.now();
                let status = match outcome {
                    Ok(summary) => {
                        metrics::counter!("availability.refresh.completed", "outcome" => "loaded")
                            .increment(1);
                        AvailabilityStatus::Loaded {
                            summary,
                            refreshed_at,
                        }
                    },
                    Err(message) => {
                        metrics::counter!("availability.refresh.completed", "outcome" => "failed")
                            .increment(1);
                        tracing::warn!(event_key = %key, error = %message, "Report call failed");
                        AvailabilityStatus::Failed {
                            message,
                            refreshed_at,
                        }
                    },
                };

                state.record(key, status);
                smallvec![Effect::None]
            },
        }
    }
}
