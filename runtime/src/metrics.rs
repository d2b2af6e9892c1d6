//! Prometheus metrics for the monitor.
//!
//! Metric names used across the workspace:
//! - `store.*`: action processing and effect execution in the [`Store`](crate::Store)
//! - `retry.*`: retry attempts for remote calls
//! - `availability.*`: report outcomes recorded by the availability reducer
//!
//! # Example
//!
//! ```rust,no_run
//! use seatwatch_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    started: bool,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, started: false }
    }

    /// Register metric descriptions, install the exporter and start listening.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        builder
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        register_metrics();
        self.started = true;
        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        Ok(())
    }

    /// Whether the exporter has been installed
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Address the exporter listens on
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store
    describe_counter!("store.commands.total", "Actions sent to the store");
    describe_counter!("store.effects.executed", "Effects executed, by type");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer per action"
    );

    // Retry
    describe_counter!("retry.attempt", "Retries scheduled after a transient failure");
    describe_counter!("retry.success", "Operations that succeeded after at least one retry");
    describe_counter!("retry.exhausted", "Operations that failed after all retries");

    // Availability
    describe_counter!(
        "availability.refresh.completed",
        "Report results applied to the store, by outcome"
    );
    describe_counter!(
        "availability.refresh.discarded",
        "Report results dropped because the store was reseeded or the refresh cancelled"
    );
    describe_histogram!(
        "availability.report.duration_seconds",
        "Time taken by one report call including retries"
    );
}
