//! Seat availability dashboard.
//!
//! Reads the event catalog, fetches availability for every event and prints
//! one row per event. With `WATCH_INTERVAL_SECS` set it keeps running and
//! refreshes stale entries on that interval until Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! SEATSIO_SECRET_KEY=... CATALOG_PATH=events.json cargo run --bin seatwatch
//! ```

use seatwatch_core::environment::SystemClock;
use seatwatch_monitor::{
    AvailabilityEnvironment, AvailabilityStore, Config, DashboardRow, JsonFileCatalog,
    SeatsioReportClient, shutdown_signal, watch,
};
use seatwatch_runtime::metrics::MetricsServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatwatch_monitor=info,seatwatch_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        catalog = %config.catalog_path.display(),
        base_url = %config.seatsio.base_url,
        mode = ?config.refresh.mode,
        "Configuration loaded"
    );

    if let Some(port) = config.metrics_port {
        let mut metrics = MetricsServer::new(SocketAddr::from(([0, 0, 0, 0], port)));
        metrics.start()?;
    }

    let client = SeatsioReportClient::new(config.seatsio.secret_key.clone())
        .with_base_url(config.seatsio.base_url.clone());
    let environment = AvailabilityEnvironment::new(
        Arc::new(client),
        Arc::new(SystemClock),
        config.refresh.clone(),
    );
    let store = AvailabilityStore::new(environment);
    let catalog = JsonFileCatalog::new(&config.catalog_path);

    store.reload_and_refresh(&catalog).await?;
    print_rows(&store.rows().await);

    if let Some(interval) = config.watch_interval {
        info!(interval_secs = interval.as_secs(), "Watching for stale availability");

        watch(
            &store,
            interval,
            config.stale_after,
            shutdown_signal(),
            |rows| print_rows(&rows),
        )
        .await?;
    }

    if let Err(e) = store.shutdown(SHUTDOWN_TIMEOUT).await {
        warn!(error = %e, "Shutdown did not complete cleanly");
    }

    Ok(())
}

fn print_rows(rows: &[DashboardRow]) {
    println!(
        "{:<24} {:<20} {:<16} Live availability",
        "Product", "Show", "Date"
    );
    for row in rows {
        println!("{row}");
    }
}
