//! Integration tests for the availability store running on the runtime store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use seatwatch_core::availability::{AvailabilityStatus, CategoryTally, PENDING_TEXT};
use seatwatch_core::catalog::EventRecord;
use seatwatch_core::report::{CategoryReport, ReportError};
use seatwatch_monitor::{
    AvailabilityEnvironment, AvailabilityStore, MonitorError, RefreshConfig, RefreshMode, watch,
};
use seatwatch_runtime::StoreError;
use seatwatch_runtime::retry::RetryPolicy;
use seatwatch_testing::{
    ManualClock, ScriptedReportClient, StaticCatalog, UnavailableCatalog, key, test_clock,
    test_epoch,
};
use std::sync::Arc;
use std::time::Duration;

fn refresh_config(mode: RefreshMode) -> RefreshConfig {
    RefreshConfig {
        mode,
        timeout: Duration::from_secs(2),
        retry: RetryPolicy::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(5))
            .build(),
    }
}

fn store_with(client: &ScriptedReportClient, refresh: RefreshConfig) -> AvailabilityStore {
    AvailabilityStore::new(AvailabilityEnvironment::new(
        Arc::new(client.clone()),
        Arc::new(test_clock()),
        refresh,
    ))
}

fn sequential_store(client: &ScriptedReportClient) -> AvailabilityStore {
    store_with(client, refresh_config(RefreshMode::Sequential))
}

fn record(raw_key: Option<&str>, show: &str) -> EventRecord {
    EventRecord {
        event_key: raw_key.map(str::to_string),
        product_name: "City Museum".to_string(),
        show_name: show.to_string(),
        starts_at: test_epoch() + chrono::Duration::hours(10),
    }
}

#[tokio::test]
async fn test_seeded_keys_are_not_loaded() {
    let store = sequential_store(&ScriptedReportClient::new());

    store.seed(vec![key("a"), key("b")]).await.unwrap();

    assert_eq!(store.status_of(&key("a")).await, AvailabilityStatus::NotLoaded);
    assert_eq!(store.status_of(&key("b")).await, AvailabilityStatus::NotLoaded);
    assert_eq!(store.status_of(&key("other")).await.render(), PENDING_TEXT);
    assert_eq!(store.snapshot().await.len(), 2);
}

#[tokio::test]
async fn test_reseed_drops_previous_keys() {
    let client = ScriptedReportClient::new()
        .with_report("a", vec![CategoryReport::complete("A", 1, 0, 5)]);
    let store = sequential_store(&client);

    store.seed(vec![key("a"), key("b")]).await.unwrap();
    store.refresh_all().await.unwrap();
    store.seed(vec![key("b"), key("c")]).await.unwrap();

    let snapshot = store.snapshot().await;
    assert!(!snapshot.contains_key(&key("a")));
    assert_eq!(snapshot.get(&key("b")), Some(&AvailabilityStatus::NotLoaded));
    assert_eq!(snapshot.get(&key("c")), Some(&AvailabilityStatus::NotLoaded));
}

#[tokio::test]
async fn test_refresh_one_renders_occupied_over_capacity() {
    let client = ScriptedReportClient::new()
        .with_report("evt", vec![CategoryReport::complete("A", 3, 2, 10)]);
    let store = sequential_store(&client);

    let status = store.refresh_one(key("evt")).await.unwrap();

    assert_eq!(status.render(), "A: 5/10");
    assert_eq!(
        status,
        AvailabilityStatus::Loaded {
            summary: vec![CategoryTally::new("A", 3, 2, 10)],
            refreshed_at: test_epoch(),
        }
    );
    assert_eq!(store.status_of(&key("evt")).await, status);
}

#[tokio::test]
async fn test_missing_held_reads_as_zero() {
    let missing = CategoryReport {
        category: "A".to_string(),
        booked: Some(3),
        held: None,
        capacity: Some(10),
    };
    let client = ScriptedReportClient::new()
        .with_report("missing", vec![missing])
        .with_report("zero", vec![CategoryReport::complete("A", 3, 0, 10)]);
    let store = sequential_store(&client);

    let missing = store.refresh_one(key("missing")).await.unwrap();
    let zero = store.refresh_one(key("zero")).await.unwrap();

    assert_eq!(missing.render(), zero.render());
    assert_eq!(missing.render(), "A: 3/10");
}

#[tokio::test]
async fn test_failed_report_is_recorded_not_raised() {
    let client = ScriptedReportClient::new()
        .with_error("evt", ReportError::Malformed("unexpected end of input".to_string()));
    let store = sequential_store(&client);

    let status = tokio_test::assert_ok!(store.refresh_one(key("evt")).await);

    assert_eq!(
        status.render(),
        "Error: malformed report: unexpected end of input"
    );
    assert!(store.status_of(&key("evt")).await.is_failed());
}

#[tokio::test]
async fn test_refresh_all_isolates_failures() {
    let client = ScriptedReportClient::new()
        .with_report("a", vec![CategoryReport::complete("A", 1, 1, 4)])
        .with_report("c", vec![CategoryReport::complete("C", 0, 0, 8)])
        .with_report("d", vec![CategoryReport::complete("D", 2, 0, 2)]);
    let store = sequential_store(&client);
    store
        .seed(vec![key("a"), key("b"), key("c"), key("d")])
        .await
        .unwrap();

    store.refresh_all().await.unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.len(), 4);
    let failed: Vec<_> = snapshot
        .iter()
        .filter(|(_, status)| status.is_failed())
        .map(|(key, _)| key.clone())
        .collect();
    assert_eq!(failed, vec![key("b")]);
    assert_eq!(
        snapshot[&key("b")].render(),
        "Error: unknown event 'b'"
    );
    assert!(snapshot.values().all(|status| !status.is_pending()));
}

#[tokio::test]
async fn test_repeated_refresh_renders_identically() {
    let client = ScriptedReportClient::new().with_report(
        "evt",
        vec![
            CategoryReport::complete("A", 3, 2, 10),
            CategoryReport::complete("B", 0, 0, 20),
        ],
    );
    let store = sequential_store(&client);

    let first = store.refresh_one(key("evt")).await.unwrap().render();
    let second = store.refresh_one(key("evt")).await.unwrap().render();

    assert_eq!(first, second);
    assert_eq!(first, "A: 5/10 | B: 0/20");
}

#[tokio::test]
async fn test_category_order_follows_report() {
    let client = ScriptedReportClient::new().with_report(
        "evt",
        vec![
            CategoryReport::complete("Zeta", 1, 0, 1),
            CategoryReport::complete("Alpha", 0, 1, 2),
            CategoryReport::complete("Mid", 0, 0, 3),
        ],
    );
    let store = sequential_store(&client);

    let status = store.refresh_one(key("evt")).await.unwrap();

    assert_eq!(status.render(), "Zeta: 1/1 | Alpha: 1/2 | Mid: 0/3");
}

#[tokio::test]
async fn test_empty_report_renders_no_categories() {
    let client = ScriptedReportClient::new().with_report("evt", Vec::new());
    let store = sequential_store(&client);

    let status = store.refresh_one(key("evt")).await.unwrap();

    assert_eq!(status.render(), "No categories");
}

#[tokio::test]
async fn test_result_from_before_reseed_is_discarded() {
    let client = ScriptedReportClient::new()
        .with_report("evt", vec![CategoryReport::complete("A", 1, 0, 1)])
        .with_delay("evt", Duration::from_millis(200));
    let store = sequential_store(&client);
    store.seed(vec![key("evt")]).await.unwrap();

    let background = store.clone();
    let refresh = tokio::spawn(async move { background.refresh_one(key("evt")).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.seed(vec![key("evt")]).await.unwrap();

    let returned = refresh.await.unwrap().unwrap();

    assert_eq!(returned, AvailabilityStatus::NotLoaded);
    assert_eq!(store.status_of(&key("evt")).await, AvailabilityStatus::NotLoaded);
}

#[tokio::test]
async fn test_cancel_keeps_completed_entries_and_discards_the_rest() {
    let mut client = ScriptedReportClient::new();
    for raw in ["a", "b", "c"] {
        client = client
            .with_report(raw, vec![CategoryReport::complete(raw, 1, 0, 1)])
            .with_delay(raw, Duration::from_millis(100));
    }
    let store = sequential_store(&client);
    store.seed(vec![key("a"), key("b"), key("c")]).await.unwrap();

    let background = store.clone();
    let refresh = tokio::spawn(async move { background.refresh_all().await });
    tokio::time::sleep(Duration::from_millis(150)).await;
    store.cancel_refresh().await.unwrap();
    refresh.await.unwrap().unwrap();

    assert_eq!(store.status_of(&key("a")).await.render(), "a: 1/1");
    assert!(store.status_of(&key("b")).await.is_pending());
    assert!(store.status_of(&key("c")).await.is_pending());
}

#[tokio::test]
async fn test_parallel_refresh_respects_concurrency_limit() {
    let keys = ["a", "b", "c", "d", "e", "f"];
    let mut client = ScriptedReportClient::new();
    for raw in keys {
        client = client
            .with_report(raw, vec![CategoryReport::complete("A", 0, 0, 1)])
            .with_delay(raw, Duration::from_millis(40));
    }
    let store = store_with(
        &client,
        refresh_config(RefreshMode::Parallel { max_concurrent: 2 }),
    );
    store.seed(keys.iter().map(|raw| key(raw))).await.unwrap();

    store.refresh_all().await.unwrap();

    assert_eq!(client.peak_in_flight(), 2);
    assert_eq!(client.calls().len(), keys.len());
    let snapshot = store.snapshot().await;
    assert!(snapshot.values().all(|status| status.render() == "A: 0/1"));
}

#[tokio::test]
async fn test_sequential_refresh_runs_one_call_at_a_time_in_key_order() {
    let mut client = ScriptedReportClient::new();
    for raw in ["c", "a", "b"] {
        client = client
            .with_report(raw, Vec::new())
            .with_delay(raw, Duration::from_millis(10));
    }
    let store = sequential_store(&client);
    store.seed(vec![key("c"), key("a"), key("b")]).await.unwrap();

    store.refresh_all().await.unwrap();

    assert_eq!(client.peak_in_flight(), 1);
    assert_eq!(client.calls(), vec![key("a"), key("b"), key("c")]);
}

#[tokio::test]
async fn test_slow_report_times_out() {
    let client = ScriptedReportClient::new()
        .with_report("evt", Vec::new())
        .with_delay("evt", Duration::from_millis(500));
    let store = store_with(
        &client,
        RefreshConfig {
            mode: RefreshMode::Sequential,
            timeout: Duration::from_millis(50),
            retry: RetryPolicy::none(),
        },
    );

    let status = store.refresh_one(key("evt")).await.unwrap();

    assert_eq!(status.render(), "Error: report request timed out after 50ms");
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let client = ScriptedReportClient::new()
        .with_report("evt", vec![CategoryReport::complete("A", 1, 1, 3)])
        .with_transient_failures("evt", 2);
    let store = sequential_store(&client);

    let status = store.refresh_one(key("evt")).await.unwrap();

    assert_eq!(status.render(), "A: 2/3");
    assert_eq!(client.calls_for("evt"), 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let client = ScriptedReportClient::new()
        .with_report("evt", Vec::new())
        .with_transient_failures("evt", 5);
    let store = sequential_store(&client);

    let status = store.refresh_one(key("evt")).await.unwrap();

    assert_eq!(
        status.render(),
        "Error: report service unavailable: scripted outage"
    );
    assert_eq!(client.calls_for("evt"), 3);
}

#[tokio::test]
async fn test_unknown_event_is_not_retried() {
    let client = ScriptedReportClient::new();
    let store = sequential_store(&client);

    let status = store.refresh_one(key("missing")).await.unwrap();

    assert!(status.is_failed());
    assert_eq!(client.calls_for("missing"), 1);
}

#[tokio::test]
async fn test_reload_skips_records_without_key() {
    let client = ScriptedReportClient::new()
        .with_report("evt-1", vec![CategoryReport::complete("A", 3, 2, 10)]);
    let store = sequential_store(&client);
    let catalog = StaticCatalog::new(vec![
        record(Some("evt-1"), "Morning"),
        record(Some("   "), "Blank"),
        record(None, "Missing"),
    ]);

    let records = store.reload_and_refresh(&catalog).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(store.snapshot().await.len(), 1);
    assert_eq!(client.calls(), vec![key("evt-1")]);

    let rows = store.rows().await;
    let shown: Vec<(&str, &str)> = rows
        .iter()
        .map(|row| (row.show_name.as_str(), row.availability.as_str()))
        .collect();
    assert_eq!(
        shown,
        vec![("Morning", "A: 5/10"), ("Blank", "N/A"), ("Missing", "N/A")]
    );
    assert_eq!(rows[0].starts_at, "2025-01-01 10:00");
}

#[tokio::test]
async fn test_catalog_failure_keeps_previous_state() {
    let client = ScriptedReportClient::new()
        .with_report("evt-1", vec![CategoryReport::complete("A", 3, 2, 10)]);
    let store = sequential_store(&client);
    store
        .reload_and_refresh(&StaticCatalog::new(vec![record(Some("evt-1"), "Morning")]))
        .await
        .unwrap();
    let before = (store.snapshot().await, store.rows().await);

    let result = store
        .reload_and_refresh(&UnavailableCatalog::new("connection refused"))
        .await;

    assert!(matches!(result, Err(MonitorError::Catalog(_))));
    assert_eq!((store.snapshot().await, store.rows().await), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reloads_keep_rows_and_keys_from_one_catalog() {
    let store = sequential_store(&ScriptedReportClient::new());
    let morning = StaticCatalog::new(vec![
        record(Some("m-1"), "Morning"),
        record(Some("m-2"), "Morning"),
    ]);
    let evening = StaticCatalog::new(vec![record(Some("e-1"), "Evening")]);

    for _ in 0..25 {
        let (a, b) = (store.clone(), store.clone());
        let (first, second) = tokio::join!(
            async { a.reload(&morning).await },
            async { b.reload(&evening).await },
        );
        first.unwrap();
        second.unwrap();

        let row_keys: Vec<String> = store
            .rows()
            .await
            .into_iter()
            .filter_map(|row| row.event_key)
            .collect();
        let tracked: Vec<String> = store
            .snapshot()
            .await
            .into_keys()
            .map(String::from)
            .collect();
        assert_eq!(row_keys, tracked);
    }
}

#[tokio::test]
async fn test_refresh_stale_only_touches_old_entries() {
    let clock = ManualClock::new(test_epoch());
    let client = ScriptedReportClient::new()
        .with_report("a", vec![CategoryReport::complete("A", 0, 0, 1)])
        .with_report("b", vec![CategoryReport::complete("B", 0, 0, 1)]);
    let store = AvailabilityStore::new(AvailabilityEnvironment::new(
        Arc::new(client.clone()),
        Arc::new(clock.clone()),
        refresh_config(RefreshMode::Sequential),
    ));
    store.seed(vec![key("a"), key("b")]).await.unwrap();
    store.refresh_one(key("a")).await.unwrap();

    let max_age = chrono::Duration::minutes(5);
    assert!(!store.is_stale(&key("a"), max_age).await);
    assert!(store.is_stale(&key("b"), max_age).await);

    store.refresh_stale(max_age).await.unwrap();
    assert_eq!(client.calls(), vec![key("a"), key("b")]);

    clock.advance(chrono::Duration::minutes(6));
    client.set_report("a", vec![CategoryReport::complete("A", 1, 0, 1)]);
    assert!(store.is_stale(&key("a"), max_age).await);

    store.refresh_stale(max_age).await.unwrap();

    assert_eq!(client.calls().len(), 4);
    assert_eq!(
        store.status_of(&key("a")).await.refreshed_at(),
        Some(test_epoch() + chrono::Duration::minutes(6))
    );
    assert_eq!(store.status_of(&key("a")).await.render(), "A: 1/1");
}

#[tokio::test]
async fn test_store_rejects_requests_after_shutdown() {
    let store = sequential_store(&ScriptedReportClient::new());

    tokio_test::assert_ok!(store.shutdown(Duration::from_secs(1)).await);

    let rejected = tokio_test::assert_err!(store.refresh_one(key("evt")).await);
    assert_eq!(rejected, StoreError::ShutdownInProgress);
}

#[tokio::test]
async fn test_partial_results_are_readable_during_refresh_all() {
    let mut client = ScriptedReportClient::new();
    for raw in ["a", "b", "c"] {
        client = client
            .with_report(raw, vec![CategoryReport::complete(raw, 1, 0, 2)])
            .with_delay(raw, Duration::from_millis(100));
    }
    let store = sequential_store(&client);
    store.seed(vec![key("a"), key("b"), key("c")]).await.unwrap();

    let background = store.clone();
    let refresh = tokio::spawn(async move { background.refresh_all().await });
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(store.status_of(&key("a")).await.is_loaded());
    assert!(store.status_of(&key("b")).await.is_pending());
    assert!(store.status_of(&key("c")).await.is_pending());

    refresh.await.unwrap().unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot.values().all(AvailabilityStatus::is_loaded));
}

#[tokio::test]
async fn test_watch_prints_rows_after_each_refresh() {
    let client = ScriptedReportClient::new()
        .with_report("evt-1", vec![CategoryReport::complete("A", 3, 2, 10)]);
    let store = sequential_store(&client);
    store
        .reload(&StaticCatalog::new(vec![record(Some("evt-1"), "Morning")]))
        .await
        .unwrap();

    let mut printed = Vec::new();
    watch(
        &store,
        Duration::from_millis(20),
        chrono::Duration::hours(1),
        tokio::time::sleep(Duration::from_millis(70)),
        |rows| printed.push(rows),
    )
    .await
    .unwrap();

    assert!(!printed.is_empty());
    assert_eq!(printed[0][0].availability, "A: 5/10");
    assert_eq!(client.calls(), vec![key("evt-1")]);
}

#[tokio::test]
async fn test_shutdown_during_watch_refresh_cancels_it() {
    let client = ScriptedReportClient::new()
        .with_report("a", vec![CategoryReport::complete("A", 1, 0, 1)])
        .with_report("b", vec![CategoryReport::complete("B", 1, 0, 1)])
        .with_delay("b", Duration::from_millis(300));
    let store = sequential_store(&client);
    store.seed(vec![key("a"), key("b")]).await.unwrap();

    let mut refreshes = 0;
    let stopped = tokio::time::timeout(
        Duration::from_millis(250),
        watch(
            &store,
            Duration::from_millis(20),
            chrono::Duration::hours(1),
            tokio::time::sleep(Duration::from_millis(80)),
            |_| refreshes += 1,
        ),
    )
    .await;

    tokio_test::assert_ok!(tokio_test::assert_ok!(stopped));
    assert_eq!(refreshes, 0);
    assert!(store.status_of(&key("a")).await.is_loaded());
    assert!(store.status_of(&key("b")).await.is_pending());

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(store.status_of(&key("b")).await.is_pending());
}
