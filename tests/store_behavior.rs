//! Behavior tests for the DuckDB price-history store.

use marketsync_store::{
    ConflictPolicy, HistoryRow, QueryGuardrails, Store, StoreConfig, StoreError,
};
use tempfile::{tempdir, TempDir};

fn open_store(temp: &TempDir) -> Store {
    Store::open(StoreConfig {
        home: temp.path().to_path_buf(),
        db_path: temp.path().join("marketsync.duckdb"),
        max_pool_size: 2,
    })
    .expect("store open")
}

fn row(date: &str, close: f64) -> HistoryRow {
    HistoryRow {
        date: date.to_owned(),
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        adj_close: close - 0.1,
        volume: Some(25_000),
    }
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn registered_symbols_round_trip_through_lookup_and_listing() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);

    let aapl = store.register_ticker("AAPL").expect("register");
    let gspc = store.register_ticker("^GSPC").expect("register");
    assert_ne!(aapl, gspc, "surrogate keys must be distinct");

    assert_eq!(store.lookup_ticker("AAPL").expect("lookup"), aapl);
    let listed = store.list_tickers().expect("list");
    let symbols: Vec<&str> = listed.iter().map(|t| t.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAPL", "^GSPC"]);
}

// =============================================================================
// History reads and writes
// =============================================================================

#[test]
fn appended_rows_are_readable_newest_first() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let id = store.register_ticker("AAPL").expect("register");

    let written = store
        .append_history(
            id,
            "AAPL",
            &[
                row("2023-01-10", 100.0),
                row("2023-01-11", 101.0),
                row("2023-01-12", 102.0),
            ],
            "yahoo",
            "req-1",
            ConflictPolicy::Fail,
            12,
        )
        .expect("append");
    assert_eq!(written, 3);

    let history = store.history(id, 2).expect("read");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].date, "2023-01-12");
    assert_eq!(history[1].date, "2023-01-11");
    assert_eq!(history[0].close, 102.0);
    assert_eq!(history[0].volume, Some(25_000));
}

#[test]
fn latest_history_date_tracks_the_maximum() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let id = store.register_ticker("AAPL").expect("register");

    assert_eq!(store.latest_history_date(id).expect("query"), None);

    store
        .append_history(
            id,
            "AAPL",
            &[row("2023-01-12", 102.0), row("2023-01-10", 100.0)],
            "yahoo",
            "req-1",
            ConflictPolicy::Fail,
            8,
        )
        .expect("append");

    assert_eq!(
        store.latest_history_date(id).expect("query").as_deref(),
        Some("2023-01-12")
    );
}

#[test]
fn history_for_one_ticker_does_not_leak_into_another() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let aapl = store.register_ticker("AAPL").expect("register");
    let msft = store.register_ticker("MSFT").expect("register");

    store
        .append_history(
            aapl,
            "AAPL",
            &[row("2023-01-10", 100.0)],
            "yahoo",
            "req-1",
            ConflictPolicy::Fail,
            3,
        )
        .expect("append");

    assert_eq!(store.latest_history_date(msft).expect("query"), None);
    assert!(store.history(msft, 10).expect("read").is_empty());
}

// =============================================================================
// Conflict policies
// =============================================================================

#[test]
fn fail_policy_surfaces_a_write_conflict_and_rolls_back() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let id = store.register_ticker("AAPL").expect("register");

    store
        .append_history(
            id,
            "AAPL",
            &[row("2023-01-10", 100.0)],
            "yahoo",
            "req-1",
            ConflictPolicy::Fail,
            3,
        )
        .expect("first append");

    let error = store
        .append_history(
            id,
            "AAPL",
            &[row("2023-01-11", 101.0), row("2023-01-10", 999.0)],
            "yahoo",
            "req-2",
            ConflictPolicy::Fail,
            3,
        )
        .expect_err("duplicate must fail");
    assert!(matches!(
        error,
        StoreError::WriteConflict { ref date, .. } if date == "2023-01-10"
    ));

    // The whole batch rolled back, including the non-conflicting row.
    let history = store.history(id, 10).expect("read");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].close, 100.0);
}

#[test]
fn ignore_policy_keeps_the_existing_row() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let id = store.register_ticker("AAPL").expect("register");

    store
        .append_history(
            id,
            "AAPL",
            &[row("2023-01-10", 100.0)],
            "yahoo",
            "req-1",
            ConflictPolicy::Fail,
            3,
        )
        .expect("first append");
    store
        .append_history(
            id,
            "AAPL",
            &[row("2023-01-10", 999.0)],
            "yahoo",
            "req-2",
            ConflictPolicy::Ignore,
            3,
        )
        .expect("ignored append");

    let history = store.history(id, 10).expect("read");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].close, 100.0);
}

#[test]
fn replace_policy_keeps_the_fetched_row() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let id = store.register_ticker("AAPL").expect("register");

    store
        .append_history(
            id,
            "AAPL",
            &[row("2023-01-10", 100.0)],
            "yahoo",
            "req-1",
            ConflictPolicy::Fail,
            3,
        )
        .expect("first append");
    store
        .append_history(
            id,
            "AAPL",
            &[row("2023-01-10", 999.0)],
            "yahoo",
            "req-2",
            ConflictPolicy::Replace,
            3,
        )
        .expect("replacing append");

    let history = store.history(id, 10).expect("read");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].close, 999.0);
}

// =============================================================================
// Audit log and ad hoc SQL
// =============================================================================

#[test]
fn every_append_leaves_a_sync_log_row() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let id = store.register_ticker("AAPL").expect("register");

    store
        .append_history(
            id,
            "AAPL",
            &[row("2023-01-10", 100.0)],
            "yahoo",
            "req-audit",
            ConflictPolicy::Fail,
            42,
        )
        .expect("append");

    let result = store
        .execute_query(
            "SELECT request_id, rows_written FROM sync_log WHERE symbol = 'AAPL'",
            QueryGuardrails::default(),
            false,
        )
        .expect("query");
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0], serde_json::Value::String("req-audit".into()));
}

#[test]
fn read_only_sql_rejects_write_statements() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);

    let error = store
        .execute_query(
            "DELETE FROM price_history",
            QueryGuardrails::default(),
            false,
        )
        .expect_err("should reject");
    assert!(matches!(error, StoreError::QueryRejected(_)));
}

#[test]
fn row_guardrail_truncates_large_results() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let id = store.register_ticker("AAPL").expect("register");

    let rows: Vec<HistoryRow> = (1..=9)
        .map(|day| row(&format!("2023-01-0{day}"), 100.0 + f64::from(day)))
        .collect();
    store
        .append_history(id, "AAPL", &rows, "yahoo", "req-1", ConflictPolicy::Fail, 3)
        .expect("append");

    let result = store
        .execute_query(
            "SELECT date FROM price_history ORDER BY date",
            QueryGuardrails {
                max_rows: 4,
                query_timeout_ms: 5_000,
            },
            false,
        )
        .expect("query");
    assert_eq!(result.row_count, 4);
    assert!(result.truncated);
}
