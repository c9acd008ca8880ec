//! # marketsync store
//!
//! DuckDB-backed persistence for daily price history.
//!
//! The store owns three durable tables:
//!
//! | Table | Description |
//! |-------|-------------|
//! | `tickers` | Ticker registry; maps a symbol to its surrogate key |
//! | `price_history` | Daily OHLC + adjusted close rows, keyed `(ticker_id, date)` |
//! | `sync_log` | Audit rows, one per append |
//!
//! All user-supplied values reach the database as query parameters, never by
//! interpolation. The ad hoc SQL path ([`Store::execute_query`]) is
//! read-only by default and enforces row and timeout guardrails.

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ::duckdb::types::Value as DuckValue;
use ::duckdb::Connection;
use ::duckdb::ToSql;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

pub use duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Query was rejected due to policy violation.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// Query execution timed out.
    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// The symbol has no row in the ticker registry.
    #[error("ticker '{symbol}' is not registered")]
    UnknownTicker { symbol: String },

    /// A plain append hit an existing `(ticker, date)` row.
    #[error("duplicate price row for '{symbol}' on {date}")]
    WriteConflict { symbol: String, date: String },

    /// A stored date column failed to round-trip as ISO `YYYY-MM-DD`.
    #[error("malformed date '{value}' in price_history")]
    MalformedDate { value: String },
}

/// Configuration for the store database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for marketsync data.
    pub home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections to keep per access mode.
    pub max_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let home = resolve_home();
        let db_path = home.join("marketsync.duckdb");
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// Guardrails for ad hoc query execution.
#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    /// Maximum number of rows to return.
    pub max_rows: usize,
    /// Query timeout in milliseconds.
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    fn validate(self) -> Result<(), StoreError> {
        if self.max_rows == 0 {
            return Err(StoreError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(StoreError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

/// Column metadata for query results.
#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

/// Result of an ad hoc SQL query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<SqlColumn>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    /// Whether results were cut off by the row guardrail.
    pub truncated: bool,
}

/// A registry entry: symbol plus its surrogate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerRow {
    pub id: i64,
    pub symbol: String,
}

/// One daily price row in store vocabulary, dates as ISO `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: Option<u64>,
}

/// How [`Store::append_history`] treats an existing `(ticker, date)` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Plain INSERT; a duplicate surfaces as [`StoreError::WriteConflict`].
    Fail,
    /// Existing rows win.
    Ignore,
    /// Fetched rows win.
    Replace,
}

impl ConflictPolicy {
    const fn insert_verb(self) -> &'static str {
        match self {
            Self::Fail => "INSERT",
            Self::Ignore => "INSERT OR IGNORE",
            Self::Replace => "INSERT OR REPLACE",
        }
    }
}

/// The price-history store.
#[derive(Clone)]
pub struct Store {
    config: StoreConfig,
    manager: DuckDbConnectionManager,
}

impl Store {
    /// Open a store with default configuration (`MARKETSYNC_HOME` or `~/.marketsync`).
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(StoreConfig::default())
    }

    /// Open a store, creating the database file and schema if absent.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let store = Self { config, manager };
        store.initialize()?;
        Ok(store)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn home(&self) -> &Path {
        self.config.home.as_path()
    }

    /// Register a symbol, returning its surrogate key. Idempotent.
    pub fn register_ticker(&self, symbol: &str) -> Result<i64, StoreError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        let params: [&dyn ToSql; 1] = [&symbol];
        connection.execute(
            "INSERT OR IGNORE INTO tickers (symbol) VALUES (?)",
            params.as_slice(),
        )?;
        let id = connection.query_row(
            "SELECT id FROM tickers WHERE symbol = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Resolve a symbol to its surrogate key.
    ///
    /// # Errors
    /// [`StoreError::UnknownTicker`] if the symbol is not registered.
    pub fn lookup_ticker(&self, symbol: &str) -> Result<i64, StoreError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let params: [&dyn ToSql; 1] = [&symbol];
        connection
            .query_row(
                "SELECT id FROM tickers WHERE symbol = ?",
                params.as_slice(),
                |row| row.get(0),
            )
            .map_err(|error| match error {
                ::duckdb::Error::QueryReturnedNoRows => StoreError::UnknownTicker {
                    symbol: symbol.to_owned(),
                },
                other => StoreError::DuckDb(other),
            })
    }

    /// List all registered tickers, ordered by symbol.
    pub fn list_tickers(&self) -> Result<Vec<TickerRow>, StoreError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare("SELECT id, symbol FROM tickers ORDER BY symbol")?;
        let rows = statement.query_map([], |row| {
            Ok(TickerRow {
                id: row.get(0)?,
                symbol: row.get(1)?,
            })
        })?;

        let mut tickers = Vec::new();
        for row in rows {
            tickers.push(row?);
        }
        Ok(tickers)
    }

    /// Newest persisted date for a ticker, as ISO `YYYY-MM-DD`.
    ///
    /// Returns `Ok(None)` when the ticker has no history rows yet.
    pub fn latest_history_date(&self, ticker_id: i64) -> Result<Option<String>, StoreError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let params: [&dyn ToSql; 1] = [&ticker_id];
        let latest = connection.query_row(
            "SELECT CAST(MAX(date) AS VARCHAR) FROM price_history WHERE ticker_id = ?",
            params.as_slice(),
            |row| row.get::<_, Option<String>>(0),
        )?;
        Ok(latest)
    }

    /// Append price rows for a ticker inside one transaction.
    ///
    /// Returns the number of rows actually written (with
    /// [`ConflictPolicy::Ignore`] this can be lower than `rows.len()`).
    /// Every call leaves one audit row in `sync_log`.
    #[allow(clippy::too_many_arguments)]
    pub fn append_history(
        &self,
        ticker_id: i64,
        symbol: &str,
        rows: &[HistoryRow],
        source: &str,
        request_id: &str,
        policy: ConflictPolicy,
        latency_ms: u64,
    ) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, StoreError> {
            let insert_sql = format!(
                "{verb} INTO price_history \
                 (ticker_id, date, open, high, low, close, adj_close, volume, source, updated_at) \
                 VALUES (?, TRY_CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
                verb = policy.insert_verb()
            );

            let mut written = 0_usize;
            for row in rows {
                let params: [&dyn ToSql; 9] = [
                    &ticker_id,
                    &row.date,
                    &row.open,
                    &row.high,
                    &row.low,
                    &row.close,
                    &row.adj_close,
                    &row.volume,
                    &source,
                ];
                written += connection
                    .execute(insert_sql.as_str(), params.as_slice())
                    .map_err(|error| conflict_or_db(error, symbol, row.date.as_str()))?;
            }

            let written_count = written as i64;
            let params: [&dyn ToSql; 5] =
                [&request_id, &symbol, &source, &written_count, &latency_ms];
            connection.execute(
                "INSERT INTO sync_log \
                 (request_id, symbol, source, rows_written, status, latency_ms, timestamp) \
                 VALUES (?, ?, ?, ?, 'ok', ?, CURRENT_TIMESTAMP)",
                params.as_slice(),
            )?;

            Ok(written)
        })();

        finalize_transaction(&connection, result)
    }

    /// Read persisted rows for a ticker, newest first.
    pub fn history(&self, ticker_id: i64, limit: usize) -> Result<Vec<HistoryRow>, StoreError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let limit = limit as i64;
        let params: [&dyn ToSql; 2] = [&ticker_id, &limit];
        let mut statement = connection.prepare(
            "SELECT CAST(date AS VARCHAR), open, high, low, close, adj_close, volume \
             FROM price_history WHERE ticker_id = ? ORDER BY date DESC LIMIT ?",
        )?;
        let rows = statement.query_map(params.as_slice(), |row| {
            Ok(HistoryRow {
                date: row.get(0)?,
                open: row.get(1)?,
                high: row.get(2)?,
                low: row.get(3)?,
                close: row.get(4)?,
                adj_close: row.get(5)?,
                volume: row
                    .get::<_, Option<i64>>(6)?
                    .and_then(|volume| u64::try_from(volume).ok()),
            })
        })?;

        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }

    /// Execute an ad hoc SQL query under guardrails.
    ///
    /// Read-only mode accepts a single SELECT/CTE statement; `allow_write`
    /// lifts that restriction for deliberate maintenance queries.
    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
        allow_write: bool,
    ) -> Result<QueryResult, StoreError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;

        if !allow_write {
            enforce_read_only_query(sql)?;
        }

        let mode = if allow_write {
            AccessMode::ReadWrite
        } else {
            AccessMode::ReadOnly
        };
        let connection = self.manager.acquire(mode)?;
        execute_with_guardrails(&connection, sql, guardrails, allow_write)
    }
}

/// Map a duplicate-key failure to `WriteConflict`, everything else to `DuckDb`.
fn conflict_or_db(error: ::duckdb::Error, symbol: &str, date: &str) -> StoreError {
    if error.to_string().contains("Constraint Error") {
        StoreError::WriteConflict {
            symbol: symbol.to_owned(),
            date: date.to_owned(),
        }
    } else {
        StoreError::DuckDb(error)
    }
}

/// Commit on success, roll back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn execute_with_guardrails(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    allow_write: bool,
) -> Result<QueryResult, StoreError> {
    let started = Instant::now();
    if is_select_like(sql) {
        execute_select_query(connection, sql, guardrails, started)
    } else if allow_write {
        connection.execute_batch(sql)?;
        ensure_timeout(started, guardrails.timeout())?;
        Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
        })
    } else {
        Err(StoreError::QueryRejected(String::from(
            "only SELECT/CTE queries are allowed unless --write is provided",
        )))
    }
}

fn execute_select_query(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    started: Instant,
) -> Result<QueryResult, StoreError> {
    // Column metadata is only available after the statement has executed once.
    let mut statement = connection.prepare(sql)?;
    let _ = statement.query([] as [&dyn ToSql; 0])?;

    let column_count = statement.column_count();
    let mut columns = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let name = statement.column_name(index).unwrap().to_string();
        let dtype = statement.column_type(index);
        columns.push(SqlColumn {
            name,
            r#type: dtype.to_string(),
        });
    }

    let mut rows_cursor = statement.query([] as [&dyn ToSql; 0])?;
    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows_cursor.next()? {
        ensure_timeout(started, guardrails.timeout())?;

        if rows.len() >= guardrails.max_rows {
            truncated = true;
            break;
        }

        rows.push(read_row(row, column_count)?);
    }

    ensure_timeout(started, guardrails.timeout())?;

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        truncated,
    })
}

fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        other => Value::String(format!("{other:?}")),
    }
}

fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn normalize_sql(sql: &str) -> Result<&str, StoreError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(StoreError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized.trim_end_matches(';').trim())
}

fn enforce_read_only_query(sql: &str) -> Result<(), StoreError> {
    if !is_select_like(sql) {
        return Err(StoreError::QueryRejected(String::from(
            "read-only mode accepts only SELECT/CTE queries; use --write for write statements",
        )));
    }
    if has_multiple_statements(sql) {
        return Err(StoreError::QueryRejected(String::from(
            "multiple SQL statements are not allowed in read-only mode",
        )));
    }
    Ok(())
}

fn is_select_like(sql: &str) -> bool {
    let first_keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first_keyword.as_str(),
        "SELECT" | "WITH" | "EXPLAIN" | "SHOW" | "DESCRIBE"
    )
}

fn has_multiple_statements(sql: &str) -> bool {
    sql.split(';')
        .filter(|part| !part.trim().is_empty())
        .count()
        > 1
}

fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), StoreError> {
    if started.elapsed() > timeout {
        return Err(StoreError::QueryTimeout {
            timeout_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
        });
    }
    Ok(())
}

/// Resolve the marketsync home directory from environment or default.
fn resolve_home() -> PathBuf {
    if let Some(path) = env::var_os("MARKETSYNC_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".marketsync");
    }

    PathBuf::from(".marketsync")
}
