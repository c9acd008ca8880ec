//! CLI argument definitions for marketsync.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sync` | Fetch rows newer than the store and append them |
//! | `history` | Show persisted history for a ticker |
//! | `tickers` | Manage the ticker registry |
//! | `sql` | Query the local DuckDB store |
//!
//! # Examples
//!
//! ```bash
//! # Register a ticker, then pull its full history
//! marketsync tickers add ^GSPC
//! marketsync sync ^GSPC
//!
//! # Later runs only fetch the gap since the last stored date
//! marketsync sync ^GSPC --ma 50,200
//!
//! # Inspect what landed
//! marketsync history ^GSPC --limit 10
//! marketsync sql "SELECT COUNT(*) FROM price_history"
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Keep a local store of daily stock history in step with the upstream source.
#[derive(Debug, Parser)]
#[command(
    name = "marketsync",
    author,
    version,
    about = "Incremental daily price-history sync with a local DuckDB store"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Use the deterministic offline source adapter instead of the network.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check the source for rows newer than the store and append them.
    ///
    /// A ticker whose stored history already reaches yesterday is a no-op.
    /// A registered ticker with no rows gets a full-history fetch.
    Sync(SyncArgs),

    /// Show persisted history for a ticker, newest first.
    History(HistoryArgs),

    /// Manage the ticker registry.
    Tickers(TickersArgs),

    /// Run SQL against the local store.
    ///
    /// Read-only by default with row and timeout guardrails; use --write
    /// for deliberate maintenance statements.
    Sql(SqlArgs),
}

/// Arguments for the `sync` command.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Ticker symbol to synchronize (e.g. AAPL or ^GSPC).
    pub symbol: String,

    /// Moving-average windows to compute over the fetched rows.
    #[arg(long = "ma", value_delimiter = ',', default_values_t = [50_usize, 200])]
    pub windows: Vec<usize>,

    /// Report the gap without writing to the store.
    #[arg(long, default_value_t = false)]
    pub check_only: bool,
}

/// Arguments for the `history` command.
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Ticker symbol to show history for.
    pub symbol: String,

    /// Maximum number of rows to return.
    #[arg(long, default_value_t = 30)]
    pub limit: usize,
}

/// Arguments for the `tickers` command group.
#[derive(Debug, Args)]
pub struct TickersArgs {
    #[command(subcommand)]
    pub command: TickersCommand,
}

/// Ticker registry subcommands.
#[derive(Debug, Subcommand)]
pub enum TickersCommand {
    /// Register a symbol so it can be synchronized.
    Add(TickersAddArgs),

    /// List registered symbols with their surrogate keys.
    List,
}

/// Arguments for `tickers add`.
#[derive(Debug, Args)]
pub struct TickersAddArgs {
    /// Symbol to register.
    pub symbol: String,
}

/// Arguments for the `sql` command.
#[derive(Debug, Args)]
pub struct SqlArgs {
    /// SQL query to execute.
    pub query: String,

    /// Allow write statements (INSERT, UPDATE, DELETE, CREATE, ...).
    #[arg(long, default_value_t = false)]
    pub write: bool,

    /// Maximum number of rows to return.
    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    /// Query timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub query_timeout_ms: u64,
}
