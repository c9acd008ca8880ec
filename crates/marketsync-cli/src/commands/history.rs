use serde_json::json;

use marketsync_core::{Store, Ticker};

use crate::cli::HistoryArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

pub fn run(args: &HistoryArgs) -> Result<CommandResult, CliError> {
    let ticker = Ticker::parse(&args.symbol)?;
    let store = Store::open_default()?;
    let ticker_id = store.lookup_ticker(ticker.as_str())?;
    let rows = store.history(ticker_id, args.limit)?;

    let data = json!({
        "symbol": ticker.as_str(),
        "row_count": rows.len(),
        "rows": rows,
    });
    Ok(CommandResult::ok(data))
}
