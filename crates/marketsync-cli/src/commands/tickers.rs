use serde_json::json;

use marketsync_core::{Store, Ticker};

use crate::cli::{TickersArgs, TickersCommand};
use crate::commands::CommandResult;
use crate::error::CliError;

pub fn run(args: &TickersArgs) -> Result<CommandResult, CliError> {
    let store = Store::open_default()?;

    match &args.command {
        TickersCommand::Add(add) => {
            let ticker = Ticker::parse(&add.symbol)?;
            let id = store.register_ticker(ticker.as_str())?;
            let data = json!({
                "symbol": ticker.as_str(),
                "id": id,
                "status": "registered",
            });
            Ok(CommandResult::ok(data))
        }
        TickersCommand::List => {
            let tickers = store.list_tickers()?;
            let data = json!({
                "ticker_count": tickers.len(),
                "tickers": tickers,
            });
            Ok(CommandResult::ok(data))
        }
    }
}
