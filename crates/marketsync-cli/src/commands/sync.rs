use std::time::Instant;

use serde_json::json;
use uuid::Uuid;

use marketsync_core::{
    enrich, ConflictPolicy, GapResolver, HistoryRow, Store, SyncOutcome, Ticker,
    YahooHistoryAdapter,
};

use crate::cli::SyncArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

pub async fn run(args: &SyncArgs, mock: bool) -> Result<CommandResult, CliError> {
    let ticker = Ticker::parse(&args.symbol)?;
    let store = Store::open_default()?;
    let adapter = if mock {
        YahooHistoryAdapter::default()
    } else {
        YahooHistoryAdapter::with_real_client()
    };
    let resolver = GapResolver::new(adapter);

    let started = Instant::now();
    let outcome = resolver.check_for_update(&store, &ticker).await?;
    let latency_ms = started.elapsed().as_millis() as u64;

    match outcome {
        SyncOutcome::UpToDate => {
            let data = json!({
                "symbol": ticker.as_str(),
                "status": "up_to_date",
                "rows_written": 0,
            });
            Ok(CommandResult::ok(data).with_latency(latency_ms))
        }
        SyncOutcome::NewData(series) => {
            let enriched = enrich(series, &args.windows)?;
            let first_date = enriched.series.first_date().map(|date| date.to_string());
            let last_date = enriched.series.last_date().map(|date| date.to_string());
            let rows_fetched = enriched.series.len();

            let mut rows_written = 0;
            if !args.check_only {
                let ticker_id = store.lookup_ticker(ticker.as_str())?;
                let rows = enriched
                    .series
                    .records
                    .iter()
                    .map(|record| HistoryRow {
                        date: record.date.to_string(),
                        open: record.open,
                        high: record.high,
                        low: record.low,
                        close: record.close,
                        adj_close: record.adjusted_close,
                        volume: record.volume,
                    })
                    .collect::<Vec<_>>();
                let request_id = format!("sync:{}", Uuid::new_v4());
                rows_written = store.append_history(
                    ticker_id,
                    ticker.as_str(),
                    &rows,
                    source_name(mock),
                    &request_id,
                    ConflictPolicy::Replace,
                    latency_ms,
                )?;
            }

            let data = json!({
                "symbol": ticker.as_str(),
                "status": "new_data",
                "first_date": first_date,
                "last_date": last_date,
                "rows_fetched": rows_fetched,
                "rows_written": rows_written,
                "moving_averages": enriched.moving_averages,
            });
            let mut result = CommandResult::ok(data).with_latency(latency_ms);
            if args.check_only {
                result = result.with_warning("--check-only: fetched rows were not persisted");
            }
            Ok(result)
        }
    }
}

fn source_name(mock: bool) -> &'static str {
    if mock {
        "yahoo-mock"
    } else {
        "yahoo"
    }
}
