use marketsync_core::{QueryGuardrails, Store};

use crate::cli::SqlArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

pub fn run(args: &SqlArgs) -> Result<CommandResult, CliError> {
    let store = Store::open_default()?;
    let guardrails = QueryGuardrails {
        max_rows: args.max_rows,
        query_timeout_ms: args.query_timeout_ms,
    };

    let result = store.execute_query(&args.query, guardrails, args.write)?;
    let truncated = result.truncated;

    let mut command_result = CommandResult::ok(serde_json::to_value(&result)?);
    if truncated {
        command_result = command_result.with_warning(format!(
            "result truncated to --max-rows {}",
            args.max_rows
        ));
    }
    Ok(command_result)
}
