use std::time::Duration;

use alloy::primitives::B256;
use clap::Parser;

use super::{CmdError, await_and_print, load_config, wire_lifecycle};
use crate::codec::ReturnType;

/// Picks up a request submitted earlier, using only what the ledger recorded.
#[derive(Parser, Debug)]
pub struct ResumeArgs {
    /// Request id to await.
    #[arg(required_unless_present = "pending", conflicts_with = "pending")]
    request_id: Option<B256>,
    /// Reconcile every broadcast whose outcome was never recorded.
    #[arg(long)]
    pending: bool,
    /// Seconds to wait for the callback. Defaults to the listener timeout.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Type to decode the response as.
    #[arg(short, long, default_value = "string")]
    return_type: ReturnType,
}

pub async fn execute(args: ResumeArgs, config_dir: Option<&str>) -> Result<(), CmdError> {
    let config = load_config(config_dir)?;
    let wiring = wire_lifecycle(&config).await?;
    let lifecycle = &wiring.lifecycle;
    let timeout =
        args.timeout_secs.map(Duration::from_secs).unwrap_or(config.listener.timeout);

    let outcome = async {
        if args.pending {
            let handles = lifecycle.reconcile_pending().await?;
            if handles.is_empty() {
                tracing::info!("No unreconciled broadcasts.");
            }
            for handle in &handles {
                println!("{}", serde_json::to_string_pretty(handle)?);
            }
            return Ok(());
        }

        let request_id = args
            .request_id
            .ok_or_else(|| CmdError::Usage("a request id or --pending is required".to_string()))?;
        let handle = lifecycle.handle(request_id).await?;
        tracing::info!(request_id = %handle.request_id, block = handle.block_number, "Resuming request.");
        await_and_print(lifecycle, &handle, timeout, args.return_type).await
    }
    .await;

    wiring.repo.close().await;
    outcome
}
