use clap::Parser;

use super::{CmdError, await_and_print, load_config, parse_content_ids, request_secrets, wire_lifecycle};
use crate::codec::ReturnType;

/// Stages secrets, pays for and submits one request.
///
/// Secrets are sealed with the local X25519 envelope from
/// [`crate::secrets`], which a live DON cannot decrypt. Against a real
/// network the request is paid for but its computation fails for lack of
/// secrets.
#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// Comma-separated content ids to evaluate.
    #[arg(short, long)]
    content_ids: String,
    /// Wait for the callback and decode it after submission.
    #[arg(short = 'w', long = "await")]
    await_result: bool,
    /// Seconds to wait for the callback. Defaults to the listener timeout.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Type to decode the response as.
    #[arg(short, long, default_value = "string")]
    return_type: ReturnType,
}

pub async fn execute(args: RequestArgs, config_dir: Option<&str>) -> Result<(), CmdError> {
    let config = load_config(config_dir)?;
    let content_ids = parse_content_ids(&args.content_ids);
    if content_ids.is_empty() {
        return Err(CmdError::Usage("at least one content id is required".to_string()));
    }

    let wiring = wire_lifecycle(&config).await?;
    let secrets = request_secrets(&config, &wiring.http_client).await?;
    tracing::info!(sender = %wiring.sender, count = content_ids.len(), "Submitting request.");

    let outcome = async {
        let handle = wiring.lifecycle.run(&secrets, content_ids).await?;
        println!("{}", serde_json::to_string_pretty(&handle)?);

        if args.await_result {
            let timeout = args
                .timeout_secs
                .map(std::time::Duration::from_secs)
                .unwrap_or(config.listener.timeout);
            await_and_print(&wiring.lifecycle, &handle, timeout, args.return_type).await?;
        }
        Ok::<_, CmdError>(())
    }
    .await;

    wiring.repo.close().await;
    outcome
}
