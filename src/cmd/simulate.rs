use std::path::PathBuf;

use clap::Parser;

use super::{CmdError, load_config, parse_content_ids, request_secrets};
use crate::{
    codec::{DecodedResult, ReturnType, decode_result},
    config::AppConfig,
    http_client::HttpClientPool,
    providers::{OnChainNetwork, create_provider},
    sandbox::{HttpCapabilities, SandboxInputs, fulfill},
};

/// Runs the oracle computation locally, without touching the chain's state.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Comma-separated content ids to evaluate.
    #[arg(short, long)]
    content_ids: String,
    /// File holding the prompt template. Required unless an action registry is
    /// configured.
    #[arg(short, long)]
    prompt_file: Option<PathBuf>,
    /// Type to decode the response as.
    #[arg(short, long, default_value = "string")]
    return_type: ReturnType,
}

pub async fn execute(args: SimulateArgs, config_dir: Option<&str>) -> Result<(), CmdError> {
    let config = load_config(config_dir)?;
    let content_ids = parse_content_ids(&args.content_ids);
    if content_ids.is_empty() {
        return Err(CmdError::Usage("at least one content id is required".to_string()));
    }

    let prompt = load_prompt(&config, args.prompt_file.as_ref()).await?;
    tracing::debug!(prompt_len = prompt.len(), count = content_ids.len(), "Simulating request.");

    let pool = HttpClientPool::with_base_config(config.http_base_config.clone());
    let relay_client = pool.get_or_create(&config.http_retry_config).await?;
    let secrets = request_secrets(&config, &relay_client).await?;

    let sandbox_client = pool.get_or_create(&config.sandbox.http_retry_config).await?;
    let capabilities = HttpCapabilities::new(config.sandbox.clone(), sandbox_client);
    let inputs = SandboxInputs::for_posts(&prompt, &content_ids, secrets);

    let fulfillment = fulfill(&inputs, &capabilities, config.sandbox.max_response_bytes).await;
    println!("response: 0x{}", hex::encode(&fulfillment.response));
    if !fulfillment.error.is_empty() {
        println!("error:    {}", String::from_utf8_lossy(&fulfillment.error));
    }
    match decode_result(&fulfillment.response, args.return_type)? {
        DecodedResult::Empty => println!("decoded:  <empty>"),
        DecodedResult::Value(value) => println!("decoded:  {value} ({})", args.return_type),
    }
    Ok(())
}

/// The prompt configured on-chain for the consumer, or the prompt file.
async fn load_prompt(config: &AppConfig, prompt_file: Option<&PathBuf>) -> Result<String, CmdError> {
    if let Some(path) = prompt_file {
        return Ok(tokio::fs::read_to_string(path).await?);
    }
    let Some(registry) = config.network.action_registry_address else {
        return Err(CmdError::Usage(
            "--prompt-file is required when no action_registry_address is configured".to_string(),
        ));
    };

    let provider = create_provider(config.rpc_urls.clone(), &config.rpc_retry_config)?;
    let don_id = config.network.don_id_bytes().map_err(config::ConfigError::Message)?;
    let network = OnChainNetwork::new(provider, config.network.router_address, don_id);
    network
        .action_prompt(config.network.consumer_address, registry)
        .await
        .map_err(CmdError::Usage)
}
