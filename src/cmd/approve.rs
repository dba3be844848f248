use clap::Parser;

use super::{CmdError, load_config};
use crate::{
    config::CredentialsConfig,
    providers::{approve_full_balance, create_signer_provider},
};

/// Approves the fee spender for the wallet's entire LINK balance.
#[derive(Parser, Debug)]
pub struct ApproveArgs {}

pub async fn execute(_args: ApproveArgs, config_dir: Option<&str>) -> Result<(), CmdError> {
    let config = load_config(config_dir)?;
    let private_key = CredentialsConfig::require(&config.credentials.private_key, "private_key")?;
    let (provider, owner) =
        create_signer_provider(config.rpc_urls.clone(), &config.rpc_retry_config, private_key)?;

    let spender = config.network.fee_spender();
    tracing::info!(owner = %owner, spender = %spender, "Approving LINK spender.");
    let approval =
        approve_full_balance(&provider, config.network.link_token_address, owner, spender).await?;

    println!("approved {} juels to {spender} in {}", approval.amount, approval.tx_hash);
    Ok(())
}
