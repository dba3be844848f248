use std::sync::Arc;

use clap::Parser;
use serde_json::json;

use super::{CmdError, load_config};
use crate::{
    estimator::{CostEstimator, EstimateParams},
    lifecycle::LifecycleSettings,
    providers::{OnChainNetwork, create_provider},
};

/// Prints the current fee estimate and whether the subscription can cover it.
#[derive(Parser, Debug)]
pub struct EstimateArgs {
    /// Gas price to estimate against instead of the network's current one.
    #[arg(long)]
    gas_price_wei: Option<u128>,
    /// Overrides the configured callback gas limit.
    #[arg(long)]
    callback_gas_limit: Option<u32>,
}

pub async fn execute(args: EstimateArgs, config_dir: Option<&str>) -> Result<(), CmdError> {
    let config = load_config(config_dir)?;
    let settings = LifecycleSettings::from_config(&config)?;

    let provider = create_provider(config.rpc_urls.clone(), &config.rpc_retry_config)?;
    let network = OnChainNetwork::new(provider, config.network.router_address, settings.don_id);
    let estimator = CostEstimator::new(Arc::new(network));

    let gas_price_wei = match args.gas_price_wei {
        Some(price) => price,
        None => estimator.current_gas_price().await?,
    };
    let estimate = estimator
        .estimate(&EstimateParams {
            don_id: settings.don_id,
            subscription_id: settings.subscription_id,
            callback_gas_limit: args.callback_gas_limit.unwrap_or(settings.callback_gas_limit),
            gas_price_wei,
        })
        .await?;
    let fee = estimate.with_margin(settings.fee_margin_bps);

    let coverage = match estimator.check_subscription(settings.subscription_id, fee).await {
        Ok(info) => json!({ "covered": true, "available_juels": info.available().to_string() }),
        Err(e) => {
            tracing::warn!(error = %e, "Subscription cannot cover the fee.");
            json!({ "covered": false, "reason": e.to_string() })
        }
    };

    let report = json!({
        "subscription_id": settings.subscription_id,
        "estimate": estimate,
        "fee_margin_bps": settings.fee_margin_bps,
        "fee_juels": fee.to_string(),
        "subscription": coverage,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = EstimateArgs::try_parse_from(["estimate", "--gas-price-wei", "1000000000"]).unwrap();
        assert_eq!(args.gas_price_wei, Some(1_000_000_000));
        assert!(args.callback_gas_limit.is_none());
    }
}
