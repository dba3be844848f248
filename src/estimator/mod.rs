//! Settlement cost estimation.

mod schedule;

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

pub use schedule::{CostEstimate, FeeSchedule};

/// Errors raised while estimating or checking fees.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// The gas price read from the chain was zero.
    #[error("Gas price must be non-zero")]
    ZeroGasPrice,

    /// The coordinator reported a zero LINK price.
    #[error("LINK price feed returned zero")]
    ZeroLinkPrice,

    /// Reading fee state from the network failed.
    #[error("Failed to read fee state: {0}")]
    Source(String),

    /// The subscription does not exist.
    #[error("Subscription {0} does not exist")]
    UnknownSubscription(u64),

    /// The subscription cannot cover the fee.
    #[error("Subscription {subscription_id} has {available} juels available, {required} required")]
    InsufficientBalance {
        /// Subscription checked.
        subscription_id: u64,
        /// Balance not reserved by in-flight requests.
        available: U256,
        /// Margin-adjusted fee.
        required: U256,
    },
}

/// Billing state of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    /// Owner of the subscription; zero when it does not exist.
    pub owner: Address,
    /// Total balance in juels.
    pub balance: U256,
    /// Balance reserved by in-flight requests.
    pub blocked_balance: U256,
}

impl SubscriptionInfo {
    /// Balance that new requests can draw on.
    pub fn available(&self) -> U256 {
        self.balance.saturating_sub(self.blocked_balance)
    }
}

/// Parameters of a single estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateParams {
    /// DON id as bytes32.
    pub don_id: B256,
    /// Subscription paying for the request.
    pub subscription_id: u64,
    /// Gas reserved for the consumer callback.
    pub callback_gas_limit: u32,
    /// Gas price to estimate against.
    pub gas_price_wei: u128,
}

/// Live network state the estimator reads.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FeeSource: Send + Sync {
    /// Current fee parameters of the DON's coordinator.
    async fn fee_schedule(&self, don_id: B256) -> Result<FeeSchedule, EstimateError>;

    /// Current network gas price in wei.
    async fn gas_price(&self) -> Result<u128, EstimateError>;

    /// Billing state of a subscription.
    async fn subscription(&self, subscription_id: u64) -> Result<SubscriptionInfo, EstimateError>;
}

/// Computes request fees from live network state.
pub struct CostEstimator {
    source: Arc<dyn FeeSource>,
}

impl CostEstimator {
    /// Creates a new estimator.
    pub fn new(source: Arc<dyn FeeSource>) -> Self {
        Self { source }
    }

    /// Estimates the fee for `params`. Reads state, writes nothing.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn estimate(&self, params: &EstimateParams) -> Result<CostEstimate, EstimateError> {
        let schedule = self.source.fee_schedule(params.don_id).await?;
        let amount_juels = schedule.estimate_cost(params.callback_gas_limit, params.gas_price_wei)?;

        tracing::debug!(
            subscription_id = params.subscription_id,
            gas_price_wei = params.gas_price_wei,
            amount_juels = %amount_juels,
            "Fee estimated."
        );
        Ok(CostEstimate {
            amount_juels,
            gas_price_wei: params.gas_price_wei,
            callback_gas_limit: params.callback_gas_limit,
            computed_at: chrono::Utc::now(),
        })
    }

    /// Reads the current gas price and estimates against it.
    pub async fn estimate_now(
        &self,
        don_id: B256,
        subscription_id: u64,
        callback_gas_limit: u32,
    ) -> Result<CostEstimate, EstimateError> {
        let gas_price_wei = self.source.gas_price().await?;
        self.estimate(&EstimateParams { don_id, subscription_id, callback_gas_limit, gas_price_wei })
            .await
    }

    /// Current network gas price in wei.
    pub async fn current_gas_price(&self) -> Result<u128, EstimateError> {
        self.source.gas_price().await
    }

    /// Fails unless the subscription exists and can cover `required` juels.
    ///
    /// Advisory only: concurrent submissions against the same subscription
    /// may still race between this read and the spend.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn check_subscription(
        &self,
        subscription_id: u64,
        required: U256,
    ) -> Result<SubscriptionInfo, EstimateError> {
        let info = self.source.subscription(subscription_id).await?;
        if info.owner.is_zero() {
            return Err(EstimateError::UnknownSubscription(subscription_id));
        }
        let available = info.available();
        if available < required {
            tracing::warn!(subscription_id, available = %available, required = %required, "Subscription balance too low.");
            return Err(EstimateError::InsufficientBalance { subscription_id, available, required });
        }
        Ok(info)
    }
}
