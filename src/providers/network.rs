//! Read access to the oracle network's on-chain state.

use alloy::{
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider},
};
use async_trait::async_trait;

use super::contracts::{IActionRegistry, IFunctionsCoordinator, IFunctionsRouter, IReasoningConsumer};
use crate::{
    estimator::{EstimateError, FeeSchedule, FeeSource, SubscriptionInfo},
    secrets::{EncryptionKeySource, EncryptionKeys, PublishError},
};

/// Reads fee, subscription and key material through the router.
///
/// The coordinator is resolved from the router for every read, so a DON
/// migration between reads is picked up.
pub struct OnChainNetwork {
    provider: DynProvider,
    router: Address,
    don_id: B256,
}

impl OnChainNetwork {
    /// Creates a reader for the DON `don_id` registered at `router`.
    pub fn new(provider: DynProvider, router: Address, don_id: B256) -> Self {
        Self { provider, router, don_id }
    }

    /// Resolves the coordinator serving `don_id`.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn coordinator(&self, don_id: B256) -> Result<Address, String> {
        let router = IFunctionsRouter::new(self.router, &self.provider);
        let coordinator = router
            .getContractById(don_id)
            .call()
            .await
            .map_err(|e| format!("getContractById failed: {e}"))?;
        if coordinator.is_zero() {
            return Err(format!("no coordinator registered for DON {don_id}"));
        }
        tracing::debug!(coordinator = %coordinator, "Coordinator resolved.");
        Ok(coordinator)
    }

    /// Reads the prompt configured for `consumer` in the action registry.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn action_prompt(&self, consumer: Address, registry: Address) -> Result<String, String> {
        let action_id = IReasoningConsumer::new(consumer, &self.provider)
            .aiActionId()
            .call()
            .await
            .map_err(|e| format!("aiActionId failed: {e}"))?;
        let action = IActionRegistry::new(registry, &self.provider)
            .getAction(action_id)
            .call()
            .await
            .map_err(|e| format!("getAction({action_id}) failed: {e}"))?;
        tracing::debug!(action_id = %action_id, name = %action.name, "Action prompt loaded.");
        Ok(action.prompt)
    }
}

#[async_trait]
impl FeeSource for OnChainNetwork {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn fee_schedule(&self, don_id: B256) -> Result<FeeSchedule, EstimateError> {
        let address = self.coordinator(don_id).await.map_err(EstimateError::Source)?;
        let coordinator = IFunctionsCoordinator::new(address, &self.provider);

        let config = coordinator
            .getConfig()
            .call()
            .await
            .map_err(|e| EstimateError::Source(format!("getConfig failed: {e}")))?;
        let wei_per_unit_link = coordinator
            .getWeiPerUnitLink()
            .call()
            .await
            .map_err(|e| EstimateError::Source(format!("getWeiPerUnitLink failed: {e}")))?;
        let admin_fee = coordinator
            .getAdminFee()
            .call()
            .await
            .map_err(|e| EstimateError::Source(format!("getAdminFee failed: {e}")))?;

        Ok(FeeSchedule {
            gas_price_over_estimation_bps: config.fulfillmentGasPriceOverEstimationBP,
            gas_overhead_before_callback: config.gasOverheadBeforeCallback,
            gas_overhead_after_callback: config.gasOverheadAfterCallback,
            don_fee: U256::from(config.donFee),
            admin_fee: U256::from(admin_fee),
            wei_per_unit_link,
        })
    }

    async fn gas_price(&self) -> Result<u128, EstimateError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| EstimateError::Source(format!("eth_gasPrice failed: {e}")))
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn subscription(&self, subscription_id: u64) -> Result<SubscriptionInfo, EstimateError> {
        let subscription = IFunctionsRouter::new(self.router, &self.provider)
            .getSubscription(subscription_id)
            .call()
            .await
            .map_err(|e| EstimateError::Source(format!("getSubscription failed: {e}")))?;
        Ok(SubscriptionInfo {
            owner: subscription.owner,
            balance: U256::from(subscription.balance),
            blocked_balance: U256::from(subscription.blockedBalance),
        })
    }
}

#[async_trait]
impl EncryptionKeySource for OnChainNetwork {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn encryption_keys(&self) -> Result<EncryptionKeys, PublishError> {
        let address = self.coordinator(self.don_id).await.map_err(PublishError::Keys)?;
        let coordinator = IFunctionsCoordinator::new(address, &self.provider);

        let threshold = coordinator
            .getThresholdPublicKey()
            .call()
            .await
            .map_err(|e| PublishError::Keys(format!("getThresholdPublicKey failed: {e}")))?;
        let don = coordinator
            .getDONPublicKey()
            .call()
            .await
            .map_err(|e| PublishError::Keys(format!("getDONPublicKey failed: {e}")))?;

        Ok(EncryptionKeys::from_raw(&threshold, &don)?)
    }
}
