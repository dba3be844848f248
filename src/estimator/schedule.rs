use std::time::Duration;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EstimateError;

const BPS_DENOMINATOR: u64 = 10_000;

/// 1 LINK = 1e18 juels.
const JUELS_PER_LINK: u64 = 1_000_000_000_000_000_000;

/// The coordinator's live fee parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Premium added to the gas price, in basis points.
    pub gas_price_over_estimation_bps: u32,
    /// Gas the coordinator spends before invoking the callback.
    pub gas_overhead_before_callback: u32,
    /// Gas the coordinator spends after the callback returns.
    pub gas_overhead_after_callback: u32,
    /// Flat fee paid to the node operators, in juels.
    pub don_fee: U256,
    /// Flat fee paid to the router owner, in juels.
    pub admin_fee: U256,
    /// Price of one LINK in wei of the native token.
    pub wei_per_unit_link: U256,
}

impl FeeSchedule {
    /// Cost in juels of settling one request at `gas_price_wei`.
    ///
    /// Non-decreasing in `gas_price_wei` and in `callback_gas_limit`.
    pub fn estimate_cost(
        &self,
        callback_gas_limit: u32,
        gas_price_wei: u128,
    ) -> Result<U256, EstimateError> {
        if gas_price_wei == 0 {
            return Err(EstimateError::ZeroGasPrice);
        }
        if self.wei_per_unit_link.is_zero() {
            return Err(EstimateError::ZeroLinkPrice);
        }

        let gas_price = U256::from(gas_price_wei);
        let adjusted_gas_price = gas_price
            + gas_price * U256::from(self.gas_price_over_estimation_bps)
                / U256::from(BPS_DENOMINATOR);
        let execution_gas = U256::from(self.gas_overhead_before_callback)
            + U256::from(self.gas_overhead_after_callback)
            + U256::from(callback_gas_limit);

        let execution_cost_wei = adjusted_gas_price * execution_gas;
        let execution_cost_juels =
            execution_cost_wei * U256::from(JUELS_PER_LINK) / self.wei_per_unit_link;

        Ok(execution_cost_juels + self.don_fee + self.admin_fee)
    }
}

/// A fee amount together with the conditions it was computed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Estimated fee in juels.
    pub amount_juels: U256,
    /// Gas price the estimate assumed.
    pub gas_price_wei: u128,
    /// Callback gas limit the estimate assumed.
    pub callback_gas_limit: u32,
    /// When the estimate was computed.
    pub computed_at: DateTime<Utc>,
}

impl CostEstimate {
    /// The estimate plus a safety margin of `margin_bps` basis points.
    pub fn with_margin(&self, margin_bps: u32) -> U256 {
        self.amount_juels
            + self.amount_juels * U256::from(margin_bps) / U256::from(BPS_DENOMINATOR)
    }

    /// Whether the estimate should be recomputed before it is used.
    ///
    /// Stale when older than `max_age` or when `current_gas_price_wei` moved
    /// by more than `tolerance_bps` from the assumed price.
    pub fn is_stale(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
        current_gas_price_wei: u128,
        tolerance_bps: u32,
    ) -> bool {
        let age = now.signed_duration_since(self.computed_at);
        let too_old = age.to_std().map(|age| age > max_age).unwrap_or(false);

        let assumed = U256::from(self.gas_price_wei);
        let current = U256::from(current_gas_price_wei);
        let drift = if current > assumed { current - assumed } else { assumed - current };
        let drifted =
            drift * U256::from(BPS_DENOMINATOR) > assumed * U256::from(tolerance_bps);

        too_old || drifted
    }
}
