use alloy::primitives::{Address, B256};
use serde::Deserialize;
use url::Url;

use super::{deserialize_address, deserialize_optional_address};

fn default_callback_gas_limit() -> u32 {
    300_000
}

/// Addresses and identifiers of the oracle network a request is sent to.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NetworkConfig {
    /// The oracle router contract. Coordinators and subscriptions are resolved
    /// through it.
    #[serde(deserialize_with = "deserialize_address")]
    pub router_address: Address,

    /// The ERC-20 token fees are paid in.
    #[serde(deserialize_with = "deserialize_address")]
    pub link_token_address: Address,

    /// The consumer contract that accepts requests and receives callbacks.
    #[serde(deserialize_with = "deserialize_address")]
    pub consumer_address: Address,

    /// Optional registry holding the prompt of the consumer's active action.
    #[serde(default, deserialize_with = "deserialize_optional_address")]
    pub action_registry_address: Option<Address>,

    /// Account allowed to pull fee tokens from the wallet. Defaults to the
    /// consumer.
    #[serde(default, deserialize_with = "deserialize_optional_address")]
    pub fee_spender: Option<Address>,

    /// Human-readable DON identifier, e.g. `fun-base-sepolia-1`.
    pub don_id: String,

    /// Billing subscription the consumer is registered under.
    pub subscription_id: u64,

    /// Gas made available to the consumer's fulfillment callback.
    #[serde(default = "default_callback_gas_limit")]
    pub callback_gas_limit: u32,

    /// Block explorer base URL, used only for log output.
    #[serde(default)]
    pub explorer_url: Option<Url>,
}

impl NetworkConfig {
    /// The DON id as the router expects it: UTF-8 bytes, right-padded to 32.
    pub fn don_id_bytes(&self) -> Result<B256, String> {
        don_id_to_bytes32(&self.don_id)
    }

    /// The spender to approve for fee payments.
    pub fn fee_spender(&self) -> Address {
        self.fee_spender.unwrap_or(self.consumer_address)
    }
}

/// Encodes a DON id string as a right-padded `bytes32`.
pub fn don_id_to_bytes32(don_id: &str) -> Result<B256, String> {
    let bytes = don_id.as_bytes();
    if bytes.is_empty() {
        return Err("DON id cannot be empty".to_string());
    }
    if bytes.len() > 32 {
        return Err(format!("DON id '{don_id}' is longer than 32 bytes"));
    }
    let mut out = [0u8; 32];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(B256::from(out))
}
