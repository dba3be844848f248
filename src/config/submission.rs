use std::time::Duration;

use serde::Deserialize;

use super::{deserialize_duration_from_ms, deserialize_duration_from_seconds};

fn default_receipt_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_receipt_poll_interval() -> Duration {
    Duration::from_millis(2000)
}

fn default_fee_margin_bps() -> u32 {
    1_000
}

fn default_estimate_max_age() -> Duration {
    Duration::from_secs(60)
}

fn default_gas_price_tolerance_bps() -> u32 {
    500
}

fn default_listener_poll_interval() -> Duration {
    Duration::from_millis(4000)
}

fn default_listener_timeout() -> Duration {
    Duration::from_secs(300)
}

/// Settings for submitting a request on-chain.
#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// How long to wait for the request transaction to be mined.
    #[serde(
        rename = "receipt_timeout_secs",
        default = "default_receipt_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub receipt_timeout: Duration,

    /// Interval between receipt lookups while waiting for inclusion.
    #[serde(
        rename = "receipt_poll_interval_ms",
        default = "default_receipt_poll_interval",
        deserialize_with = "deserialize_duration_from_ms"
    )]
    pub receipt_poll_interval: Duration,

    /// Safety margin added on top of the estimated fee, in basis points.
    #[serde(default = "default_fee_margin_bps")]
    pub fee_margin_bps: u32,

    /// An estimate older than this is recomputed right before submission.
    #[serde(
        rename = "estimate_max_age_secs",
        default = "default_estimate_max_age",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub estimate_max_age: Duration,

    /// A gas price move larger than this (basis points) invalidates an estimate.
    #[serde(default = "default_gas_price_tolerance_bps")]
    pub gas_price_tolerance_bps: u32,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            receipt_timeout: default_receipt_timeout(),
            receipt_poll_interval: default_receipt_poll_interval(),
            fee_margin_bps: default_fee_margin_bps(),
            estimate_max_age: default_estimate_max_age(),
            gas_price_tolerance_bps: default_gas_price_tolerance_bps(),
        }
    }
}

/// Settings for waiting on the fulfillment callback.
#[derive(Debug, Deserialize, Clone)]
pub struct ListenerConfig {
    /// Interval between log queries.
    #[serde(
        rename = "poll_interval_ms",
        default = "default_listener_poll_interval",
        deserialize_with = "deserialize_duration_from_ms"
    )]
    pub poll_interval: Duration,

    /// Default deadline for a callback to arrive.
    #[serde(
        rename = "timeout_secs",
        default = "default_listener_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self { poll_interval: default_listener_poll_interval(), timeout: default_listener_timeout() }
    }
}
