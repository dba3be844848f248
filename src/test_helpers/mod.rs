//! A set of helpers for testing

mod chain;
mod http_client;
mod ledger;
mod log;
mod provider;
mod receipt;
mod sandbox;
mod secrets;

pub use chain::{FakeConsumerClient, FakeListener, FixedFeeSource, flat_fee_schedule};
pub use http_client::{create_non_retrying_http_client, create_test_http_client};
pub use ledger::InMemoryLedger;
pub use log::{LogBuilder, request_sent_log, response_log};
pub use provider::mock_provider;
pub use receipt::ReceiptBuilder;
pub use sandbox::ScriptedCapabilities;
pub use secrets::{InMemorySecretStore, StaticKeySource, test_decryption_keys, test_secrets};
