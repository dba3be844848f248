//! A builder for creating `TransactionReceipt` instances for testing.

use alloy::{
    consensus::{Eip658Value, Receipt, ReceiptEnvelope, ReceiptWithBloom},
    primitives::{Address, B256, Bloom},
    rpc::types::{Log, TransactionReceipt},
};

/// A builder for creating `TransactionReceipt` instances for testing.
#[derive(Debug, Clone)]
pub struct ReceiptBuilder {
    transaction_hash: B256,
    block_number: u64,
    success: bool,
    logs: Vec<Log>,
}

impl Default for ReceiptBuilder {
    fn default() -> Self {
        Self { transaction_hash: B256::ZERO, block_number: 123, success: true, logs: Vec::new() }
    }
}

impl ReceiptBuilder {
    /// Creates a new `ReceiptBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transaction hash for the receipt.
    pub fn transaction_hash(mut self, hash: B256) -> Self {
        self.transaction_hash = hash;
        self
    }

    /// Sets the block the transaction was mined in.
    pub fn block_number(mut self, number: u64) -> Self {
        self.block_number = number;
        self
    }

    /// Marks the transaction as reverted.
    pub fn reverted(mut self) -> Self {
        self.success = false;
        self
    }

    /// Adds a log to the receipt.
    pub fn log(mut self, log: Log) -> Self {
        self.logs.push(log);
        self
    }

    /// Builds the `TransactionReceipt`.
    pub fn build(self) -> TransactionReceipt {
        let receipt = Receipt {
            status: Eip658Value::Eip658(self.success),
            cumulative_gas_used: 21_000,
            logs: self.logs,
        };
        TransactionReceipt {
            transaction_hash: self.transaction_hash,
            block_number: Some(self.block_number),
            transaction_index: Some(1),
            block_hash: Some(B256::default()),
            from: Address::default(),
            to: Some(Address::default()),
            gas_used: 21_000,
            contract_address: None,
            effective_gas_price: 1_000_000_000,
            blob_gas_used: None,
            blob_gas_price: None,
            inner: ReceiptEnvelope::Eip1559(ReceiptWithBloom {
                receipt,
                logs_bloom: Bloom::default(),
            }),
        }
    }
}
