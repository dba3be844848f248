//! A builder for consumer contract logs.

use alloy::{
    primitives::{Address, B256, Bytes, LogData},
    rpc::types::Log,
    sol_types::SolEvent,
};

use crate::providers::contracts::IReasoningConsumer;

/// A builder for creating RPC `Log` instances for testing.
#[derive(Debug, Clone, Default)]
pub struct LogBuilder {
    address: Address,
    data: LogData,
    transaction_hash: Option<B256>,
    block_number: Option<u64>,
    log_index: Option<u64>,
}

impl LogBuilder {
    /// Creates a new `LogBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address of the contract that emitted the log.
    pub fn address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Sets raw topics and data.
    pub fn raw(mut self, topics: Vec<B256>, data: Bytes) -> Self {
        self.data = LogData::new_unchecked(topics, data);
        self
    }

    /// Sets topics and data from a typed event.
    pub fn event<E: SolEvent>(mut self, event: &E) -> Self {
        self.data = event.encode_log_data();
        self
    }

    /// Sets the transaction hash of the log.
    pub fn transaction_hash(mut self, hash: B256) -> Self {
        self.transaction_hash = Some(hash);
        self
    }

    /// Sets the block number of the log.
    pub fn block_number(mut self, number: u64) -> Self {
        self.block_number = Some(number);
        self
    }

    /// Sets the index of the log within its block.
    pub fn log_index(mut self, index: u64) -> Self {
        self.log_index = Some(index);
        self
    }

    /// Builds the log.
    pub fn build(self) -> Log {
        Log {
            inner: alloy::primitives::Log { address: self.address, data: self.data },
            transaction_hash: self.transaction_hash,
            transaction_index: Some(0),
            block_hash: Some(B256::ZERO),
            block_number: self.block_number,
            log_index: self.log_index,
            removed: false,
            block_timestamp: None,
        }
    }
}

/// A `RequestSent` log as emitted by the consumer.
pub fn request_sent_log(consumer: Address, request_id: B256) -> Log {
    LogBuilder::new()
        .address(consumer)
        .event(&IReasoningConsumer::RequestSent { id: request_id })
        .block_number(123)
        .log_index(0)
        .build()
}

/// A `Response` log as emitted by the consumer's fulfillment callback.
pub fn response_log(consumer: Address, request_id: B256, response: Bytes, err: Bytes) -> Log {
    LogBuilder::new()
        .address(consumer)
        .event(&IReasoningConsumer::Response { requestId: request_id, response, err })
        .block_number(130)
        .log_index(1)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_request_sent_log_topics() {
        let consumer = address!("0x0000000000000000000000000000000000000abc");
        let id = B256::repeat_byte(3);
        let log = request_sent_log(consumer, id);

        assert_eq!(log.address(), consumer);
        assert_eq!(log.topics()[0], IReasoningConsumer::RequestSent::SIGNATURE_HASH);
        assert_eq!(log.topics()[1], id);
    }
}
