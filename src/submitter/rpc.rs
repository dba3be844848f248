use alloy::{
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, NetworkWallet, TransactionBuilder},
    primitives::{Address, TxHash},
    providers::{DynProvider, Provider},
};
use async_trait::async_trait;

use super::{ConsumerClient, OnChainRequest, SignedRequest, SubmissionReceipt, SubmitError};
use crate::providers::contracts::IReasoningConsumer;

fn signing_error(step: &str, e: impl std::fmt::Display) -> SubmitError {
    SubmitError::Signing(format!("{step} failed: {e}"))
}

/// [`ConsumerClient`] that signs with a local wallet and broadcasts raw
/// transactions through `provider`.
pub struct RpcConsumerClient {
    provider: DynProvider,
    wallet: EthereumWallet,
    consumer: Address,
}

impl RpcConsumerClient {
    /// Creates a client for the consumer at `consumer`.
    pub fn new(provider: DynProvider, wallet: EthereumWallet, consumer: Address) -> Self {
        Self { provider, wallet, consumer }
    }
}

#[async_trait]
impl ConsumerClient for RpcConsumerClient {
    #[tracing::instrument(skip(self, request), level = "debug")]
    async fn sign_request(&self, request: &OnChainRequest) -> Result<SignedRequest, SubmitError> {
        let sender = NetworkWallet::<alloy::network::Ethereum>::default_signer_address(&self.wallet);
        let tx = IReasoningConsumer::new(self.consumer, &self.provider)
            .execureReasoning(request.encrypted_reference.clone(), request.fee, request.args.clone())
            .into_transaction_request()
            .with_from(sender);

        let chain_id =
            self.provider.get_chain_id().await.map_err(|e| signing_error("eth_chainId", e))?;
        let nonce = self
            .provider
            .get_transaction_count(sender)
            .pending()
            .await
            .map_err(|e| signing_error("eth_getTransactionCount", e))?;
        let gas_limit = self
            .provider
            .estimate_gas(tx.clone())
            .await
            .map_err(|e| signing_error("eth_estimateGas", e))?;
        let fees = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| signing_error("fee estimation", e))?;

        let envelope = tx
            .with_chain_id(chain_id)
            .with_nonce(nonce)
            .with_gas_limit(gas_limit)
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
            .build(&self.wallet)
            .await
            .map_err(|e| SubmitError::Signing(e.to_string()))?;

        let tx_hash = *envelope.tx_hash();
        tracing::debug!(tx_hash = %tx_hash, nonce, gas_limit, "Request signed.");
        Ok(SignedRequest { tx_hash, raw: envelope.encoded_2718().into() })
    }

    #[tracing::instrument(skip(self, signed), fields(tx_hash = %signed.tx_hash), level = "debug")]
    async fn broadcast(&self, signed: &SignedRequest) -> Result<(), SubmitError> {
        self.provider
            .send_raw_transaction(&signed.raw)
            .await
            .map_err(|e| SubmitError::Broadcast(e.to_string()))?;
        Ok(())
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<SubmissionReceipt>, SubmitError> {
        let Some(receipt) = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| SubmitError::Rpc(format!("eth_getTransactionReceipt failed: {e}")))?
        else {
            return Ok(None);
        };

        let request_id = receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.address() == self.consumer)
            .find_map(|log| log.log_decode::<IReasoningConsumer::RequestSent>().ok())
            .map(|log| log.inner.data.id);

        Ok(Some(SubmissionReceipt {
            tx_hash,
            block_number: receipt.block_number.unwrap_or_default(),
            success: receipt.status(),
            request_id,
        }))
    }

    async fn is_known(&self, tx_hash: TxHash) -> Result<bool, SubmitError> {
        let tx = self
            .provider
            .get_transaction_by_hash(tx_hash)
            .await
            .map_err(|e| SubmitError::Rpc(format!("eth_getTransactionByHash failed: {e}")))?;
        Ok(tx.is_some())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{B256, Bytes, U64, U256, address, keccak256};

    use super::*;
    use crate::test_helpers::{ReceiptBuilder, mock_provider, request_sent_log};

    const CONSUMER: Address = address!("0x0000000000000000000000000000000000000abc");

    fn wallet() -> EthereumWallet {
        // Anvil's first default account.
        let signer: alloy::signers::local::PrivateKeySigner =
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".parse().unwrap();
        EthereumWallet::from(signer)
    }

    fn request() -> OnChainRequest {
        OnChainRequest {
            encrypted_reference: Bytes::from_static(&[1]),
            fee: U256::from(1u64),
            args: vec!["1".to_string()],
        }
    }

    fn push_signing_responses(asserter: &alloy::transports::mock::Asserter) {
        asserter.push_success(&U64::from(84_532u64));
        asserter.push_success(&U64::from(7u64));
        asserter.push_success(&U64::from(210_000u64));
        asserter.push_success(&serde_json::json!({
            "oldestBlock": "0x10",
            "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
            "gasUsedRatio": [0.5],
            "reward": [["0x59682f00"]]
        }));
    }

    #[tokio::test]
    async fn test_signed_request_hash_matches_raw_transaction() {
        let (provider, asserter) = mock_provider();
        push_signing_responses(&asserter);

        let client = RpcConsumerClient::new(provider, wallet(), CONSUMER);
        let signed = client.sign_request(&request()).await.unwrap();

        assert_eq!(signed.raw[0], 0x02);
        assert_eq!(signed.tx_hash, keccak256(&signed.raw));
    }

    #[tokio::test]
    async fn test_signing_needs_a_nonce() {
        let (provider, asserter) = mock_provider();
        asserter.push_success(&U64::from(84_532u64));
        asserter.push_failure_msg("header not found");

        let client = RpcConsumerClient::new(provider, wallet(), CONSUMER);
        let err = client.sign_request(&request()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Signing(msg) if msg.contains("eth_getTransactionCount")));
    }

    #[tokio::test]
    async fn test_broadcast_sends_raw_transaction() {
        let (provider, asserter) = mock_provider();
        push_signing_responses(&asserter);
        let client = RpcConsumerClient::new(provider, wallet(), CONSUMER);
        let signed = client.sign_request(&request()).await.unwrap();

        asserter.push_success(&signed.tx_hash);
        client.broadcast(&signed).await.unwrap();

        asserter.push_failure_msg("nonce too low");
        assert!(matches!(client.broadcast(&signed).await, Err(SubmitError::Broadcast(_))));
    }

    #[tokio::test]
    async fn test_receipt_extracts_request_id() {
        let (provider, asserter) = mock_provider();
        let tx = TxHash::repeat_byte(0x42);
        let request_id = B256::repeat_byte(0x07);
        let receipt = ReceiptBuilder::new()
            .transaction_hash(tx)
            .block_number(55)
            .log(request_sent_log(CONSUMER, request_id))
            .build();
        asserter.push_success(&receipt);

        let client = RpcConsumerClient::new(provider, wallet(), CONSUMER);
        let receipt = client.receipt(tx).await.unwrap().unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.block_number, 55);
        assert_eq!(receipt.request_id, Some(request_id));
    }

    #[tokio::test]
    async fn test_receipt_ignores_events_from_other_contracts() {
        let (provider, asserter) = mock_provider();
        let other = address!("0x0000000000000000000000000000000000000def");
        let receipt =
            ReceiptBuilder::new().log(request_sent_log(other, B256::repeat_byte(1))).build();
        asserter.push_success(&receipt);

        let client = RpcConsumerClient::new(provider, wallet(), CONSUMER);
        let receipt = client.receipt(TxHash::ZERO).await.unwrap().unwrap();
        assert_eq!(receipt.request_id, None);
    }

    #[tokio::test]
    async fn test_receipt_pending_and_unknown_transaction() {
        let (provider, asserter) = mock_provider();
        asserter.push_success(&serde_json::Value::Null);
        asserter.push_success(&serde_json::Value::Null);

        let client = RpcConsumerClient::new(provider, wallet(), CONSUMER);
        assert!(client.receipt(TxHash::ZERO).await.unwrap().is_none());
        assert!(!client.is_known(TxHash::ZERO).await.unwrap());
    }
}
