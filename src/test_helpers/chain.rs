//! Chain-side fakes: fee source, consumer contract and callback listener.

use std::{collections::HashMap, time::Duration};

use alloy::primitives::{Address, B256, Bytes, TxHash, U256, keccak256};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    estimator::{EstimateError, FeeSchedule, FeeSource, SubscriptionInfo},
    listener::{ListenerError, RequestResult, ResultListener},
    submitter::{
        ConsumerClient, OnChainRequest, RequestHandle, SignedRequest, SubmissionReceipt, SubmitError,
    },
};

/// A fee schedule where the fee is `gas_price * callback_gas_limit` juels.
pub fn flat_fee_schedule() -> FeeSchedule {
    FeeSchedule {
        gas_price_over_estimation_bps: 0,
        gas_overhead_before_callback: 0,
        gas_overhead_after_callback: 0,
        don_fee: U256::ZERO,
        admin_fee: U256::ZERO,
        wei_per_unit_link: U256::from(1_000_000_000_000_000_000u64),
    }
}

/// A [`FeeSource`] with a fixed schedule, gas price and subscription balance.
pub struct FixedFeeSource {
    /// Schedule returned for every DON.
    pub schedule: FeeSchedule,
    /// Gas price in wei.
    pub gas_price_wei: u128,
    /// Balance of every existing subscription.
    pub balance: U256,
}

#[async_trait]
impl FeeSource for FixedFeeSource {
    async fn fee_schedule(&self, _don_id: B256) -> Result<FeeSchedule, EstimateError> {
        Ok(self.schedule.clone())
    }

    async fn gas_price(&self) -> Result<u128, EstimateError> {
        Ok(self.gas_price_wei)
    }

    async fn subscription(&self, _subscription_id: u64) -> Result<SubscriptionInfo, EstimateError> {
        Ok(SubscriptionInfo {
            owner: Address::repeat_byte(0x0f),
            balance: self.balance,
            blocked_balance: U256::ZERO,
        })
    }
}

/// A [`ConsumerClient`] that mines every broadcast immediately.
///
/// The request id of a request is `keccak256(fingerprint)`.
#[derive(Default)]
pub struct FakeConsumerClient {
    signed: Mutex<HashMap<TxHash, OnChainRequest>>,
    sent: Mutex<Vec<(TxHash, OnChainRequest)>>,
}

impl FakeConsumerClient {
    /// Every request broadcast so far, in order.
    pub async fn sent(&self) -> Vec<OnChainRequest> {
        self.sent.lock().await.iter().map(|(_, r)| r.clone()).collect()
    }

    /// The request id the fake assigns to `request`.
    pub fn request_id_for(request: &OnChainRequest) -> B256 {
        keccak256(request.fingerprint())
    }
}

#[async_trait]
impl ConsumerClient for FakeConsumerClient {
    async fn sign_request(&self, request: &OnChainRequest) -> Result<SignedRequest, SubmitError> {
        let mut signed = self.signed.lock().await;
        let raw = Bytes::from((signed.len() as u64).to_be_bytes().to_vec());
        let tx_hash = keccak256(&raw);
        signed.insert(tx_hash, request.clone());
        Ok(SignedRequest { tx_hash, raw })
    }

    async fn broadcast(&self, signed: &SignedRequest) -> Result<(), SubmitError> {
        let request = self.signed.lock().await.get(&signed.tx_hash).cloned().ok_or_else(|| {
            SubmitError::Broadcast(format!("unknown transaction {}", signed.tx_hash))
        })?;
        self.sent.lock().await.push((signed.tx_hash, request));
        Ok(())
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<SubmissionReceipt>, SubmitError> {
        let sent = self.sent.lock().await;
        Ok(sent.iter().position(|(hash, _)| *hash == tx_hash).map(|index| SubmissionReceipt {
            tx_hash,
            block_number: 100 + index as u64,
            success: true,
            request_id: Some(Self::request_id_for(&sent[index].1)),
        }))
    }

    async fn is_known(&self, tx_hash: TxHash) -> Result<bool, SubmitError> {
        Ok(self.sent.lock().await.iter().any(|(hash, _)| *hash == tx_hash))
    }
}

/// A [`ResultListener`] that returns results delivered to it with
/// [`FakeListener::deliver`] and times out otherwise.
#[derive(Default)]
pub struct FakeListener {
    results: Mutex<HashMap<B256, RequestResult>>,
}

impl FakeListener {
    /// Makes `result` observable.
    pub async fn deliver(&self, result: RequestResult) {
        self.results.lock().await.insert(result.request_id, result);
    }
}

#[async_trait]
impl ResultListener for FakeListener {
    async fn await_result(
        &self,
        handle: &RequestHandle,
        timeout: Duration,
    ) -> Result<RequestResult, ListenerError> {
        self.results.lock().await.get(&handle.request_id).cloned().ok_or(ListenerError::Timeout {
            request_id: handle.request_id,
            waited_secs: timeout.as_secs(),
        })
    }
}
