use std::{sync::Arc, time::Duration};

use alloy::primitives::{B256, TxHash};
use url::Url;

use super::{
    ConsumerClient, OnChainRequest, PendingSubmission, RequestHandle, SubmissionReceipt,
    SubmitError,
};
use crate::persistence::traits::SubmissionLedger;

enum Reconciled {
    Mined(SubmissionReceipt),
    InFlight,
    Dropped,
}

/// Submits requests with reconcile-before-retry semantics.
///
/// Every transaction is recorded in the ledger after signing and before it is
/// broadcast.
/// Submitting the same request again first checks what happened to the
/// recorded broadcast, and only sends a new transaction if it was dropped.
pub struct RequestSubmitter {
    client: Arc<dyn ConsumerClient>,
    ledger: Arc<dyn SubmissionLedger>,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl RequestSubmitter {
    /// Creates a new submitter.
    pub fn new(
        client: Arc<dyn ConsumerClient>,
        ledger: Arc<dyn SubmissionLedger>,
        receipt_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self { client, ledger, receipt_timeout, poll_interval }
    }

    /// Submits `request` and blocks until it is mined or the receipt timeout
    /// elapses.
    ///
    /// Spends the fee once mined, whatever the remote computation later does.
    #[tracing::instrument(skip(self, request, secrets_locator), fields(fee = %request.fee), level = "debug")]
    pub async fn submit(
        &self,
        request: &OnChainRequest,
        secrets_locator: Option<Url>,
    ) -> Result<RequestHandle, SubmitError> {
        let fingerprint = request.fingerprint();

        if let Some(handle) = self.ledger.handle_for_fingerprint(fingerprint).await? {
            tracing::info!(request_id = %handle.request_id, tx_hash = %handle.tx_hash, "Request already mined, reusing handle.");
            return Ok(handle);
        }

        if let Some(pending) = self.ledger.pending(fingerprint).await? {
            tracing::info!(tx_hash = %pending.tx_hash, "Found earlier broadcast, reconciling.");
            match self.reconcile(pending.tx_hash).await? {
                Reconciled::Mined(receipt) => {
                    return self.finish(fingerprint, request, receipt, secrets_locator).await;
                }
                Reconciled::InFlight => {
                    let receipt = self.await_receipt(pending.tx_hash).await?;
                    return self.finish(fingerprint, request, receipt, secrets_locator).await;
                }
                Reconciled::Dropped => {
                    tracing::warn!(tx_hash = %pending.tx_hash, "Earlier broadcast was dropped, resubmitting.");
                    self.ledger.clear_pending(fingerprint).await?;
                }
            }
        }

        let signed = self.client.sign_request(request).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to sign request.");
        })?;
        let tx_hash = signed.tx_hash;

        let pending = PendingSubmission {
            fingerprint,
            tx_hash,
            request: request.clone(),
            secrets_locator: secrets_locator.clone(),
            broadcast_at: chrono::Utc::now(),
        };
        self.ledger.record_pending(&pending).await.inspect_err(|e| {
            tracing::error!(error = %e, tx_hash = %tx_hash, "Could not record broadcast, not sending.");
        })?;

        if let Err(e) = self.client.broadcast(&signed).await {
            tracing::error!(
                error = %e,
                tx_hash = %tx_hash,
                "Broadcast failed. The transaction stays pending until reconciled."
            );
            return Err(e);
        }
        tracing::info!(tx_hash = %tx_hash, "Request broadcast.");

        let receipt = self.await_receipt(tx_hash).await?;
        self.finish(fingerprint, request, receipt, secrets_locator).await
    }

    async fn reconcile(&self, tx_hash: TxHash) -> Result<Reconciled, SubmitError> {
        if let Some(receipt) = self.client.receipt(tx_hash).await? {
            return Ok(Reconciled::Mined(receipt));
        }
        if self.client.is_known(tx_hash).await? {
            return Ok(Reconciled::InFlight);
        }
        Ok(Reconciled::Dropped)
    }

    async fn await_receipt(&self, tx_hash: TxHash) -> Result<SubmissionReceipt, SubmitError> {
        let poll = async {
            loop {
                if let Some(receipt) = self.client.receipt(tx_hash).await? {
                    return Ok::<_, SubmitError>(receipt);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.receipt_timeout, poll).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(tx_hash = %tx_hash, "Receipt not available before timeout.");
                Err(SubmitError::ReceiptTimeout {
                    tx_hash,
                    waited_secs: self.receipt_timeout.as_secs(),
                })
            }
        }
    }

    async fn finish(
        &self,
        fingerprint: B256,
        request: &OnChainRequest,
        receipt: SubmissionReceipt,
        secrets_locator: Option<Url>,
    ) -> Result<RequestHandle, SubmitError> {
        if !receipt.success {
            self.ledger.clear_pending(fingerprint).await?;
            tracing::error!(tx_hash = %receipt.tx_hash, "Request transaction reverted.");
            return Err(SubmitError::Reverted(receipt.tx_hash));
        }
        let Some(request_id) = receipt.request_id else {
            self.ledger.clear_pending(fingerprint).await?;
            return Err(SubmitError::MissingRequestId(receipt.tx_hash));
        };

        let handle = RequestHandle {
            request_id,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            fee_juels: request.fee,
            secrets_locator,
            submitted_at: chrono::Utc::now(),
        };
        self.ledger.record_handle(fingerprint, &handle).await?;

        tracing::info!(
            request_id = %handle.request_id,
            tx_hash = %handle.tx_hash,
            block_number = handle.block_number,
            "Request mined."
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Bytes, U256};

    use super::*;
    use crate::{
        submitter::{MockConsumerClient, SignedRequest},
        test_helpers::InMemoryLedger,
    };

    const TX: TxHash = TxHash::repeat_byte(0xab);
    const REQUEST_ID: B256 = B256::repeat_byte(0x01);

    fn request() -> OnChainRequest {
        OnChainRequest {
            encrypted_reference: Bytes::from_static(&[1, 2, 3]),
            fee: U256::from(500u64),
            args: vec!["111".to_string()],
        }
    }

    fn signed(tx_hash: TxHash) -> SignedRequest {
        SignedRequest { tx_hash, raw: Bytes::from_static(&[0x02, 0xf8]) }
    }

    /// Expects one request signed as `tx_hash` and broadcast successfully.
    fn signing(client: &mut MockConsumerClient, tx_hash: TxHash) {
        client.expect_sign_request().times(1).returning(move |_| Ok(signed(tx_hash)));
        client.expect_broadcast().times(1).returning(|_| Ok(()));
    }

    fn mined(success: bool, request_id: Option<B256>) -> SubmissionReceipt {
        SubmissionReceipt { tx_hash: TX, block_number: 10, success, request_id }
    }

    fn submitter(client: MockConsumerClient, ledger: Arc<InMemoryLedger>) -> RequestSubmitter {
        RequestSubmitter::new(
            Arc::new(client),
            ledger,
            Duration::from_millis(50),
            Duration::from_millis(1),
        )
    }

    fn pending() -> PendingSubmission {
        PendingSubmission {
            fingerprint: request().fingerprint(),
            tx_hash: TX,
            request: request(),
            secrets_locator: None,
            broadcast_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_submit_returns_handle_and_records_it() {
        let mut client = MockConsumerClient::new();
        signing(&mut client, TX);
        client.expect_receipt().returning(|_| Ok(Some(mined(true, Some(REQUEST_ID)))));
        let ledger = Arc::new(InMemoryLedger::default());

        let handle = submitter(client, ledger.clone()).submit(&request(), None).await.unwrap();

        assert_eq!(handle.request_id, REQUEST_ID);
        assert_eq!(handle.tx_hash, TX);
        assert_eq!(handle.fee_juels, U256::from(500u64));
        assert_eq!(ledger.handle(REQUEST_ID).await.unwrap(), Some(handle));
        assert!(ledger.pending(request().fingerprint()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_receipt_timeout_keeps_pending_entry() {
        let mut client = MockConsumerClient::new();
        signing(&mut client, TX);
        client.expect_receipt().returning(|_| Ok(None));
        let ledger = Arc::new(InMemoryLedger::default());

        let err = submitter(client, ledger.clone()).submit(&request(), None).await.unwrap_err();

        assert!(matches!(err, SubmitError::ReceiptTimeout { tx_hash, .. } if tx_hash == TX));
        let recorded = ledger.pending(request().fingerprint()).await.unwrap().unwrap();
        assert_eq!(recorded.tx_hash, TX);
    }

    #[tokio::test]
    async fn test_resubmit_after_timeout_reconciles_instead_of_sending() {
        let ledger = Arc::new(InMemoryLedger::default());
        ledger.record_pending(&pending()).await.unwrap();

        let mut client = MockConsumerClient::new();
        client.expect_sign_request().never();
        client.expect_broadcast().never();
        client.expect_receipt().returning(|_| Ok(Some(mined(true, Some(REQUEST_ID)))));

        let handle = submitter(client, ledger).submit(&request(), None).await.unwrap();
        assert_eq!(handle.tx_hash, TX);
        assert_eq!(handle.request_id, REQUEST_ID);
    }

    #[tokio::test]
    async fn test_in_flight_broadcast_is_awaited_not_resent() {
        let ledger = Arc::new(InMemoryLedger::default());
        ledger.record_pending(&pending()).await.unwrap();

        let mut client = MockConsumerClient::new();
        client.expect_sign_request().never();
        client.expect_broadcast().never();
        let mut calls = 0;
        client.expect_receipt().returning(move |_| {
            calls += 1;
            Ok((calls > 2).then(|| mined(true, Some(REQUEST_ID))))
        });
        client.expect_is_known().times(1).returning(|_| Ok(true));

        let handle = submitter(client, ledger).submit(&request(), None).await.unwrap();
        assert_eq!(handle.tx_hash, TX);
    }

    #[tokio::test]
    async fn test_dropped_broadcast_is_resent() {
        let ledger = Arc::new(InMemoryLedger::default());
        ledger.record_pending(&pending()).await.unwrap();
        let new_tx = TxHash::repeat_byte(0xcd);

        let mut client = MockConsumerClient::new();
        client.expect_is_known().returning(|_| Ok(false));
        signing(&mut client, new_tx);
        client.expect_receipt().returning(move |tx| {
            Ok((tx == new_tx).then(|| SubmissionReceipt {
                tx_hash: new_tx,
                block_number: 11,
                success: true,
                request_id: Some(REQUEST_ID),
            }))
        });

        let handle = submitter(client, ledger).submit(&request(), None).await.unwrap();
        assert_eq!(handle.tx_hash, new_tx);
    }

    #[tokio::test]
    async fn test_already_mined_request_is_not_resent() {
        let ledger = Arc::new(InMemoryLedger::default());
        let mut client = MockConsumerClient::new();
        signing(&mut client, TX);
        client.expect_receipt().returning(|_| Ok(Some(mined(true, Some(REQUEST_ID)))));
        let submitter = submitter(client, ledger);

        let first = submitter.submit(&request(), None).await.unwrap();
        let second = submitter.submit(&request(), None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_reverted_transaction() {
        let mut client = MockConsumerClient::new();
        signing(&mut client, TX);
        client.expect_receipt().returning(|_| Ok(Some(mined(false, None))));
        let ledger = Arc::new(InMemoryLedger::default());

        let err = submitter(client, ledger.clone()).submit(&request(), None).await.unwrap_err();
        assert!(matches!(err, SubmitError::Reverted(tx) if tx == TX));
        assert!(ledger.pending(request().fingerprint()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_request_id() {
        let mut client = MockConsumerClient::new();
        signing(&mut client, TX);
        client.expect_receipt().returning(|_| Ok(Some(mined(true, None))));

        let err = submitter(client, Arc::new(InMemoryLedger::default()))
            .submit(&request(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::MissingRequestId(tx) if tx == TX));
    }

    #[tokio::test]
    async fn test_failed_broadcast_that_landed_is_reconciled_not_resent() {
        let ledger = Arc::new(InMemoryLedger::default());

        // The node accepted the transaction but the broadcast call timed out.
        let mut client = MockConsumerClient::new();
        client.expect_sign_request().times(1).returning(|_| Ok(signed(TX)));
        client
            .expect_broadcast()
            .times(1)
            .returning(|_| Err(SubmitError::Broadcast("request timed out".to_string())));
        let err = submitter(client, ledger.clone()).submit(&request(), None).await.unwrap_err();

        assert!(matches!(err, SubmitError::Broadcast(_)));
        let recorded = ledger.pending(request().fingerprint()).await.unwrap().unwrap();
        assert_eq!(recorded.tx_hash, TX);

        let mut client = MockConsumerClient::new();
        client.expect_sign_request().never();
        client.expect_broadcast().never();
        client.expect_receipt().returning(|_| Ok(Some(mined(true, Some(REQUEST_ID)))));
        let handle = submitter(client, ledger.clone()).submit(&request(), None).await.unwrap();

        assert_eq!(handle.tx_hash, TX);
        assert!(ledger.pending(request().fingerprint()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signing_failure_records_nothing() {
        let mut client = MockConsumerClient::new();
        client
            .expect_sign_request()
            .returning(|_| Err(SubmitError::Signing("insufficient funds for gas".to_string())));
        client.expect_broadcast().never();
        let ledger = Arc::new(InMemoryLedger::default());

        let err = submitter(client, ledger.clone()).submit(&request(), None).await.unwrap_err();
        assert!(matches!(err, SubmitError::Signing(_)));
        assert!(ledger.pending(request().fingerprint()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unrecorded_transaction_is_not_broadcast() {
        let mut ledger = crate::persistence::traits::MockSubmissionLedger::new();
        ledger.expect_handle_for_fingerprint().returning(|_| Ok(None));
        ledger.expect_pending().returning(|_| Ok(None));
        ledger.expect_record_pending().returning(|_| {
            Err(crate::persistence::error::PersistenceError::OperationFailed("disk full".to_string()))
        });
        let mut client = MockConsumerClient::new();
        client.expect_sign_request().returning(|_| Ok(signed(TX)));
        client.expect_broadcast().never();

        let submitter = RequestSubmitter::new(
            Arc::new(client),
            Arc::new(ledger),
            Duration::from_millis(50),
            Duration::from_millis(1),
        );
        let err = submitter.submit(&request(), None).await.unwrap_err();
        assert!(matches!(err, SubmitError::Ledger(_)));
    }
}
