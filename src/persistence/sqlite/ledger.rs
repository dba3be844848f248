//! Submission ledger over the key/value table.

use alloy::primitives::B256;
use async_trait::async_trait;

use super::{FINGERPRINT_PREFIX, HANDLE_PREFIX, PENDING_PREFIX, SqliteStateRepository};
use crate::{
    persistence::{
        error::PersistenceError,
        traits::{KeyValueStore, SubmissionLedger},
    },
    submitter::{PendingSubmission, RequestHandle},
};

fn pending_key(fingerprint: B256) -> String {
    format!("{PENDING_PREFIX}{fingerprint}")
}

fn handle_key(request_id: B256) -> String {
    format!("{HANDLE_PREFIX}{request_id}")
}

fn fingerprint_key(fingerprint: B256) -> String {
    format!("{FINGERPRINT_PREFIX}{fingerprint}")
}

#[async_trait]
impl SubmissionLedger for SqliteStateRepository {
    async fn pending(&self, fingerprint: B256) -> Result<Option<PendingSubmission>, PersistenceError> {
        self.get_json_state(&pending_key(fingerprint)).await
    }

    #[tracing::instrument(skip(self, pending), fields(tx_hash = %pending.tx_hash), level = "debug")]
    async fn record_pending(&self, pending: &PendingSubmission) -> Result<(), PersistenceError> {
        self.set_json_state(&pending_key(pending.fingerprint), pending).await?;
        // A lost pending record means a second payment after a crash.
        self.flush().await
    }

    async fn clear_pending(&self, fingerprint: B256) -> Result<(), PersistenceError> {
        self.delete_json_state(&pending_key(fingerprint)).await
    }

    async fn pending_all(&self) -> Result<Vec<PendingSubmission>, PersistenceError> {
        let mut pending: Vec<PendingSubmission> = self
            .get_all_json_states_by_prefix(PENDING_PREFIX)
            .await?
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        pending.sort_by_key(|p| p.broadcast_at);
        Ok(pending)
    }

    #[tracing::instrument(skip(self, handle), fields(request_id = %handle.request_id), level = "debug")]
    async fn record_handle(
        &self,
        fingerprint: B256,
        handle: &RequestHandle,
    ) -> Result<(), PersistenceError> {
        let handle_json = serde_json::to_string(handle)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;
        let id_json = serde_json::to_string(&handle.request_id)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

        let mut tx = self
            .execute_query_with_error_handling("begin ledger transaction", self.pool.begin())
            .await?;
        let upsert = "INSERT OR REPLACE INTO application_state (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)";
        self.execute_query_with_error_handling(
            "record handle",
            sqlx::query(upsert).bind(handle_key(handle.request_id)).bind(handle_json).execute(&mut *tx),
        )
        .await?;
        self.execute_query_with_error_handling(
            "record fingerprint",
            sqlx::query(upsert).bind(fingerprint_key(fingerprint)).bind(id_json).execute(&mut *tx),
        )
        .await?;
        self.execute_query_with_error_handling(
            "clear pending",
            sqlx::query("DELETE FROM application_state WHERE key = ?")
                .bind(pending_key(fingerprint))
                .execute(&mut *tx),
        )
        .await?;
        self.execute_query_with_error_handling("commit ledger transaction", tx.commit()).await?;

        tracing::debug!("Request handle recorded.");
        Ok(())
    }

    async fn handle_for_fingerprint(
        &self,
        fingerprint: B256,
    ) -> Result<Option<RequestHandle>, PersistenceError> {
        match self.get_json_state::<B256>(&fingerprint_key(fingerprint)).await? {
            Some(request_id) => self.handle(request_id).await,
            None => Ok(None),
        }
    }

    async fn handle(&self, request_id: B256) -> Result<Option<RequestHandle>, PersistenceError> {
        self.get_json_state(&handle_key(request_id)).await
    }

    async fn handles(&self) -> Result<Vec<RequestHandle>, PersistenceError> {
        let mut handles: Vec<RequestHandle> = self
            .get_all_json_states_by_prefix(HANDLE_PREFIX)
            .await?
            .into_iter()
            .map(|(_, handle)| handle)
            .collect();
        handles.sort_by_key(|h| (h.block_number, h.submitted_at));
        Ok(handles)
    }
}
