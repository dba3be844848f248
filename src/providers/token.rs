//! LINK allowance management.

use alloy::{
    primitives::{Address, TxHash, U256},
    providers::DynProvider,
};

use super::contracts::IERC20;

/// Errors raised while approving the fee spender.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// Reading the balance failed.
    #[error("Failed to read LINK balance: {0}")]
    Balance(String),

    /// The approval transaction failed to send or mine.
    #[error("Approval transaction failed: {0}")]
    Transaction(String),

    /// The approval transaction was mined but reverted.
    #[error("Approval transaction {0} reverted")]
    Reverted(TxHash),
}

/// Result of a successful approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    /// Amount approved, equal to the owner's balance at the time.
    pub amount: U256,
    /// Hash of the approval transaction.
    pub tx_hash: TxHash,
}

/// Approves `spender` for the owner's entire LINK balance.
///
/// `provider` must sign for `owner`.
#[tracing::instrument(skip(provider), level = "debug")]
pub async fn approve_full_balance(
    provider: &DynProvider,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<Approval, ApprovalError> {
    let link = IERC20::new(token, provider);
    let amount = link
        .balanceOf(owner)
        .call()
        .await
        .map_err(|e| ApprovalError::Balance(e.to_string()))?;
    tracing::debug!(amount = %amount, "LINK balance read.");

    let receipt = link
        .approve(spender, amount)
        .send()
        .await
        .map_err(|e| ApprovalError::Transaction(e.to_string()))?
        .get_receipt()
        .await
        .map_err(|e| ApprovalError::Transaction(e.to_string()))?;

    if !receipt.status() {
        return Err(ApprovalError::Reverted(receipt.transaction_hash));
    }
    tracing::info!(tx_hash = %receipt.transaction_hash, amount = %amount, spender = %spender, "LINK approved.");
    Ok(Approval { amount, tx_hash: receipt.transaction_hash })
}
