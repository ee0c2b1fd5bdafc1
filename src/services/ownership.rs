// Cascading ownership transfer, the terminal step of admin deletion.

use serde::Serialize;

use crate::database::store::{AdminTransaction, StoreError};
use crate::types::AdminId;

/// Row counts of a completed transfer, for the audit record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub customers: u64,
    pub domains: u64,
    pub api_keys_removed: u64,
    pub api_keys_reassigned: u64,
}

pub struct OwnershipTransfer;

impl OwnershipTransfer {
    /// Reassign everything `from` owned to `to`, inside the caller's open
    /// transaction. Admin-level API keys die with the account; keys scoped
    /// to a customer follow their customer to the successor.
    pub async fn transfer(
        tx: &mut dyn AdminTransaction,
        from: AdminId,
        to: AdminId,
    ) -> Result<TransferSummary, StoreError> {
        let customers = tx.reassign_customers(from, to).await?;
        let domains = tx.reassign_domains(from, to).await?;
        let api_keys_removed = tx.delete_admin_api_keys(from).await?;
        let api_keys_reassigned = tx.reassign_api_keys(from, to).await?;

        Ok(TransferSummary {
            customers,
            domains,
            api_keys_removed,
            api_keys_reassigned,
        })
    }
}
