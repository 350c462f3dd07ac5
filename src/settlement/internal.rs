//! Internal Transfer Coordinator
//!
//! Ledger-only transfer between two platform accounts. The debit and credit
//! are separate ledger calls, but the pair must appear atomic to observers:
//! a failed credit triggers a compensating credit of the sender before the
//! failure is reported.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::TransferError;
use super::reconciliation::{
    AlertSink, ReconciliationQueue, ReconciliationReason, ReconciliationRecord,
};
use super::store::AttemptId;
use crate::core_types::{AccountId, Receiver, TxKind};
use crate::ledger::{BalanceLedger, LedgerError};
use crate::recorder::{NewRecord, RecordStatus, TransactionRecorder};

/// Successful internal transfer summary.
#[derive(Debug, Clone)]
pub struct InternalTransferOutcome {
    pub record_id: i64,
    pub receiver: AccountId,
    pub amount: u64,
    /// Sender balance after the debit.
    pub sender_balance: u64,
}

pub struct InternalTransferCoordinator {
    ledger: Arc<dyn BalanceLedger>,
    recorder: Arc<dyn TransactionRecorder>,
    reconciliation: Arc<dyn ReconciliationQueue>,
    alerts: Arc<dyn AlertSink>,
}

impl InternalTransferCoordinator {
    pub fn new(
        ledger: Arc<dyn BalanceLedger>,
        recorder: Arc<dyn TransactionRecorder>,
        reconciliation: Arc<dyn ReconciliationQueue>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            ledger,
            recorder,
            reconciliation,
            alerts,
        }
    }

    /// Transfer `amount` scaled units from `sender` to the account resolved
    /// by `receiver_email`.
    pub async fn transfer(
        &self,
        sender: AccountId,
        receiver_email: &str,
        amount: u64,
    ) -> Result<InternalTransferOutcome, TransferError> {
        // Re-validate critical parameters even though the API layer parses
        // amounts; internal callers must not bypass the checks.
        if amount == 0 {
            return Err(TransferError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let receiver = self
            .ledger
            .lookup_by_email(receiver_email)
            .await?
            .ok_or(TransferError::ReceiverNotFound)?;

        if receiver == sender {
            return Err(TransferError::Validation(
                "Sender and receiver cannot be the same account".to_string(),
            ));
        }

        let sender_account = self.ledger.account(sender).await?;
        let receiver_account = self
            .ledger
            .account(receiver)
            .await
            .map_err(|e| match e {
                LedgerError::AccountNotFound(_) => TransferError::ReceiverNotFound,
                other => other.into(),
            })?;

        if sender_account.currency != receiver_account.currency {
            return Err(TransferError::CurrencyMismatch);
        }

        // Debit first: the only step that can fail on balance grounds.
        let sender_balance = self.ledger.debit(sender, amount).await?;

        // Credit; on failure the debited funds must be restored before the
        // failure is reported.
        if let Err(credit_err) = self.ledger.credit(receiver, amount).await {
            warn!(
                %sender,
                %receiver,
                amount,
                error = %credit_err,
                "Receiver credit failed, compensating sender"
            );

            if let Err(compensation_err) = self.ledger.credit(sender, amount).await {
                // Funds are debited but neither delivered nor restored:
                // reconciliation, not an ordinary error.
                error!(
                    %sender,
                    amount,
                    error = %compensation_err,
                    "Compensating credit failed"
                );
                let record = ReconciliationRecord {
                    attempt_id: AttemptId::new(),
                    account_id: sender,
                    amount,
                    tx_signature: None,
                    reason: ReconciliationReason::CompensationFailed,
                };
                // A queue failure must not suppress the reconciliation
                // outcome; the alert still fires.
                if let Err(flag_err) = self.reconciliation.flag(&record).await {
                    error!(%sender, error = %flag_err, "Failed to persist reconciliation record");
                }
                self.alerts.raise(&record);
                return Err(TransferError::LedgerUpdateFailed);
            }

            return Err(credit_err.into());
        }

        let record = self
            .recorder
            .append(NewRecord {
                kind: TxKind::Sent,
                sender: Some(sender),
                receiver: Receiver::Account(receiver),
                amount,
                currency: sender_account.currency,
                status: RecordStatus::Completed,
            })
            .await?;

        info!(
            %sender,
            %receiver,
            amount,
            record_id = record.id,
            "Internal transfer completed"
        );

        Ok(InternalTransferOutcome {
            record_id: record.id,
            receiver,
            amount,
            sender_balance,
        })
    }
}
