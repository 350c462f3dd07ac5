//! External Settlement Coordinator
//!
//! Bridges the off-chain ledger to an irreversible on-chain transfer from
//! the platform signing authority to an arbitrary destination address.
//!
//! Ordering invariant: the local ledger debit happens only after on-chain
//! confirmation succeeds, never before, and never concurrently with an
//! unresolved confirmation. Ambiguous outcomes (confirmation timeout, debit
//! failure after confirmation) transition the attempt to
//! RECONCILIATION_REQUIRED instead of reporting an ordinary error.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::error::TransferError;
use super::reconciliation::{
    AlertSink, ReconciliationQueue, ReconciliationReason, ReconciliationRecord,
};
use super::state::SettlementState;
use super::store::{AttemptId, SettlementAttempt, SettlementStore};
use crate::chain::{ChainClient, ChainError, ConfirmStatus};
use crate::core_types::{AccountId, Currency, Receiver, TxKind};
use crate::ledger::BalanceLedger;
use crate::recorder::{NewRecord, RecordStatus, TransactionRecorder};

/// Caller-facing settlement result. Unsafe outcomes surface as the
/// RECONCILIATION_REQUIRED state here and as a neutral pending response at
/// the API boundary.
#[derive(Debug, Clone)]
pub struct SettlementResult {
    pub attempt_id: AttemptId,
    pub state: SettlementState,
    pub tx_signature: Option<String>,
}

impl SettlementResult {
    fn of(attempt_id: AttemptId, state: SettlementState, tx_signature: Option<String>) -> Self {
        Self {
            attempt_id,
            state,
            tx_signature,
        }
    }

    fn from_attempt(attempt: &SettlementAttempt) -> Self {
        Self::of(attempt.attempt_id, attempt.state, attempt.tx_signature.clone())
    }
}

pub struct ExternalSettlementCoordinator {
    ledger: Arc<dyn BalanceLedger>,
    recorder: Arc<dyn TransactionRecorder>,
    store: Arc<dyn SettlementStore>,
    chain: Arc<dyn ChainClient>,
    reconciliation: Arc<dyn ReconciliationQueue>,
    alerts: Arc<dyn AlertSink>,
    confirm_timeout: Duration,
}

impl ExternalSettlementCoordinator {
    pub fn new(
        ledger: Arc<dyn BalanceLedger>,
        recorder: Arc<dyn TransactionRecorder>,
        store: Arc<dyn SettlementStore>,
        chain: Arc<dyn ChainClient>,
        reconciliation: Arc<dyn ReconciliationQueue>,
        alerts: Arc<dyn AlertSink>,
        confirm_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            recorder,
            store,
            chain,
            reconciliation,
            alerts,
            confirm_timeout,
        }
    }

    /// Settle `amount` scaled units from the platform authority to
    /// `destination`, debiting `account` after the chain confirms.
    pub async fn transfer(
        &self,
        account: AccountId,
        destination: &str,
        amount: u64,
        cid: Option<String>,
    ) -> Result<SettlementResult, TransferError> {
        if amount == 0 {
            return Err(TransferError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }

        if !self.chain.validate_address(destination) {
            return Err(TransferError::InvalidDestination);
        }

        // Idempotency: a retry with a known cid returns the recorded attempt
        // as-is. An already-broadcast instruction cannot be canceled, so it
        // must never be submitted twice for one logical request.
        if let Some(ref cid) = cid {
            if let Some(existing) = self.store.get_by_cid(cid).await? {
                info!(
                    cid = %cid,
                    attempt_id = %existing.attempt_id,
                    state = %existing.state,
                    "Duplicate cid, returning existing attempt"
                );
                return Ok(SettlementResult::from_attempt(&existing));
            }
        }

        let attempt =
            SettlementAttempt::new(AttemptId::new(), account, destination, amount, cid);
        self.store.create(&attempt).await?;
        let attempt_id = attempt.attempt_id;

        // Advisory pre-check: not yet a commitment, the debit happens after
        // confirmation. Catches obviously-short balances before any chain
        // traffic.
        let balance = self.ledger.get_balance(account).await?;
        if balance < amount {
            return self
                .fail(attempt_id, SettlementState::Init, TransferError::InsufficientFunds)
                .await;
        }

        // Resolve the authority's token account, creating it at platform
        // expense if absent.
        let authority = self.chain.authority_address();
        let source = match self.chain.associated_token_account(&authority).await {
            Ok(Some(existing)) => existing,
            Ok(None) => match self.chain.create_associated_token_account(&authority).await {
                Ok(created) => created,
                Err(e) => {
                    return self
                        .fail(attempt_id, SettlementState::Init, submission_error(e))
                        .await;
                }
            },
            Err(e) => {
                return self
                    .fail(attempt_id, SettlementState::Init, submission_error(e))
                    .await;
            }
        };

        // Fail fast on a missing destination token account instead of letting
        // the on-chain submission fail opaquely.
        let dest_token_account = match self.chain.associated_token_account(destination).await {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                return self
                    .fail(
                        attempt_id,
                        SettlementState::Init,
                        TransferError::DestinationAccountMissing,
                    )
                    .await;
            }
            Err(e) => {
                return self
                    .fail(attempt_id, SettlementState::Init, submission_error(e))
                    .await;
            }
        };

        // Persist-before-call: the submission is recorded as in progress
        // before the instruction leaves the process.
        if !self
            .store
            .update_state_if(attempt_id, SettlementState::Init, SettlementState::ChainPending)
            .await?
        {
            // Another worker picked this attempt up.
            let current = self
                .store
                .get(attempt_id)
                .await?
                .ok_or_else(|| TransferError::AttemptNotFound(attempt_id.to_string()))?;
            return Ok(SettlementResult::from_attempt(&current));
        }

        let signature = match self
            .chain
            .submit_transfer(&source, &dest_token_account, amount)
            .await
        {
            Ok(signature) => signature,
            Err(e) => {
                // Broadcast rejected before any funds moved: safe failure.
                return self
                    .fail(attempt_id, SettlementState::ChainPending, submission_error(e))
                    .await;
            }
        };
        self.store.set_signature(attempt_id, &signature).await?;

        info!(
            attempt_id = %attempt_id,
            %account,
            amount,
            signature = %signature,
            "Settlement submitted, awaiting confirmation"
        );

        // The confirmation wait is seconds long and happens outside any
        // balance critical section.
        match self.chain.confirm(&signature, self.confirm_timeout).await {
            Ok(ConfirmStatus::Confirmed) => {}
            Ok(ConfirmStatus::Rejected) => {
                // The chain discarded the transaction; nothing moved.
                return self
                    .fail(
                        attempt_id,
                        SettlementState::ChainPending,
                        TransferError::ChainSubmissionFailed(
                            "Transaction rejected by the chain".to_string(),
                        ),
                    )
                    .await;
            }
            Ok(ConfirmStatus::TimedOut) | Err(_) => {
                // Ambiguous: the transaction may still land. Never assume
                // success or failure, and never resubmit.
                return self
                    .require_reconciliation(
                        attempt_id,
                        SettlementState::ChainPending,
                        account,
                        amount,
                        Some(signature),
                        ReconciliationReason::ConfirmationTimeout,
                    )
                    .await;
            }
        }

        self.store
            .update_state_if(
                attempt_id,
                SettlementState::ChainPending,
                SettlementState::ChainConfirmed,
            )
            .await?;

        // Funds have irrevocably left the platform; only now touch the
        // ledger.
        match self.ledger.debit(account, amount).await {
            Ok(new_balance) => {
                if let Err(e) = self
                    .recorder
                    .append(NewRecord {
                        kind: TxKind::Sent,
                        sender: Some(account),
                        receiver: Receiver::External(destination.to_string()),
                        amount,
                        currency: Currency::Usdc,
                        status: RecordStatus::Completed,
                    })
                    .await
                {
                    // Balances are settled; the audit gap is logged, not
                    // surfaced as a transfer failure.
                    warn!(attempt_id = %attempt_id, error = %e, "Audit record append failed");
                }

                self.store
                    .update_state_if(
                        attempt_id,
                        SettlementState::ChainConfirmed,
                        SettlementState::Committed,
                    )
                    .await?;

                info!(
                    attempt_id = %attempt_id,
                    %account,
                    amount,
                    new_balance,
                    signature = %signature,
                    "Settlement committed"
                );

                Ok(SettlementResult::of(
                    attempt_id,
                    SettlementState::Committed,
                    Some(signature),
                ))
            }
            Err(e) => {
                // Money left the platform but the ledger still claims it:
                // this cannot be reported as an ordinary error.
                error!(
                    attempt_id = %attempt_id,
                    %account,
                    amount,
                    signature = %signature,
                    error = %e,
                    "Ledger debit failed after chain confirmation"
                );
                self.require_reconciliation(
                    attempt_id,
                    SettlementState::ChainConfirmed,
                    account,
                    amount,
                    Some(signature),
                    ReconciliationReason::LedgerUpdateFailed,
                )
                .await
            }
        }
    }

    /// Status lookup for an attempt id.
    pub async fn status(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Option<SettlementAttempt>, TransferError> {
        self.store.get(attempt_id).await
    }

    /// Record a safe failure and return it as a typed error.
    async fn fail(
        &self,
        attempt_id: AttemptId,
        expected: SettlementState,
        err: TransferError,
    ) -> Result<SettlementResult, TransferError> {
        if !self
            .store
            .update_state_with_error(attempt_id, expected, SettlementState::Failed, err.code())
            .await?
        {
            warn!(
                attempt_id = %attempt_id,
                error = err.code(),
                "State moved while recording failure"
            );
        }
        Err(err)
    }

    /// Transition to RECONCILIATION_REQUIRED, persist the reconciliation
    /// record, and raise the out-of-band alert. The caller-facing result is
    /// the neutral pending state.
    async fn require_reconciliation(
        &self,
        attempt_id: AttemptId,
        expected: SettlementState,
        account: AccountId,
        amount: u64,
        tx_signature: Option<String>,
        reason: ReconciliationReason,
    ) -> Result<SettlementResult, TransferError> {
        // Store failures here must not suppress the reconciliation outcome;
        // the alert fires regardless.
        if let Err(e) = self
            .store
            .update_state_with_error(
                attempt_id,
                expected,
                SettlementState::ReconciliationRequired,
                reason.as_str(),
            )
            .await
        {
            error!(attempt_id = %attempt_id, error = %e, "Failed to record reconciliation state");
        }

        let record = ReconciliationRecord {
            attempt_id,
            account_id: account,
            amount,
            tx_signature: tx_signature.clone(),
            reason,
        };
        if let Err(e) = self.reconciliation.flag(&record).await {
            error!(attempt_id = %attempt_id, error = %e, "Failed to persist reconciliation record");
        }
        self.alerts.raise(&record);

        Ok(SettlementResult::of(
            attempt_id,
            SettlementState::ReconciliationRequired,
            tx_signature,
        ))
    }
}

fn submission_error(e: ChainError) -> TransferError {
    match e {
        ChainError::InvalidAddress(_) => TransferError::InvalidDestination,
        ChainError::Rpc(msg) => TransferError::ChainSubmissionFailed(msg),
    }
}
