//! Integration tests for the transfer coordinators
//!
//! Full coordinator flows without a live database or RPC node: in-memory
//! ledger/recorder/attempt store plus the configurable mock chain client.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::chain::mock::MockChainClient;
use crate::chain::{ChainClient, ChainError, ConfirmStatus};
use crate::core_types::{AccountId, Currency, Receiver, TxKind};
use crate::ledger::{BalanceLedger, LedgerError, MemLedger};
use crate::recorder::{MemRecorder, RecordStatus};
use crate::settlement::error::TransferError;
use crate::settlement::external::ExternalSettlementCoordinator;
use crate::settlement::internal::InternalTransferCoordinator;
use crate::settlement::reconciliation::{
    AlertSink, MemReconciliationQueue, ReconciliationReason, ReconciliationRecord,
};
use crate::settlement::state::SettlementState;
use crate::settlement::store::{MemSettlementStore, SettlementStore};

const USDC: u64 = 1_000_000; // 1 USDC in scaled units

/// A valid-looking base58 destination for the mock chain.
const DEST: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

struct CountingAlertSink {
    raised: AtomicUsize,
}

impl CountingAlertSink {
    fn new() -> Self {
        Self {
            raised: AtomicUsize::new(0),
        }
    }

    fn count(&self) -> usize {
        self.raised.load(Ordering::SeqCst)
    }
}

impl AlertSink for CountingAlertSink {
    fn raise(&self, _record: &ReconciliationRecord) {
        self.raised.fetch_add(1, Ordering::SeqCst);
    }
}

struct TestHarness {
    ledger: Arc<MemLedger>,
    recorder: Arc<MemRecorder>,
    store: Arc<MemSettlementStore>,
    chain: Arc<MockChainClient>,
    reconciliation: Arc<MemReconciliationQueue>,
    alerts: Arc<CountingAlertSink>,
    internal: InternalTransferCoordinator,
    external: ExternalSettlementCoordinator,
}

impl TestHarness {
    fn new() -> Self {
        let ledger = Arc::new(MemLedger::new());
        let recorder = Arc::new(MemRecorder::new());
        let store = Arc::new(MemSettlementStore::new());
        let chain = Arc::new(MockChainClient::new());
        let reconciliation = Arc::new(MemReconciliationQueue::new());
        let alerts = Arc::new(CountingAlertSink::new());

        let internal = InternalTransferCoordinator::new(
            ledger.clone(),
            recorder.clone(),
            reconciliation.clone(),
            alerts.clone(),
        );
        let external = ExternalSettlementCoordinator::new(
            ledger.clone(),
            recorder.clone(),
            store.clone(),
            chain.clone(),
            reconciliation.clone(),
            alerts.clone(),
            Duration::from_secs(5),
        );

        Self {
            ledger,
            recorder,
            store,
            chain,
            reconciliation,
            alerts,
            internal,
            external,
        }
    }

    fn seed(&self, id: i64, email: &str, balance: u64) {
        self.ledger
            .insert_account(AccountId(id), email, balance, Currency::Usdc);
    }

    async fn balance(&self, id: i64) -> u64 {
        self.ledger.get_balance(AccountId(id)).await.unwrap()
    }
}

// ========================================================================
// Internal transfers
// ========================================================================

#[tokio::test]
async fn test_internal_transfer_happy_path() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);
    h.seed(2, "bob@example.com", 0);

    let outcome = h
        .internal
        .transfer(AccountId(1), "bob@example.com", 300 * USDC)
        .await
        .unwrap();

    assert_eq!(outcome.receiver, AccountId(2));
    assert_eq!(outcome.sender_balance, 700 * USDC);
    assert_eq!(h.balance(1).await, 700 * USDC);
    assert_eq!(h.balance(2).await, 300 * USDC);

    let records = h.recorder.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, TxKind::Sent);
    assert_eq!(records[0].sender, Some(AccountId(1)));
    assert_eq!(records[0].receiver, Receiver::Account(AccountId(2)));
    assert_eq!(records[0].amount, 300 * USDC);
    assert_eq!(records[0].status, RecordStatus::Completed);
}

#[tokio::test]
async fn test_internal_transfer_unknown_receiver() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);

    let result = h
        .internal
        .transfer(AccountId(1), "nobody@example.com", 300 * USDC)
        .await;

    assert!(matches!(result, Err(TransferError::ReceiverNotFound)));
    assert_eq!(h.balance(1).await, 1000 * USDC);
    assert!(h.recorder.snapshot().is_empty());
}

#[tokio::test]
async fn test_internal_transfer_insufficient_funds() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 100 * USDC);
    h.seed(2, "bob@example.com", 0);

    let result = h
        .internal
        .transfer(AccountId(1), "bob@example.com", 300 * USDC)
        .await;

    assert!(matches!(result, Err(TransferError::InsufficientFunds)));
    assert_eq!(h.balance(1).await, 100 * USDC);
    assert_eq!(h.balance(2).await, 0);
}

#[tokio::test]
async fn test_internal_transfer_rejects_self_and_zero() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);

    let result = h
        .internal
        .transfer(AccountId(1), "alice@example.com", 10 * USDC)
        .await;
    assert!(matches!(result, Err(TransferError::Validation(_))));

    let result = h.internal.transfer(AccountId(1), "alice@example.com", 0).await;
    assert!(matches!(result, Err(TransferError::Validation(_))));

    assert_eq!(h.balance(1).await, 1000 * USDC);
}

#[tokio::test]
async fn test_internal_transfer_currency_mismatch() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);
    h.ledger
        .insert_account(AccountId(2), "bob@example.com", 0, Currency::Usdt);

    let result = h
        .internal
        .transfer(AccountId(1), "bob@example.com", 10 * USDC)
        .await;

    assert!(matches!(result, Err(TransferError::CurrencyMismatch)));
    assert_eq!(h.balance(1).await, 1000 * USDC);
    assert_eq!(h.balance(2).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_internal_transfers_single_success() {
    let h = Arc::new(TestHarness::new());
    h.seed(1, "alice@example.com", 500 * USDC);
    h.seed(2, "bob@example.com", 0);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            h.internal
                .transfer(AccountId(1), "bob@example.com", 500 * USDC)
                .await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(TransferError::InsufficientFunds) => insufficient += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(insufficient, 15);
    // Conservation: total unchanged, nothing negative.
    assert_eq!(h.balance(1).await, 0);
    assert_eq!(h.balance(2).await, 500 * USDC);
    assert_eq!(h.recorder.snapshot().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_internal_transfers_conserve_total() {
    let h = Arc::new(TestHarness::new());
    h.seed(1, "alice@example.com", 1000 * USDC);
    h.seed(2, "bob@example.com", 1000 * USDC);

    let mut handles = Vec::new();
    for i in 0..32 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                h.internal
                    .transfer(AccountId(1), "bob@example.com", 7 * USDC)
                    .await
            } else {
                h.internal
                    .transfer(AccountId(2), "alice@example.com", 5 * USDC)
                    .await
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let total = h.balance(1).await + h.balance(2).await;
    assert_eq!(total, 2000 * USDC);
    assert_eq!(h.balance(1).await, 1000 * USDC - 16 * 7 * USDC + 16 * 5 * USDC);
}

// ========================================================================
// Internal transfer compensation
// ========================================================================

/// Ledger wrapper that fails credits for configured accounts.
struct FailingCreditLedger {
    inner: Arc<MemLedger>,
    fail_credit_for: Vec<AccountId>,
}

#[async_trait]
impl BalanceLedger for FailingCreditLedger {
    async fn account(&self, id: AccountId) -> Result<crate::ledger::Account, LedgerError> {
        self.inner.account(id).await
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Option<AccountId>, LedgerError> {
        self.inner.lookup_by_email(email).await
    }

    async fn get_balance(&self, id: AccountId) -> Result<u64, LedgerError> {
        self.inner.get_balance(id).await
    }

    async fn debit(&self, id: AccountId, amount: u64) -> Result<u64, LedgerError> {
        self.inner.debit(id, amount).await
    }

    async fn credit(&self, id: AccountId, amount: u64) -> Result<u64, LedgerError> {
        if self.fail_credit_for.contains(&id) {
            return Err(LedgerError::Store("credit unavailable".to_string()));
        }
        self.inner.credit(id, amount).await
    }
}

#[tokio::test]
async fn test_internal_transfer_compensates_failed_credit() {
    let mem = Arc::new(MemLedger::new());
    mem.insert_account(AccountId(1), "alice@example.com", 1000 * USDC, Currency::Usdc);
    mem.insert_account(AccountId(2), "bob@example.com", 0, Currency::Usdc);

    let ledger = Arc::new(FailingCreditLedger {
        inner: mem.clone(),
        fail_credit_for: vec![AccountId(2)],
    });
    let recorder = Arc::new(MemRecorder::new());
    let reconciliation = Arc::new(MemReconciliationQueue::new());
    let alerts = Arc::new(CountingAlertSink::new());
    let internal = InternalTransferCoordinator::new(
        ledger,
        recorder.clone(),
        reconciliation.clone(),
        alerts.clone(),
    );

    let result = internal
        .transfer(AccountId(1), "bob@example.com", 300 * USDC)
        .await;

    assert!(matches!(result, Err(TransferError::Store(_))));
    // Compensating credit restored the debited funds.
    assert_eq!(mem.get_balance(AccountId(1)).await.unwrap(), 1000 * USDC);
    assert_eq!(mem.get_balance(AccountId(2)).await.unwrap(), 0);
    assert!(recorder.snapshot().is_empty());
    assert_eq!(alerts.count(), 0);
}

#[tokio::test]
async fn test_internal_transfer_failed_compensation_flags_reconciliation() {
    let mem = Arc::new(MemLedger::new());
    mem.insert_account(AccountId(1), "alice@example.com", 1000 * USDC, Currency::Usdc);
    mem.insert_account(AccountId(2), "bob@example.com", 0, Currency::Usdc);

    // Both the receiver credit and the compensating sender credit fail.
    let ledger = Arc::new(FailingCreditLedger {
        inner: mem.clone(),
        fail_credit_for: vec![AccountId(1), AccountId(2)],
    });
    let recorder = Arc::new(MemRecorder::new());
    let reconciliation = Arc::new(MemReconciliationQueue::new());
    let alerts = Arc::new(CountingAlertSink::new());
    let internal = InternalTransferCoordinator::new(
        ledger,
        recorder,
        reconciliation.clone(),
        alerts.clone(),
    );

    let result = internal
        .transfer(AccountId(1), "bob@example.com", 300 * USDC)
        .await;

    assert!(matches!(result, Err(TransferError::LedgerUpdateFailed)));
    assert_eq!(alerts.count(), 1);

    let flagged = reconciliation.snapshot();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].account_id, AccountId(1));
    assert_eq!(flagged[0].amount, 300 * USDC);
    assert_eq!(flagged[0].reason, ReconciliationReason::CompensationFailed);
}

// ========================================================================
// External settlements
// ========================================================================

#[tokio::test]
async fn test_external_settlement_commits() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);

    let result = h
        .external
        .transfer(AccountId(1), DEST, 50 * USDC, None)
        .await
        .unwrap();

    assert_eq!(result.state, SettlementState::Committed);
    assert!(result.tx_signature.is_some());
    assert_eq!(h.balance(1).await, 950 * USDC);
    assert_eq!(h.chain.submit_count(), 1);

    let records = h.recorder.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].receiver, Receiver::External(DEST.to_string()));
    assert_eq!(records[0].amount, 50 * USDC);

    let attempt = h.store.get(result.attempt_id).await.unwrap().unwrap();
    assert_eq!(attempt.state, SettlementState::Committed);
}

#[tokio::test]
async fn test_external_settlement_insufficient_funds_skips_chain() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 100 * USDC);

    let result = h
        .external
        .transfer(AccountId(1), DEST, 300 * USDC, Some("cid-1".to_string()))
        .await;

    assert!(matches!(result, Err(TransferError::InsufficientFunds)));
    assert_eq!(h.chain.submit_count(), 0);
    assert_eq!(h.balance(1).await, 100 * USDC);

    // The failed attempt is persisted.
    let attempt = h.store.get_by_cid("cid-1").await.unwrap().unwrap();
    assert_eq!(attempt.state, SettlementState::Failed);
    assert_eq!(attempt.error.as_deref(), Some("INSUFFICIENT_FUNDS"));
}

#[tokio::test]
async fn test_external_settlement_invalid_destination() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);

    let result = h
        .external
        .transfer(AccountId(1), "not-an-address", 50 * USDC, None)
        .await;

    assert!(matches!(result, Err(TransferError::InvalidDestination)));
    assert_eq!(h.chain.submit_count(), 0);
    assert_eq!(h.balance(1).await, 1000 * USDC);
}

#[tokio::test]
async fn test_external_settlement_destination_account_missing() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);
    h.chain.set_destination_ata_missing(true);

    let result = h
        .external
        .transfer(AccountId(1), DEST, 50 * USDC, None)
        .await;

    assert!(matches!(result, Err(TransferError::DestinationAccountMissing)));
    assert_eq!(h.chain.submit_count(), 0);
    assert_eq!(h.balance(1).await, 1000 * USDC);
}

#[tokio::test]
async fn test_external_settlement_submission_rejected_is_safe() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);
    h.chain.set_fail_submit(true);

    let result = h
        .external
        .transfer(AccountId(1), DEST, 50 * USDC, Some("cid-2".to_string()))
        .await;

    assert!(matches!(result, Err(TransferError::ChainSubmissionFailed(_))));
    assert_eq!(h.chain.confirm_count(), 0);
    assert_eq!(h.balance(1).await, 1000 * USDC);
    assert_eq!(h.alerts.count(), 0);

    let attempt = h.store.get_by_cid("cid-2").await.unwrap().unwrap();
    assert_eq!(attempt.state, SettlementState::Failed);
}

#[tokio::test]
async fn test_external_settlement_timeout_requires_reconciliation() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);
    h.chain.set_confirm_status(ConfirmStatus::TimedOut);

    let result = h
        .external
        .transfer(AccountId(1), DEST, 50 * USDC, None)
        .await
        .unwrap();

    // Neutral pending result; no assumption of success or failure.
    assert_eq!(result.state, SettlementState::ReconciliationRequired);
    // Ledger untouched until reconciliation.
    assert_eq!(h.balance(1).await, 1000 * USDC);
    assert!(h.recorder.snapshot().is_empty());

    // Alert + persisted record with account, amount, and the signature.
    assert_eq!(h.alerts.count(), 1);
    let flagged = h.reconciliation.snapshot();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].account_id, AccountId(1));
    assert_eq!(flagged[0].amount, 50 * USDC);
    assert_eq!(flagged[0].tx_signature, result.tx_signature);
    assert_eq!(flagged[0].reason, ReconciliationReason::ConfirmationTimeout);
}

#[tokio::test]
async fn test_external_settlement_rejected_confirmation_is_safe() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);
    h.chain.set_confirm_status(ConfirmStatus::Rejected);

    let result = h
        .external
        .transfer(AccountId(1), DEST, 50 * USDC, None)
        .await;

    assert!(matches!(result, Err(TransferError::ChainSubmissionFailed(_))));
    assert_eq!(h.balance(1).await, 1000 * USDC);
    assert_eq!(h.alerts.count(), 0);
}

#[tokio::test]
async fn test_external_settlement_retry_same_cid_not_resubmitted() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);
    h.chain.set_confirm_status(ConfirmStatus::TimedOut);

    let first = h
        .external
        .transfer(AccountId(1), DEST, 50 * USDC, Some("retry-1".to_string()))
        .await
        .unwrap();
    assert_eq!(first.state, SettlementState::ReconciliationRequired);
    assert_eq!(h.chain.submit_count(), 1);

    // Retry of the timed-out attempt with the same idempotency key: no
    // second on-chain transfer for one logical request.
    let second = h
        .external
        .transfer(AccountId(1), DEST, 50 * USDC, Some("retry-1".to_string()))
        .await
        .unwrap();

    assert_eq!(second.attempt_id, first.attempt_id);
    assert_eq!(second.state, SettlementState::ReconciliationRequired);
    assert_eq!(h.chain.submit_count(), 1);
    assert_eq!(h.alerts.count(), 1);
}

#[tokio::test]
async fn test_external_settlement_ledger_failure_after_confirm() {
    let mem = Arc::new(MemLedger::new());
    mem.insert_account(AccountId(1), "alice@example.com", 1000 * USDC, Currency::Usdc);

    // Debit fails after confirmation: simulate with a ledger that reports a
    // store failure on debit but a healthy balance on the pre-check.
    struct FailingDebitLedger {
        inner: Arc<MemLedger>,
    }

    #[async_trait]
    impl BalanceLedger for FailingDebitLedger {
        async fn account(&self, id: AccountId) -> Result<crate::ledger::Account, LedgerError> {
            self.inner.account(id).await
        }

        async fn lookup_by_email(&self, email: &str) -> Result<Option<AccountId>, LedgerError> {
            self.inner.lookup_by_email(email).await
        }

        async fn get_balance(&self, id: AccountId) -> Result<u64, LedgerError> {
            self.inner.get_balance(id).await
        }

        async fn debit(&self, _id: AccountId, _amount: u64) -> Result<u64, LedgerError> {
            Err(LedgerError::Store("debit unavailable".to_string()))
        }

        async fn credit(&self, id: AccountId, amount: u64) -> Result<u64, LedgerError> {
            self.inner.credit(id, amount).await
        }
    }

    let ledger = Arc::new(FailingDebitLedger { inner: mem.clone() });
    let recorder = Arc::new(MemRecorder::new());
    let store = Arc::new(MemSettlementStore::new());
    let chain = Arc::new(MockChainClient::new());
    let reconciliation = Arc::new(MemReconciliationQueue::new());
    let alerts = Arc::new(CountingAlertSink::new());
    let external = ExternalSettlementCoordinator::new(
        ledger,
        recorder,
        store.clone(),
        chain.clone(),
        reconciliation.clone(),
        alerts.clone(),
        Duration::from_secs(5),
    );

    let result = external
        .transfer(AccountId(1), DEST, 50 * USDC, None)
        .await
        .unwrap();

    // Funds moved on-chain, debit failed: reconciliation-required, never an
    // ordinary error.
    assert_eq!(result.state, SettlementState::ReconciliationRequired);
    assert_eq!(chain.submit_count(), 1);
    assert_eq!(alerts.count(), 1);

    let flagged = reconciliation.snapshot();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].reason, ReconciliationReason::LedgerUpdateFailed);
    assert!(flagged[0].tx_signature.is_some());

    let attempt = store.get(result.attempt_id).await.unwrap().unwrap();
    assert_eq!(attempt.state, SettlementState::ReconciliationRequired);
}

#[tokio::test]
async fn test_external_settlement_debits_only_after_confirmation() {
    // Chain client that asserts the ledger is untouched at confirmation time.
    struct OrderingProbeChain {
        inner: MockChainClient,
        ledger: Arc<MemLedger>,
        account: AccountId,
        balance_before: u64,
    }

    #[async_trait]
    impl ChainClient for OrderingProbeChain {
        fn validate_address(&self, address: &str) -> bool {
            self.inner.validate_address(address)
        }

        fn authority_address(&self) -> String {
            self.inner.authority_address()
        }

        async fn associated_token_account(
            &self,
            owner: &str,
        ) -> Result<Option<String>, ChainError> {
            self.inner.associated_token_account(owner).await
        }

        async fn create_associated_token_account(
            &self,
            owner: &str,
        ) -> Result<String, ChainError> {
            self.inner.create_associated_token_account(owner).await
        }

        async fn submit_transfer(
            &self,
            source: &str,
            destination: &str,
            amount: u64,
        ) -> Result<String, ChainError> {
            assert_eq!(
                self.ledger.get_balance(self.account).await.unwrap(),
                self.balance_before,
                "ledger mutated before submission"
            );
            self.inner.submit_transfer(source, destination, amount).await
        }

        async fn confirm(
            &self,
            signature: &str,
            timeout: Duration,
        ) -> Result<ConfirmStatus, ChainError> {
            assert_eq!(
                self.ledger.get_balance(self.account).await.unwrap(),
                self.balance_before,
                "ledger mutated before confirmation resolved"
            );
            self.inner.confirm(signature, timeout).await
        }
    }

    let ledger = Arc::new(MemLedger::new());
    ledger.insert_account(AccountId(1), "alice@example.com", 1000 * USDC, Currency::Usdc);

    let chain = Arc::new(OrderingProbeChain {
        inner: MockChainClient::new(),
        ledger: ledger.clone(),
        account: AccountId(1),
        balance_before: 1000 * USDC,
    });
    let external = ExternalSettlementCoordinator::new(
        ledger.clone(),
        Arc::new(MemRecorder::new()),
        Arc::new(MemSettlementStore::new()),
        chain,
        Arc::new(MemReconciliationQueue::new()),
        Arc::new(CountingAlertSink::new()),
        Duration::from_secs(5),
    );

    let result = external
        .transfer(AccountId(1), DEST, 50 * USDC, None)
        .await
        .unwrap();

    assert_eq!(result.state, SettlementState::Committed);
    assert_eq!(ledger.get_balance(AccountId(1)).await.unwrap(), 950 * USDC);
}

#[tokio::test]
async fn test_external_settlement_status_lookup() {
    let h = TestHarness::new();
    h.seed(1, "alice@example.com", 1000 * USDC);

    let result = h
        .external
        .transfer(AccountId(1), DEST, 50 * USDC, None)
        .await
        .unwrap();

    let attempt = h.external.status(result.attempt_id).await.unwrap().unwrap();
    assert_eq!(attempt.state, SettlementState::Committed);
    assert_eq!(attempt.account_id, AccountId(1));
    assert_eq!(attempt.amount, 50 * USDC);
    assert_eq!(attempt.destination, DEST);
}
