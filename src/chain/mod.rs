//! Chain Client
//!
//! Narrow interface to the settlement chain: address validation, associated
//! token account resolution/creation, transfer submission, and bounded
//! confirmation. The production implementation speaks Solana JSON-RPC; tests
//! use the configurable mock.
//!
//! Confirmation is a three-way outcome. `TimedOut` is ambiguous by
//! construction: the submitted transaction cannot be canceled, only the local
//! wait abandoned, so callers must treat it as
//! neither-success-nor-failure.

pub mod signer;
pub mod solana;

pub use signer::SigningAuthority;
pub use solana::SolanaRpcChainClient;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ChainError {
    #[error("Invalid chain address: {0}")]
    InvalidAddress(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}

/// Outcome of waiting for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmStatus {
    /// The transfer is confirmed and irreversible.
    Confirmed,
    /// The chain rejected the transaction; no funds moved.
    Rejected,
    /// The bounded wait elapsed with no terminal status. Ambiguous: the
    /// transaction may still land.
    TimedOut,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Syntactic validation of a destination address.
    fn validate_address(&self, address: &str) -> bool;

    /// The signing authority's own chain address.
    fn authority_address(&self) -> String;

    /// Resolve the owner's associated token account for the settlement
    /// currency; `None` when it does not exist on chain.
    async fn associated_token_account(&self, owner: &str) -> Result<Option<String>, ChainError>;

    /// Create the owner's associated token account, fee paid by the platform
    /// signing authority. Idempotent.
    async fn create_associated_token_account(&self, owner: &str) -> Result<String, ChainError>;

    /// Build one transfer instruction, sign with the authority, and submit.
    /// Returns the transaction signature. An error here means the broadcast
    /// was rejected and no funds moved.
    async fn submit_transfer(
        &self,
        source_token_account: &str,
        destination_token_account: &str,
        amount: u64,
    ) -> Result<String, ChainError>;

    /// Block on confirmation up to `timeout`.
    async fn confirm(&self, signature: &str, timeout: Duration)
        -> Result<ConfirmStatus, ChainError>;
}

/// Mock chain client for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct MockChainClient {
        /// Configured behavior
        destination_ata_missing: Mutex<bool>,
        fail_submit: Mutex<bool>,
        confirm_status: Mutex<ConfirmStatus>,
        /// Operation counters for verification
        submit_count: AtomicUsize,
        create_ata_count: AtomicUsize,
        confirm_count: AtomicUsize,
    }

    impl Default for MockChainClient {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockChainClient {
        pub fn new() -> Self {
            Self {
                destination_ata_missing: Mutex::new(false),
                fail_submit: Mutex::new(false),
                confirm_status: Mutex::new(ConfirmStatus::Confirmed),
                submit_count: AtomicUsize::new(0),
                create_ata_count: AtomicUsize::new(0),
                confirm_count: AtomicUsize::new(0),
            }
        }

        pub fn set_destination_ata_missing(&self, missing: bool) {
            *self.destination_ata_missing.lock().unwrap() = missing;
        }

        pub fn set_fail_submit(&self, fail: bool) {
            *self.fail_submit.lock().unwrap() = fail;
        }

        pub fn set_confirm_status(&self, status: ConfirmStatus) {
            *self.confirm_status.lock().unwrap() = status;
        }

        pub fn submit_count(&self) -> usize {
            self.submit_count.load(Ordering::SeqCst)
        }

        pub fn create_ata_count(&self) -> usize {
            self.create_ata_count.load(Ordering::SeqCst)
        }

        pub fn confirm_count(&self) -> usize {
            self.confirm_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChainClient for MockChainClient {
        fn validate_address(&self, address: &str) -> bool {
            // Base58-shaped: non-empty, plausible length, no obvious junk.
            (32..=44).contains(&address.len())
                && address.chars().all(|c| c.is_ascii_alphanumeric())
        }

        fn authority_address(&self) -> String {
            "AuthorityMock1111111111111111111111111111111".to_string()
        }

        async fn associated_token_account(
            &self,
            owner: &str,
        ) -> Result<Option<String>, ChainError> {
            if owner != self.authority_address() && *self.destination_ata_missing.lock().unwrap() {
                return Ok(None);
            }
            Ok(Some(format!("ata-{}", owner)))
        }

        async fn create_associated_token_account(
            &self,
            owner: &str,
        ) -> Result<String, ChainError> {
            self.create_ata_count.fetch_add(1, Ordering::SeqCst);
            Ok(format!("ata-{}", owner))
        }

        async fn submit_transfer(
            &self,
            _source_token_account: &str,
            _destination_token_account: &str,
            _amount: u64,
        ) -> Result<String, ChainError> {
            if *self.fail_submit.lock().unwrap() {
                return Err(ChainError::Rpc("Mock broadcast rejection".to_string()));
            }
            let n = self.submit_count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("mock-signature-{}", n))
        }

        async fn confirm(
            &self,
            _signature: &str,
            _timeout: Duration,
        ) -> Result<ConfirmStatus, ChainError> {
            self.confirm_count.fetch_add(1, Ordering::SeqCst);
            Ok(*self.confirm_status.lock().unwrap())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_counters() {
            let chain = MockChainClient::new();
            chain.submit_transfer("s", "d", 1).await.unwrap();
            chain.submit_transfer("s", "d", 1).await.unwrap();
            assert_eq!(chain.submit_count(), 2);

            chain.set_fail_submit(true);
            assert!(chain.submit_transfer("s", "d", 1).await.is_err());
            assert_eq!(chain.submit_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_confirm_modes() {
            let chain = MockChainClient::new();
            assert_eq!(
                chain.confirm("sig", Duration::from_secs(1)).await.unwrap(),
                ConfirmStatus::Confirmed
            );

            chain.set_confirm_status(ConfirmStatus::TimedOut);
            assert_eq!(
                chain.confirm("sig", Duration::from_secs(1)).await.unwrap(),
                ConfirmStatus::TimedOut
            );
        }

        #[test]
        fn test_mock_address_validation() {
            let chain = MockChainClient::new();
            assert!(chain.validate_address("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"));
            assert!(!chain.validate_address("short"));
            assert!(!chain.validate_address(""));
        }
    }
}
