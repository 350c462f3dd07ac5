//! Transfer Error Types
//!
//! One taxonomy for both coordinators. Every component returns a typed
//! result; unsafe outcomes (ledger and chain possibly diverged) are marked
//! reconciliation-required and must never be collapsed into a generic
//! failure.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::money::MoneyError;
use crate::recorder::RecorderError;

#[derive(Error, Debug, Clone)]
pub enum TransferError {
    // === Rejected before any ledger access ===
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not authenticated")]
    Authentication,

    #[error("Invalid destination address")]
    InvalidDestination,

    // === Resolution errors ===
    #[error("Account not found")]
    AccountNotFound,

    #[error("Receiver not found")]
    ReceiverNotFound,

    #[error("Settlement attempt not found: {0}")]
    AttemptNotFound(String),

    // === Ledger rejections ===
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Currency mismatch")]
    CurrencyMismatch,

    // === Chain errors (safe: no funds moved) ===
    #[error("Destination token account does not exist")]
    DestinationAccountMissing,

    #[error("Chain submission failed: {0}")]
    ChainSubmissionFailed(String),

    // === Unsafe outcomes (reconciliation-required) ===
    #[error("Chain confirmation timed out")]
    ChainConfirmationTimeout,

    #[error("Ledger update failed after chain confirmation")]
    LedgerUpdateFailed,

    // === System errors ===
    #[error("Store error: {0}")]
    Store(String),
}

impl TransferError {
    /// Stable error code for API responses and persisted attempt rows.
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::Validation(_) => "VALIDATION_ERROR",
            TransferError::Authentication => "AUTHENTICATION_ERROR",
            TransferError::InvalidDestination => "INVALID_DESTINATION",
            TransferError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            TransferError::ReceiverNotFound => "RECEIVER_NOT_FOUND",
            TransferError::AttemptNotFound(_) => "ATTEMPT_NOT_FOUND",
            TransferError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferError::CurrencyMismatch => "CURRENCY_MISMATCH",
            TransferError::DestinationAccountMissing => "DESTINATION_ACCOUNT_MISSING",
            TransferError::ChainSubmissionFailed(_) => "CHAIN_SUBMISSION_FAILED",
            TransferError::ChainConfirmationTimeout => "CHAIN_CONFIRMATION_TIMEOUT",
            TransferError::LedgerUpdateFailed => "LEDGER_UPDATE_FAILED",
            TransferError::Store(_) => "STORE_ERROR",
        }
    }

    /// HTTP status suggestion. Reconciliation-required outcomes map to 202:
    /// the caller sees a neutral pending result, not an error.
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::Validation(_) | TransferError::InvalidDestination => 400,
            TransferError::Authentication => 401,
            TransferError::AccountNotFound
            | TransferError::ReceiverNotFound
            | TransferError::AttemptNotFound(_) => 404,
            TransferError::InsufficientFunds
            | TransferError::CurrencyMismatch
            | TransferError::DestinationAccountMissing => 422,
            TransferError::ChainSubmissionFailed(_) => 502,
            TransferError::ChainConfirmationTimeout | TransferError::LedgerUpdateFailed => 202,
            TransferError::Store(_) => 500,
        }
    }

    /// True when the ledger and the chain may have diverged and the attempt
    /// has been handed to the reconciliation path.
    #[inline]
    pub fn is_reconciliation_required(&self) -> bool {
        matches!(
            self,
            TransferError::ChainConfirmationTimeout | TransferError::LedgerUpdateFailed
        )
    }
}

impl From<LedgerError> for TransferError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AccountNotFound(_) => TransferError::AccountNotFound,
            LedgerError::InsufficientFunds => TransferError::InsufficientFunds,
            LedgerError::Overflow => TransferError::Store("Balance overflow".to_string()),
            LedgerError::Store(msg) => TransferError::Store(msg),
        }
    }
}

impl From<RecorderError> for TransferError {
    fn from(e: RecorderError) -> Self {
        TransferError::Store(e.to_string())
    }
}

impl From<MoneyError> for TransferError {
    fn from(e: MoneyError) -> Self {
        TransferError::Validation(e.to_string())
    }
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        TransferError::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(TransferError::CurrencyMismatch.code(), "CURRENCY_MISMATCH");
        assert_eq!(
            TransferError::ChainConfirmationTimeout.code(),
            "CHAIN_CONFIRMATION_TIMEOUT"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::Validation("x".into()).http_status(), 400);
        assert_eq!(TransferError::Authentication.http_status(), 401);
        assert_eq!(TransferError::ReceiverNotFound.http_status(), 404);
        assert_eq!(TransferError::InsufficientFunds.http_status(), 422);
        assert_eq!(TransferError::ChainSubmissionFailed("x".into()).http_status(), 502);
        assert_eq!(TransferError::ChainConfirmationTimeout.http_status(), 202);
    }

    #[test]
    fn test_reconciliation_required_flag() {
        assert!(TransferError::ChainConfirmationTimeout.is_reconciliation_required());
        assert!(TransferError::LedgerUpdateFailed.is_reconciliation_required());
        assert!(!TransferError::InsufficientFunds.is_reconciliation_required());
        assert!(!TransferError::ChainSubmissionFailed("x".into()).is_reconciliation_required());
    }

    #[test]
    fn test_ledger_error_mapping() {
        use crate::core_types::AccountId;
        assert!(matches!(
            TransferError::from(LedgerError::InsufficientFunds),
            TransferError::InsufficientFunds
        ));
        assert!(matches!(
            TransferError::from(LedgerError::AccountNotFound(AccountId(1))),
            TransferError::AccountNotFound
        ));
    }
}
