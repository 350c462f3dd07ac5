//! Gateway handlers

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{BalanceResponse, TransactionView, TransactionsResponse};
pub use health::HealthResponse;
pub use transfer::{
    ExternalTransferRequest, ExternalTransferResponse, InternalTransferRequest,
    InternalTransferResponse,
};
