//! Custodia - Custodial Wallet Transfer & Settlement Engine
//!
//! Moves value between custodial accounts in two modes: an off-chain ledger
//! transfer between two platform users, and an on-chain USDC settlement from
//! the platform signing authority to an external address.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (AccountId, Currency, TxKind)
//! - [`money`] - Scaled amount parsing and formatting
//! - [`ledger`] - Per-account balance state with atomic debit/credit
//! - [`recorder`] - Append-only transaction audit trail
//! - [`session`] - Caller authentication seam
//! - [`chain`] - Chain client and signing authority
//! - [`settlement`] - Internal and external transfer coordinators
//! - [`gateway`] - HTTP operation surface
//! - [`persistence`] - PostgreSQL pool and schema

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod logging;
pub mod money;

// Engine components
pub mod chain;
pub mod gateway;
pub mod ledger;
pub mod persistence;
pub mod recorder;
pub mod session;
pub mod settlement;

// Convenient re-exports at crate root
pub use chain::{ChainClient, ConfirmStatus, SigningAuthority, SolanaRpcChainClient};
pub use core_types::{AccountId, Currency, Receiver, TxKind};
pub use ledger::{Account, BalanceLedger, MemLedger, PgLedger};
pub use recorder::{MemRecorder, PgRecorder, TransactionRecorder};
pub use session::{JwtSessionResolver, SessionResolver};
pub use settlement::{
    AttemptId, ExternalSettlementCoordinator, InternalTransferCoordinator, SettlementResult,
    SettlementState, TransferError,
};
