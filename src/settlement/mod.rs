//! Transfer & Settlement
//!
//! The two coordinators of the engine:
//!
//! - [`InternalTransferCoordinator`] - ledger-only transfer between two
//!   platform accounts, all-or-nothing via compensating credit.
//! - [`ExternalSettlementCoordinator`] - on-chain settlement from the
//!   platform signing authority to an external address, driven as a
//!   persisted FSM with CAS state transitions.

pub mod error;
pub mod external;
pub mod internal;
pub mod pg_store;
pub mod reconciliation;
pub mod state;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use error::TransferError;
pub use external::{ExternalSettlementCoordinator, SettlementResult};
pub use internal::{InternalTransferCoordinator, InternalTransferOutcome};
pub use pg_store::PgSettlementStore;
pub use reconciliation::{
    AlertSink, MemReconciliationQueue, PgReconciliationQueue, ReconciliationQueue,
    ReconciliationReason, ReconciliationRecord, TracingAlertSink,
};
pub use state::SettlementState;
pub use store::{AttemptId, MemSettlementStore, SettlementAttempt, SettlementStore};
