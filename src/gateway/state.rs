//! Shared gateway state

use std::sync::Arc;

use crate::ledger::BalanceLedger;
use crate::recorder::TransactionRecorder;
use crate::session::SessionResolver;
use crate::settlement::{ExternalSettlementCoordinator, InternalTransferCoordinator};

pub struct AppState {
    pub sessions: Arc<dyn SessionResolver>,
    pub ledger: Arc<dyn BalanceLedger>,
    pub recorder: Arc<dyn TransactionRecorder>,
    pub internal: Arc<InternalTransferCoordinator>,
    pub external: Arc<ExternalSettlementCoordinator>,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionResolver>,
        ledger: Arc<dyn BalanceLedger>,
        recorder: Arc<dyn TransactionRecorder>,
        internal: Arc<InternalTransferCoordinator>,
        external: Arc<ExternalSettlementCoordinator>,
    ) -> Self {
        Self {
            sessions,
            ledger,
            recorder,
            internal,
            external,
        }
    }
}
