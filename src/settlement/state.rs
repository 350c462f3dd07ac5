//! Settlement FSM State Definitions
//!
//! State ids are stored as PostgreSQL SMALLINT. Terminal states:
//! COMMITTED (40), FAILED (-10), RECONCILIATION_REQUIRED (-40).

use std::fmt;

/// External settlement states
///
/// The ordering invariant lives here: the ledger debit is only reachable
/// through `ChainConfirmed`, i.e. strictly after on-chain confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum SettlementState {
    /// Attempt validated and recorded
    Init = 0,

    /// Transfer submitted to the chain, confirmation outstanding
    /// (persisted before the submission call)
    ChainPending = 10,

    /// On-chain transfer confirmed and irreversible; local debit outstanding.
    /// Funds are IN-FLIGHT: must reach COMMITTED or RECONCILIATION_REQUIRED.
    ChainConfirmed = 20,

    /// Terminal: debit applied and audit record appended
    Committed = 40,

    /// Terminal: nothing moved on-chain (safe failure)
    Failed = -10,

    /// Terminal-but-ambiguous: ledger and chain may have diverged;
    /// a reconciliation record exists
    ReconciliationRequired = -40,
}

impl SettlementState {
    /// No more transitions possible.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SettlementState::Committed
                | SettlementState::Failed
                | SettlementState::ReconciliationRequired
        )
    }

    /// Funds left the platform on-chain but the local ledger has not
    /// recorded it yet.
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SettlementState::ChainConfirmed)
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(SettlementState::Init),
            10 => Some(SettlementState::ChainPending),
            20 => Some(SettlementState::ChainConfirmed),
            40 => Some(SettlementState::Committed),
            -10 => Some(SettlementState::Failed),
            -40 => Some(SettlementState::ReconciliationRequired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementState::Init => "INIT",
            SettlementState::ChainPending => "CHAIN_PENDING",
            SettlementState::ChainConfirmed => "CHAIN_CONFIRMED",
            SettlementState::Committed => "COMMITTED",
            SettlementState::Failed => "FAILED",
            SettlementState::ReconciliationRequired => "RECONCILIATION_REQUIRED",
        }
    }
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for SettlementState {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        SettlementState::from_id(value).ok_or(())
    }
}
