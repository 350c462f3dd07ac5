//! Core type definitions shared across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform account identity.
///
/// One account per user; the id is assigned by the persistent store at
/// provisioning time (outside this engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    #[inline]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Settlement currency.
///
/// The engine settles a single asset; the code is still recorded per account
/// and checked on internal transfers so a future multi-asset store cannot be
/// silently mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Usdc,
    Usdt,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usdc => "USDC",
            Currency::Usdt => "USDT",
        }
    }

    /// Internal scale: amounts are stored as `u64` units of `10^-decimals`.
    #[inline]
    pub fn decimals(&self) -> u32 {
        match self {
            Currency::Usdc | Currency::Usdt => 6,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "USDC" => Some(Currency::Usdc),
            "USDT" => Some(Currency::Usdt),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Direction of an audit record relative to the platform account it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum TxKind {
    Sent = 1,
    Received = 2,
}

impl TxKind {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(TxKind::Sent),
            2 => Some(TxKind::Received),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Sent => "SENT",
            TxKind::Received => "RECEIVED",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Receiving side of a transfer: either a platform account or a raw external
/// chain address. Audit records store this polymorphically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    Account(AccountId),
    External(String),
}

impl Receiver {
    /// Discriminator for persistent storage.
    #[inline]
    pub fn kind_id(&self) -> i16 {
        match self {
            Receiver::Account(_) => 1,
            Receiver::External(_) => 2,
        }
    }

    /// Storage value: account id digits or the raw address string.
    pub fn storage_value(&self) -> String {
        match self {
            Receiver::Account(id) => id.to_string(),
            Receiver::External(addr) => addr.clone(),
        }
    }

    pub fn from_parts(kind_id: i16, value: &str) -> Option<Self> {
        match kind_id {
            1 => value.parse().ok().map(Receiver::Account),
            2 => Some(Receiver::External(value.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Receiver::Account(id) => write!(f, "account:{}", id),
            Receiver::External(addr) => write!(f, "external:{}", addr),
        }
    }
}
