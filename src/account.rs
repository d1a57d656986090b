//! Ledger account model.
//!
//! Identities are externally owned 20-byte addresses. The engine never creates
//! them; the hosting environment attaches the verified caller to every
//! invocation through a [`CallContext`]. An [`Account`] is the engine's view of
//! the value it holds in custody on behalf of one identity.

use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 20-byte address, rendered as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity([u8; 20]);

impl Identity {
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Deterministic identity with `n` in the low bytes. Handy for tests and simulations.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let raw = hex::decode(digits).map_err(|e| IdentityError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 20] = raw
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::InvalidLength(raw.len()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.to_string()
    }
}

impl From<[u8; 20]> for Identity {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid hex in identity: {0}")]
    InvalidHex(String),

    #[error("Identity must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

/// The verified invocation context supplied by the hosting environment.
///
/// `caller` is the only source of the acting party. `attached_value` is the
/// value moved with the call; it only reaches custody if the operation commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Identity,
    pub attached_value: Value,
}

impl CallContext {
    pub fn new(caller: Identity) -> Self {
        Self {
            caller,
            attached_value: Value::zero(),
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.attached_value = value;
        self
    }
}

/// Custody held for one identity, plus lifetime flow totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub identity: Identity,
    /// Value currently escrowed behind this identity's open requests.
    pub escrowed: Value,
    pub open_requests: usize,
    pub total_escrowed: Value,
    /// Trade proceeds and price improvement paid out to this identity.
    pub total_received: Value,
    pub total_refunded: Value,
}

impl Account {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            escrowed: Value::zero(),
            open_requests: 0,
            total_escrowed: Value::zero(),
            total_received: Value::zero(),
            total_refunded: Value::zero(),
        }
    }

    pub fn record_escrow(&mut self, amount: Value) {
        self.escrowed = self.escrowed.saturating_add(amount);
        self.total_escrowed = self.total_escrowed.saturating_add(amount);
        self.open_requests += 1;
    }

    // closes one open request. the engine has already checked the amount against custody.
    pub fn close_escrow(&mut self, amount: Value) {
        self.escrowed = self.escrowed.saturating_sub(amount);
        self.open_requests = self.open_requests.saturating_sub(1);
    }

    pub fn record_receipt(&mut self, amount: Value) {
        self.total_received = self.total_received.saturating_add(amount);
    }

    pub fn record_refund(&mut self, amount: Value) {
        self.total_refunded = self.total_refunded.saturating_add(amount);
    }
}
