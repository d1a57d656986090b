// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, energy, prices, value, timestamps. each is a newtype so the compiler catches unit mixups.
// every quantity is an unsigned 256-bit integer in its smallest indivisible unit.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

// 0-based creation index into the offer book
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OfferId(pub u64);

// 0-based creation index into the request book
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offer#{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

// 1.1: energy quantity in the smallest energy unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Energy(U256);

impl Energy {
    pub fn new(amount: U256) -> Self {
        Self(amount)
    }

    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn value(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: Energy) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Energy) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    // energy * unit price, None on overflow. the only place value is derived from energy.
    pub fn checked_cost(&self, price: UnitPrice) -> Option<Value> {
        self.0.checked_mul(price.0).map(Value)
    }
}

impl From<u64> for Energy {
    fn from(amount: u64) -> Self {
        Self(U256::from(amount))
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: value units per energy unit. zero only when free energy is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct UnitPrice(U256);

impl UnitPrice {
    pub fn new(price: U256) -> Self {
        Self(price)
    }

    pub fn value(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<u64> for UnitPrice {
    fn from(price: u64) -> Self {
        Self(U256::from(price))
    }
}

impl fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: transferable value (escrow, payouts, custody). never wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Value(U256);

impl Value {
    pub fn new(amount: U256) -> Self {
        Self(amount)
    }

    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn value(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: Value) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Value) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Value) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Value) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl From<u64> for Value {
    fn from(amount: u64) -> Self {
        Self(U256::from(amount))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// saturating so that audit sums can never panic; callers compare against a checked total
impl Sum for Value {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, v| acc.saturating_add(v))
    }
}

impl<'a> Sum<&'a Value> for Value {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, v| acc.saturating_add(*v))
    }
}

// 1.4: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}
