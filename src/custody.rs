// 9.2 custody.rs: the engine-held escrow balance. deposit on request creation,
// release on settlement or refund. every change is checked, nothing wraps.

use serde::{Deserialize, Serialize};

use crate::types::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    #[error("Custody overflow: balance {balance}, deposit {amount}")]
    Overflow { balance: Value, amount: Value },

    #[error("Custody underflow: balance {balance}, release {amount}")]
    InsufficientCustody { balance: Value, amount: Value },
}

/// Process-wide custody. `balance` always equals the escrow of open requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustodyVault {
    balance: Value,
    // lifetime totals, saturating. audit only.
    total_deposited: Value,
    total_released: Value,
    deposit_count: u64,
    release_count: u64,
}

impl CustodyVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> Value {
        self.balance
    }

    /// Balance after a deposit, without applying it.
    pub fn preview_deposit(&self, amount: Value) -> Result<Value, CustodyError> {
        self.balance
            .checked_add(amount)
            .ok_or(CustodyError::Overflow {
                balance: self.balance,
                amount,
            })
    }

    /// Balance after a release, without applying it.
    pub fn preview_release(&self, amount: Value) -> Result<Value, CustodyError> {
        self.balance
            .checked_sub(amount)
            .ok_or(CustodyError::InsufficientCustody {
                balance: self.balance,
                amount,
            })
    }

    pub fn deposit(&mut self, amount: Value) -> Result<Value, CustodyError> {
        let next = self.preview_deposit(amount)?;
        self.balance = next;
        self.total_deposited = self.total_deposited.saturating_add(amount);
        self.deposit_count += 1;
        Ok(next)
    }

    pub fn release(&mut self, amount: Value) -> Result<Value, CustodyError> {
        let next = self.preview_release(amount)?;
        self.balance = next;
        self.total_released = self.total_released.saturating_add(amount);
        self.release_count += 1;
        Ok(next)
    }

    pub fn total_deposited(&self) -> Value {
        self.total_deposited
    }

    pub fn total_released(&self) -> Value {
        self.total_released
    }

    pub fn deposit_count(&self) -> u64 {
        self.deposit_count
    }

    pub fn release_count(&self) -> u64 {
        self.release_count
    }
}
