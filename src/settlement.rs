// 9.1 settlement.rs: the value-transfer seam. the engine describes every fund
// movement as a batch of instructions and hands it to a backend that applies it
// all-or-nothing. in-memory backend here; a chain adapter would implement the trait.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::account::Identity;
use crate::types::{RequestId, Value};

pub type BatchId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferReason {
    TradeProceeds,
    // buyer's change when the offer price is under the request's max price
    PriceImprovement,
    Refund,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementInstruction {
    // attached value moves from the caller's wallet into the engine vault
    Collect {
        from: Identity,
        amount: Value,
        request_id: RequestId,
    },

    // vault pays a party
    Payout {
        to: Identity,
        amount: Value,
        reason: TransferReason,
        request_id: RequestId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Committed,
}

/// Gross movement for one wallet inside a batch. Values are unsigned, so both sides are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetFlow {
    pub inflow: Value,
    pub outflow: Value,
}

// A batch of instructions executed atomically
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub batch_id: BatchId,
    pub instructions: Vec<SettlementInstruction>,
}

impl SettlementBatch {
    pub fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            instructions: Vec::new(),
        }
    }

    pub fn add(&mut self, instruction: SettlementInstruction) {
        self.instructions.push(instruction);
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Value entering the vault.
    pub fn collected(&self) -> Result<Value, SettlementError> {
        let mut total = Value::zero();
        for instruction in &self.instructions {
            if let SettlementInstruction::Collect { amount, .. } = instruction {
                total = total.checked_add(*amount).ok_or(SettlementError::Overflow)?;
            }
        }
        Ok(total)
    }

    /// Value leaving the vault.
    pub fn paid_out(&self) -> Result<Value, SettlementError> {
        let mut total = Value::zero();
        for instruction in &self.instructions {
            if let SettlementInstruction::Payout { amount, .. } = instruction {
                total = total.checked_add(*amount).ok_or(SettlementError::Overflow)?;
            }
        }
        Ok(total)
    }

    // Per-wallet flows for validation
    pub fn net_flows(&self) -> Result<HashMap<Identity, NetFlow>, SettlementError> {
        let mut flows: HashMap<Identity, NetFlow> = HashMap::new();

        for instruction in &self.instructions {
            match instruction {
                SettlementInstruction::Collect { from, amount, .. } => {
                    let flow = flows.entry(*from).or_default();
                    flow.outflow = flow.outflow.checked_add(*amount).ok_or(SettlementError::Overflow)?;
                }
                SettlementInstruction::Payout { to, amount, .. } => {
                    let flow = flows.entry(*to).or_default();
                    flow.inflow = flow.inflow.checked_add(*amount).ok_or(SettlementError::Overflow)?;
                }
            }
        }

        Ok(flows)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("Insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: Identity,
        required: Value,
        available: Value,
    },

    #[error("Vault shortfall: required {required}, available {available}")]
    VaultShortfall { required: Value, available: Value },

    #[error("Arithmetic overflow while applying batch")]
    Overflow,

    #[error("Cannot execute an empty batch")]
    EmptyBatch,

    #[error("Backend rejected batch: {0}")]
    Rejected(String),
}

// Trait for value-transfer backends. Implement this for a chain or payment rail.
pub trait SettlementBackend: fmt::Debug {
    // Apply a batch all-or-nothing, returning a commitment id
    fn execute(&mut self, batch: &SettlementBatch) -> Result<String, SettlementError>;

    fn check_status(&self, commitment: &str) -> BatchStatus;

    // Spendable balance of an external wallet
    fn balance_of(&self, account: Identity) -> Value;

    // Value held by the engine's own vault
    fn vault_balance(&self) -> Value;

    fn backend_type(&self) -> &str;
}

// In memory backend for tests and simulation
#[derive(Debug, Default)]
pub struct InMemorySettlement {
    wallets: HashMap<Identity, Value>,
    vault: Value,
    executed_batches: Vec<String>,
}

impl InMemorySettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, account: Identity, balance: Value) {
        self.wallets.insert(account, balance);
    }

    pub fn executed_count(&self) -> usize {
        self.executed_batches.len()
    }
}

impl SettlementBackend for InMemorySettlement {
    fn execute(&mut self, batch: &SettlementBatch) -> Result<String, SettlementError> {
        if batch.is_empty() {
            return Err(SettlementError::EmptyBatch);
        }

        // validate everything first
        let flows = batch.net_flows()?;
        let mut next_wallets = Vec::with_capacity(flows.len());
        for (account, flow) in &flows {
            let current = self.balance_of(*account);
            let credited = current.checked_add(flow.inflow).ok_or(SettlementError::Overflow)?;
            let next = credited
                .checked_sub(flow.outflow)
                .ok_or(SettlementError::InsufficientFunds {
                    account: *account,
                    required: flow.outflow,
                    available: credited,
                })?;
            next_wallets.push((*account, next));
        }

        let collected = batch.collected()?;
        let paid_out = batch.paid_out()?;
        let funded = self.vault.checked_add(collected).ok_or(SettlementError::Overflow)?;
        let next_vault = funded
            .checked_sub(paid_out)
            .ok_or(SettlementError::VaultShortfall {
                required: paid_out,
                available: funded,
            })?;

        // apply
        for (account, balance) in next_wallets {
            self.wallets.insert(account, balance);
        }
        self.vault = next_vault;

        let commitment = format!("batch-{}", batch.batch_id);
        self.executed_batches.push(commitment.clone());
        Ok(commitment)
    }

    fn check_status(&self, commitment: &str) -> BatchStatus {
        if self.executed_batches.iter().any(|c| c == commitment) {
            BatchStatus::Committed
        } else {
            BatchStatus::Pending
        }
    }

    fn balance_of(&self, account: Identity) -> Value {
        self.wallets.get(&account).copied().unwrap_or_default()
    }

    fn vault_balance(&self) -> Value {
        self.vault
    }

    fn backend_type(&self) -> &str {
        "in_memory"
    }
}
