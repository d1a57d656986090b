// 8.0.2: result types and errors for engine operations.

use crate::account::Identity;
use crate::custody::CustodyError;
use crate::request::{RequestError, RequestStatus};
use crate::settlement::SettlementError;
use crate::types::{Energy, OfferId, RequestId, UnitPrice, Value};
use serde::{Deserialize, Serialize};

/// Outcome of a settlement or refund. `seller_proceeds + buyer_refund == released`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub offer_id: Option<OfferId>,
    pub released: Value,
    pub seller_proceeds: Value,
    pub buyer_refund: Value,
    pub custody_balance: Value,
    pub commitment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid amount for {field}: must be greater than zero")]
    InvalidAmount { field: &'static str },

    #[error("Attached value {attached} does not match required escrow {required}")]
    InsufficientOrMismatchedValue { required: Value, attached: Value },

    #[error("Amount overflow computing {context}")]
    AmountOverflow { context: &'static str },

    #[error("Request {request_id} is already {status:?}")]
    AlreadySettled {
        request_id: RequestId,
        status: RequestStatus,
    },

    #[error("Caller {caller} is not authorized to {action}")]
    Unauthorized {
        caller: Identity,
        action: &'static str,
    },

    #[error("Offer {0} not found")]
    OfferNotFound(OfferId),

    #[error("Request {0} not found")]
    RequestNotFound(RequestId),

    #[error("Offer price {offer_price} exceeds request max price {max_price}")]
    PriceAboveLimit {
        offer_price: UnitPrice,
        max_price: UnitPrice,
    },

    #[error("Offer {offer_id} has {available} energy left, request needs {requested}")]
    InsufficientOfferEnergy {
        offer_id: OfferId,
        available: Energy,
        requested: Energy,
    },

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),
}

impl From<RequestError> for EngineError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::NotFound(id) => EngineError::RequestNotFound(id),
            RequestError::AlreadyClosed { id, status } => EngineError::AlreadySettled {
                request_id: id,
                status,
            },
        }
    }
}

/// A failed invariant audit. Never expected; surfaced for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("Custody {custody} != open escrow {open_escrow}")]
    CustodyMismatch { custody: Value, open_escrow: Value },

    #[error("Request {request_id} escrow {escrowed} != energy x max price")]
    EscrowInexact { request_id: RequestId, escrowed: Value },

    #[error("Vault balance {vault} != custody {custody}")]
    VaultMismatch { vault: Value, custody: Value },

    #[error("Per-account escrow {accounts} != custody {custody}")]
    AccountMismatch { accounts: Value, custody: Value },

    #[error("Custody ledger {deposited} deposited - {released} released != balance {custody}")]
    LedgerMismatch {
        deposited: Value,
        released: Value,
        custody: Value,
    },

    #[error("Custody saw {deposits} deposits and {releases} releases for {requests} requests, {closed} closed")]
    CountMismatch {
        deposits: u64,
        releases: u64,
        requests: usize,
        closed: usize,
    },
}
