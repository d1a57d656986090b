//! JSON-facing command and query surface for the presentation layer.
//!
//! Commands mutate and always run under a host-supplied [`CallContext`]; the
//! acting identity is never part of the payload. Queries are pure reads.

use crate::account::{Account, CallContext, Identity};
use crate::engine::{BookSnapshot, Engine, EngineError, SettlementResult};
use crate::offer::{Offer, OfferColumns};
use crate::request::Request;
use crate::settlement::SettlementBackend;
use crate::types::{Energy, OfferId, RequestId, UnitPrice, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineCommand {
    PlaceOffer {
        energy_amount: Energy,
        price_per_unit: UnitPrice,
    },
    PlaceRequest {
        energy_amount: Energy,
        max_price_per_unit: UnitPrice,
    },
    SettleRequest {
        request_id: RequestId,
        offer_id: OfferId,
    },
    RefundRequest {
        request_id: RequestId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineQuery {
    ListOffers,
    OfferColumns,
    ListRequests,
    ContractBalance,
    Account { identity: Identity },
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ApiResponse {
    OfferPlaced { offer_id: OfferId },
    RequestPlaced { request_id: RequestId },
    Released(SettlementResult),
    Offers(Vec<Offer>),
    OfferColumns(OfferColumns),
    Requests(Vec<Request>),
    ContractBalance { balance: Value },
    Account(Option<Account>),
    Snapshot(BookSnapshot),
}

/// Stable error classification for clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidAmount,
    InsufficientOrMismatchedValue,
    AmountOverflow,
    AlreadySettled,
    Unauthorized,
    NotFound,
    PriceAboveLimit,
    InsufficientOfferEnergy,
    TransferFailed,
    Internal,
}

impl From<&EngineError> for ErrorCode {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            EngineError::InsufficientOrMismatchedValue { .. } => ErrorCode::InsufficientOrMismatchedValue,
            EngineError::AmountOverflow { .. } => ErrorCode::AmountOverflow,
            EngineError::AlreadySettled { .. } => ErrorCode::AlreadySettled,
            EngineError::Unauthorized { .. } => ErrorCode::Unauthorized,
            EngineError::OfferNotFound(_) | EngineError::RequestNotFound(_) => ErrorCode::NotFound,
            EngineError::PriceAboveLimit { .. } => ErrorCode::PriceAboveLimit,
            EngineError::InsufficientOfferEnergy { .. } => ErrorCode::InsufficientOfferEnergy,
            EngineError::Settlement(_) => ErrorCode::TransferFailed,
            EngineError::Custody(_) => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self {
            code: ErrorCode::from(&err),
            message: err.to_string(),
        }
    }
}

impl<B: SettlementBackend> Engine<B> {
    pub fn execute_command(
        &mut self,
        ctx: &CallContext,
        command: EngineCommand,
    ) -> Result<ApiResponse, ApiError> {
        let response = match command {
            EngineCommand::PlaceOffer {
                energy_amount,
                price_per_unit,
            } => ApiResponse::OfferPlaced {
                offer_id: self.place_offer(ctx, energy_amount, price_per_unit)?,
            },
            EngineCommand::PlaceRequest {
                energy_amount,
                max_price_per_unit,
            } => ApiResponse::RequestPlaced {
                request_id: self.place_request(ctx, energy_amount, max_price_per_unit)?,
            },
            EngineCommand::SettleRequest {
                request_id,
                offer_id,
            } => ApiResponse::Released(self.settle_request(ctx, request_id, offer_id)?),
            EngineCommand::RefundRequest { request_id } => {
                ApiResponse::Released(self.refund_request(ctx, request_id)?)
            }
        };
        Ok(response)
    }

    pub fn execute_query(&self, query: &EngineQuery) -> ApiResponse {
        match query {
            EngineQuery::ListOffers => ApiResponse::Offers(self.list_offers().to_vec()),
            EngineQuery::OfferColumns => ApiResponse::OfferColumns(self.offer_columns()),
            EngineQuery::ListRequests => ApiResponse::Requests(self.list_requests().to_vec()),
            EngineQuery::ContractBalance => ApiResponse::ContractBalance {
                balance: self.contract_balance(),
            },
            EngineQuery::Account { identity } => ApiResponse::Account(self.account(*identity).cloned()),
            EngineQuery::Snapshot => ApiResponse::Snapshot(self.snapshot()),
        }
    }
}
