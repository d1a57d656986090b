//! Escrow release: settlement against an offer, or refund to the buyer.
//!
//! Both paths take a request out of `Created` exactly once and release exactly
//! its escrowed value from custody. Payouts leave through the settlement
//! backend in a single batch before any engine state changes, so a rejected
//! transfer leaves the request open and custody intact.

use super::core::Engine;
use super::results::{EngineError, SettlementResult};
use crate::account::{CallContext, Identity};
use crate::events::{EventPayload, RequestRefundedEvent, RequestSettledEvent};
use crate::request::{Request, RequestStatus};
use crate::settlement::{SettlementBackend, SettlementInstruction, TransferReason};
use crate::types::{OfferId, RequestId, Value};
use tracing::{info, warn};

/// Validated release, ready to commit.
struct ReleasePlan {
    request: Request,
    offer: Option<(OfferId, Identity)>,
    seller_proceeds: Value,
    buyer_refund: Value,
    new_balance: Value,
}

impl<B: SettlementBackend> Engine<B> {
    /// Release a request's escrow to the seller of `offer_id`.
    ///
    /// Callable by that seller or by the configured operator. The seller is paid
    /// `energy_amount * offer price`; the rest of the escrow goes back to the buyer
    /// as price improvement.
    pub fn settle_request(
        &mut self,
        ctx: &CallContext,
        request_id: RequestId,
        offer_id: OfferId,
    ) -> Result<SettlementResult, EngineError> {
        let plan = self
            .plan_settlement(ctx, request_id, offer_id)
            .inspect_err(|e| warn!(caller = %ctx.caller, %request_id, %offer_id, error = %e, "settlement rejected"))?;

        let buyer = plan.request.buyer;
        let seller = plan.offer.map(|(_, seller)| seller).unwrap_or_default();
        let result = self.commit_release(plan, RequestStatus::Settled)?;

        self.emit_event(EventPayload::RequestSettled(RequestSettledEvent {
            request_id,
            offer_id,
            buyer,
            seller,
            settled_by: ctx.caller,
            seller_proceeds: result.seller_proceeds,
            buyer_refund: result.buyer_refund,
            custody_balance: result.custody_balance,
        }));

        info!(
            %request_id,
            %offer_id,
            seller_proceeds = %result.seller_proceeds,
            buyer_refund = %result.buyer_refund,
            custody = %result.custody_balance,
            "request settled"
        );
        Ok(result)
    }

    /// Return a request's full escrow to its buyer. Callable by the buyer or the operator.
    pub fn refund_request(
        &mut self,
        ctx: &CallContext,
        request_id: RequestId,
    ) -> Result<SettlementResult, EngineError> {
        let plan = self
            .plan_refund(ctx, request_id)
            .inspect_err(|e| warn!(caller = %ctx.caller, %request_id, error = %e, "refund rejected"))?;

        let buyer = plan.request.buyer;
        let result = self.commit_release(plan, RequestStatus::Refunded)?;

        self.emit_event(EventPayload::RequestRefunded(RequestRefundedEvent {
            request_id,
            buyer,
            refunded_by: ctx.caller,
            amount: result.released,
            custody_balance: result.custody_balance,
        }));

        info!(%request_id, %buyer, amount = %result.released, custody = %result.custody_balance, "request refunded");
        Ok(result)
    }

    fn plan_settlement(
        &self,
        ctx: &CallContext,
        request_id: RequestId,
        offer_id: OfferId,
    ) -> Result<ReleasePlan, EngineError> {
        reject_attached_value(ctx)?;

        self.requests
            .get(request_id)
            .ok_or(EngineError::RequestNotFound(request_id))?;
        let offer = self
            .offers
            .get(offer_id)
            .ok_or(EngineError::OfferNotFound(offer_id))?;

        if ctx.caller != offer.seller && !self.config.is_operator(ctx.caller) {
            return Err(EngineError::Unauthorized {
                caller: ctx.caller,
                action: "settle request",
            });
        }

        let request = self.requests.get_open(request_id)?.clone();

        if offer.price_per_unit > request.max_price_per_unit {
            return Err(EngineError::PriceAboveLimit {
                offer_price: offer.price_per_unit,
                max_price: request.max_price_per_unit,
            });
        }

        let available = self.offers.remaining(offer_id).unwrap_or_default();
        if request.energy_amount > available {
            return Err(EngineError::InsufficientOfferEnergy {
                offer_id,
                available,
                requested: request.energy_amount,
            });
        }

        let seller_proceeds = request
            .energy_amount
            .checked_cost(offer.price_per_unit)
            .ok_or(EngineError::AmountOverflow {
                context: "energy_amount * offer price",
            })?;
        // offer price <= max price, so proceeds never exceed the escrow
        let buyer_refund = request
            .escrowed_value
            .checked_sub(seller_proceeds)
            .ok_or(EngineError::AmountOverflow {
                context: "price improvement",
            })?;
        let new_balance = self.custody.preview_release(request.escrowed_value)?;

        Ok(ReleasePlan {
            offer: Some((offer_id, offer.seller)),
            request,
            seller_proceeds,
            buyer_refund,
            new_balance,
        })
    }

    fn plan_refund(&self, ctx: &CallContext, request_id: RequestId) -> Result<ReleasePlan, EngineError> {
        reject_attached_value(ctx)?;

        let request = self
            .requests
            .get(request_id)
            .ok_or(EngineError::RequestNotFound(request_id))?;

        if ctx.caller != request.buyer && !self.config.is_operator(ctx.caller) {
            return Err(EngineError::Unauthorized {
                caller: ctx.caller,
                action: "refund request",
            });
        }

        let request = self.requests.get_open(request_id)?.clone();
        let new_balance = self.custody.preview_release(request.escrowed_value)?;

        Ok(ReleasePlan {
            buyer_refund: request.escrowed_value,
            request,
            offer: None,
            seller_proceeds: Value::zero(),
            new_balance,
        })
    }

    // executes the payout batch, then applies the previewed state changes
    fn commit_release(
        &mut self,
        plan: ReleasePlan,
        status: RequestStatus,
    ) -> Result<SettlementResult, EngineError> {
        let request = plan.request;
        let refund_reason = match status {
            RequestStatus::Settled => TransferReason::PriceImprovement,
            _ => TransferReason::Refund,
        };

        let mut batch = self.new_batch();
        if let Some((_, seller)) = plan.offer {
            if !plan.seller_proceeds.is_zero() {
                batch.add(SettlementInstruction::Payout {
                    to: seller,
                    amount: plan.seller_proceeds,
                    reason: TransferReason::TradeProceeds,
                    request_id: request.id,
                });
            }
        }
        if !plan.buyer_refund.is_zero() {
            batch.add(SettlementInstruction::Payout {
                to: request.buyer,
                amount: plan.buyer_refund,
                reason: refund_reason,
                request_id: request.id,
            });
        }

        let commitment = self
            .execute_batch(&batch)
            .inspect_err(|e| warn!(request_id = %request.id, error = %e, "payout failed"))?;

        // all previewed in plan_*, none of these can fail now
        let offer_id = plan.offer.map(|(id, _)| id);
        if let Some(id) = offer_id {
            self.offers
                .commit(id, request.energy_amount)
                .map_err(|available| EngineError::InsufficientOfferEnergy {
                    offer_id: id,
                    available,
                    requested: request.energy_amount,
                })?;
        }
        self.custody.release(request.escrowed_value)?;
        self.requests
            .close(request.id, status, offer_id, self.current_time)?;

        self.account_mut(request.buyer).close_escrow(request.escrowed_value);
        if !plan.buyer_refund.is_zero() {
            self.account_mut(request.buyer).record_refund(plan.buyer_refund);
        }
        if let Some((_, seller)) = plan.offer {
            self.account_mut(seller).record_receipt(plan.seller_proceeds);
        }

        Ok(SettlementResult {
            request_id: request.id,
            status,
            offer_id,
            released: request.escrowed_value,
            seller_proceeds: plan.seller_proceeds,
            buyer_refund: plan.buyer_refund,
            custody_balance: plan.new_balance,
            commitment,
        })
    }
}

// release calls move value out of custody, never in
fn reject_attached_value(ctx: &CallContext) -> Result<(), EngineError> {
    if ctx.attached_value.is_zero() {
        Ok(())
    } else {
        Err(EngineError::InsufficientOrMismatchedValue {
            required: Value::zero(),
            attached: ctx.attached_value,
        })
    }
}
