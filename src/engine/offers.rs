//! Offer placement.

use super::core::Engine;
use super::results::EngineError;
use crate::account::CallContext;
use crate::events::{EventPayload, OfferPlacedEvent};
use crate::settlement::SettlementBackend;
use crate::types::{Energy, OfferId, UnitPrice, Value};
use tracing::{info, warn};

impl<B: SettlementBackend> Engine<B> {
    /// Append a sell offer for the caller. No funds move and nothing is matched.
    pub fn place_offer(
        &mut self,
        ctx: &CallContext,
        energy_amount: Energy,
        price_per_unit: UnitPrice,
    ) -> Result<OfferId, EngineError> {
        self.validate_offer(ctx, energy_amount, price_per_unit)
            .inspect_err(|e| warn!(caller = %ctx.caller, error = %e, "offer rejected"))?;

        let seller = ctx.caller;
        let offer_id = self
            .offers
            .append(seller, energy_amount, price_per_unit, self.current_time);

        self.emit_event(EventPayload::OfferPlaced(OfferPlacedEvent {
            offer_id,
            seller,
            energy_amount,
            price_per_unit,
        }));

        info!(%offer_id, %seller, %energy_amount, %price_per_unit, "offer placed");
        Ok(offer_id)
    }

    fn validate_offer(
        &self,
        ctx: &CallContext,
        energy_amount: Energy,
        price_per_unit: UnitPrice,
    ) -> Result<(), EngineError> {
        if energy_amount.is_zero() {
            return Err(EngineError::InvalidAmount {
                field: "energy_amount",
            });
        }

        if price_per_unit.is_zero() && !self.config.allow_free_energy {
            return Err(EngineError::InvalidAmount {
                field: "price_per_unit",
            });
        }

        // offers carry no value; anything attached would be stranded
        if !ctx.attached_value.is_zero() {
            return Err(EngineError::InsufficientOrMismatchedValue {
                required: Value::zero(),
                attached: ctx.attached_value,
            });
        }

        Ok(())
    }
}
