//! Request placement and escrow deposit.

use super::core::Engine;
use super::results::EngineError;
use crate::account::CallContext;
use crate::events::{EventPayload, RequestPlacedEvent};
use crate::settlement::{SettlementBackend, SettlementInstruction};
use crate::types::{Energy, RequestId, UnitPrice, Value};
use tracing::{info, warn};

impl<B: SettlementBackend> Engine<B> {
    /// Append a purchase request, moving exactly `energy_amount * max_price_per_unit`
    /// of attached value into custody. Any rejection leaves books, custody and wallets untouched.
    pub fn place_request(
        &mut self,
        ctx: &CallContext,
        energy_amount: Energy,
        max_price_per_unit: UnitPrice,
    ) -> Result<RequestId, EngineError> {
        let (escrow, new_balance) = self
            .validate_request(ctx, energy_amount, max_price_per_unit)
            .inspect_err(|e| warn!(caller = %ctx.caller, error = %e, "request rejected"))?;

        let buyer = ctx.caller;
        let request_id = self.requests.next_id();

        let mut batch = self.new_batch();
        batch.add(SettlementInstruction::Collect {
            from: buyer,
            amount: escrow,
            request_id,
        });
        self.execute_batch(&batch)
            .inspect_err(|e| warn!(caller = %buyer, error = %e, "escrow collection failed"))?;

        // previewed in validate_request, cannot fail
        self.custody.deposit(escrow)?;
        let appended = self.requests.append(
            buyer,
            energy_amount,
            max_price_per_unit,
            escrow,
            self.current_time,
        );
        debug_assert_eq!(appended, request_id);
        self.account_mut(buyer).record_escrow(escrow);

        self.emit_event(EventPayload::RequestPlaced(RequestPlacedEvent {
            request_id,
            buyer,
            energy_amount,
            max_price_per_unit,
            escrowed_value: escrow,
            custody_balance: new_balance,
        }));

        info!(%request_id, %buyer, %escrow, custody = %new_balance, "request placed");
        Ok(request_id)
    }

    // returns (required escrow, custody balance after deposit)
    fn validate_request(
        &self,
        ctx: &CallContext,
        energy_amount: Energy,
        max_price_per_unit: UnitPrice,
    ) -> Result<(Value, Value), EngineError> {
        if energy_amount.is_zero() {
            return Err(EngineError::InvalidAmount {
                field: "energy_amount",
            });
        }

        if max_price_per_unit.is_zero() {
            return Err(EngineError::InvalidAmount {
                field: "max_price_per_unit",
            });
        }

        let required = energy_amount
            .checked_cost(max_price_per_unit)
            .ok_or(EngineError::AmountOverflow {
                context: "energy_amount * max_price_per_unit",
            })?;

        // exact match both ways: no silent overpayment, no underfunded request
        if ctx.attached_value != required {
            return Err(EngineError::InsufficientOrMismatchedValue {
                required,
                attached: ctx.attached_value,
            });
        }

        let new_balance = self
            .custody
            .preview_deposit(required)
            .map_err(|_| EngineError::AmountOverflow {
                context: "custody balance",
            })?;

        Ok((required, new_balance))
    }
}
