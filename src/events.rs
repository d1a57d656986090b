// 11.0: every committed mutation produces an event. used for off-engine indexing,
// audit trails and state reconstruction. the EventPayload enum lists all event types.

use crate::account::Identity;
use crate::types::{Energy, OfferId, RequestId, Timestamp, UnitPrice, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    // Book events
    OfferPlaced(OfferPlacedEvent),
    RequestPlaced(RequestPlacedEvent),

    // Custody release events
    RequestSettled(RequestSettledEvent),
    RequestRefunded(RequestRefundedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferPlacedEvent {
    pub offer_id: OfferId,
    pub seller: Identity,
    pub energy_amount: Energy,
    pub price_per_unit: UnitPrice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPlacedEvent {
    pub request_id: RequestId,
    pub buyer: Identity,
    pub energy_amount: Energy,
    pub max_price_per_unit: UnitPrice,
    pub escrowed_value: Value,
    pub custody_balance: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSettledEvent {
    pub request_id: RequestId,
    pub offer_id: OfferId,
    pub buyer: Identity,
    pub seller: Identity,
    pub settled_by: Identity,
    pub seller_proceeds: Value,
    pub buyer_refund: Value,
    pub custody_balance: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRefundedEvent {
    pub request_id: RequestId,
    pub buyer: Identity,
    pub refunded_by: Identity,
    pub amount: Value,
    pub custody_balance: Value,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

/// Collects events for an external indexer.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<Event>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn last_id(&self) -> Option<EventId> {
        self.events.last().map(|e| e.id)
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
