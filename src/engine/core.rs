// 8.0 engine/core.rs: main engine. holds both books, custody, accounts and the value-transfer backend.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::account::{Account, Identity};
use crate::custody::CustodyVault;
use crate::events::{Event, EventEmitter, EventId, EventPayload};
use crate::offer::OfferBook;
use crate::request::RequestBook;
use crate::settlement::{BatchId, InMemorySettlement, SettlementBackend, SettlementBatch};
use crate::types::Timestamp;
use std::collections::HashMap;
use tracing::debug;

/** 8.1: main engine struct. all state lives here, every mutation goes through &mut self */
#[derive(Debug)]
pub struct Engine<B: SettlementBackend = InMemorySettlement> {
    pub(super) config: EngineConfig,
    pub(super) offers: OfferBook,
    pub(super) requests: RequestBook,
    pub(super) custody: CustodyVault,
    pub(super) accounts: HashMap<Identity, Account>,
    pub(super) backend: B,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) next_batch_id: BatchId,
    pub(super) current_time: Timestamp,
}

impl Engine<InMemorySettlement> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, InMemorySettlement::new())
    }
}

impl<B: SettlementBackend> Engine<B> {
    pub fn with_backend(config: EngineConfig, backend: B) -> Self {
        Self {
            config,
            offers: OfferBook::new(),
            requests: RequestBook::new(),
            custody: CustodyVault::new(),
            accounts: HashMap::new(),
            backend,
            events: Vec::new(),
            next_event_id: 1,
            next_batch_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis().saturating_add(millis));
    }

    /// Move the clock to wall-clock time. Never moves it backwards.
    pub fn sync_clock(&mut self) -> Timestamp {
        self.current_time = self.current_time.max(Timestamp::now());
        self.current_time
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // wallet funding in tests and simulations. never touches engine state.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Forward retained events newer than `after` to an external emitter.
    /// Returns how many were forwarded.
    pub fn publish_events<E: EventEmitter>(&self, after: Option<EventId>, emitter: &mut E) -> usize {
        let mut forwarded = 0;
        for event in self.events.iter().filter(|e| after.map_or(true, |id| e.id > id)) {
            emitter.emit(event.clone());
            forwarded += 1;
        }
        forwarded
    }

    pub(super) fn account_mut(&mut self, identity: Identity) -> &mut Account {
        self.accounts
            .entry(identity)
            .or_insert_with(|| Account::new(identity))
    }

    // the id is only consumed once the backend commits the batch
    pub(super) fn new_batch(&self) -> SettlementBatch {
        SettlementBatch::new(self.next_batch_id)
    }

    pub(super) fn execute_batch(&mut self, batch: &SettlementBatch) -> Result<String, EngineError> {
        let commitment = self.backend.execute(batch)?;
        self.next_batch_id += 1;
        debug!(
            batch_id = batch.batch_id,
            instructions = batch.instruction_count(),
            backend = self.backend.backend_type(),
            %commitment,
            "settlement batch committed"
        );
        Ok(commitment)
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        debug!(event_id = event.id.0, payload = ?event.payload, "event emitted");

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::CallContext;
    use crate::events::EventCollector;
    use crate::types::{Energy, UnitPrice};

    fn place_offers(engine: &mut Engine, count: u64) {
        let seller = CallContext::new(Identity::from_low_u64(1));
        for i in 0..count {
            engine
                .place_offer(&seller, Energy::from(10 + i), UnitPrice::from(5))
                .unwrap();
        }
    }

    #[test]
    fn event_log_is_bounded() {
        let config = EngineConfig {
            max_events: 3,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(config);
        place_offers(&mut engine, 5);

        assert_eq!(engine.events().len(), 3);
        assert_eq!(engine.events()[0].id, EventId(3));
        assert_eq!(engine.recent_events(1)[0].id, EventId(5));
    }

    #[test]
    fn publish_events_resumes_after_cursor() {
        let mut engine = Engine::new(EngineConfig::default());
        let mut collector = EventCollector::new();
        place_offers(&mut engine, 2);

        assert_eq!(engine.publish_events(None, &mut collector), 2);
        let cursor = collector.last_id();

        place_offers(&mut engine, 1);
        assert_eq!(engine.publish_events(cursor, &mut collector), 1);
        assert_eq!(collector.events().len(), 3);
        assert_eq!(collector.last_id(), Some(EventId(3)));
    }

    #[test]
    fn time_moves_forward() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.set_time(Timestamp::from_millis(1_000));
        engine.advance_time(500);
        assert_eq!(engine.time(), Timestamp::from_millis(1_500));

        engine.advance_time(i64::MAX);
        assert_eq!(engine.time(), Timestamp::from_millis(i64::MAX));
    }

    #[test]
    fn synced_clock_stamps_records() {
        let mut engine = Engine::new(EngineConfig::default());
        let now = engine.sync_clock();
        assert!(now.as_millis() > 0);

        place_offers(&mut engine, 1);
        assert_eq!(engine.list_offers()[0].created_at, now);
        assert_eq!(engine.events()[0].timestamp, now);
    }

    #[test]
    fn sync_clock_never_rewinds() {
        let mut engine = Engine::new(EngineConfig::default());
        let future = Timestamp::from_millis(i64::MAX);
        engine.set_time(future);
        assert_eq!(engine.sync_clock(), future);
    }
}
