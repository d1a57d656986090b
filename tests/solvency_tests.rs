//! Escrow solvency tests
//!
//! End-to-end marketplace flows: every unit of value a buyer escrows stays in
//! custody until it is paid to a seller or returned, and rejected calls move nothing.

use energy_escrow_core::*;

const SELLER: u64 = 1;
const BUYER: u64 = 2;
const OTHER_BUYER: u64 = 3;
const STRANGER: u64 = 7;
const OPERATOR: u64 = 9;

fn id(n: u64) -> Identity {
    Identity::from_low_u64(n)
}

fn ctx(n: u64) -> CallContext {
    CallContext::new(id(n))
}

fn engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default().with_operator(id(OPERATOR)));
    for party in [BUYER, OTHER_BUYER] {
        engine.backend_mut().set_balance(id(party), Value::from(1_000));
    }
    engine
}

/// Basic book behavior.
mod book_tests {
    use super::*;

    #[test]
    fn offer_is_listed_as_placed() {
        let mut engine = engine();
        engine
            .place_offer(&ctx(SELLER), Energy::from(10), UnitPrice::from(5))
            .unwrap();

        let offers = engine.list_offers();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].energy_amount, Energy::from(10));
        assert_eq!(offers[0].price_per_unit, UnitPrice::from(5));
        assert_eq!(offers[0].seller, id(SELLER));
        assert_eq!(engine.contract_balance(), Value::zero());
    }

    #[test]
    fn exact_escrow_is_accepted() {
        let mut engine = engine();
        engine
            .place_request(&ctx(BUYER).with_value(Value::from(12)), Energy::from(4), UnitPrice::from(3))
            .unwrap();

        assert_eq!(engine.contract_balance(), Value::from(12));
        assert_eq!(engine.backend().balance_of(id(BUYER)), Value::from(988));
        assert_eq!(engine.list_requests()[0].status, RequestStatus::Created);
    }

    #[test]
    fn short_escrow_is_rejected_without_effect() {
        let mut engine = engine();
        let before = engine.contract_balance();

        let err = engine
            .place_request(&ctx(BUYER).with_value(Value::from(11)), Energy::from(4), UnitPrice::from(3))
            .unwrap_err();

        assert_eq!(
            err,
            EngineError::InsufficientOrMismatchedValue {
                required: Value::from(12),
                attached: Value::from(11),
            }
        );
        assert_eq!(engine.contract_balance(), before);
        assert!(engine.list_requests().is_empty());
        assert_eq!(engine.backend().balance_of(id(BUYER)), Value::from(1_000));
    }

    #[test]
    fn overpaid_escrow_is_rejected() {
        let mut engine = engine();
        let err = engine
            .place_request(&ctx(BUYER).with_value(Value::from(13)), Energy::from(4), UnitPrice::from(3))
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientOrMismatchedValue { .. }));
        assert!(engine.events().is_empty());
    }

    #[test]
    fn identical_offers_get_distinct_ids() {
        let mut engine = engine();
        let first = engine
            .place_offer(&ctx(SELLER), Energy::from(10), UnitPrice::from(5))
            .unwrap();
        let second = engine
            .place_offer(&ctx(SELLER), Energy::from(10), UnitPrice::from(5))
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(engine.list_offers().len(), 2);
        assert_eq!(engine.offers_by_seller(id(SELLER)).len(), 2);
    }
}

/// Refund and settlement flows.
mod release_tests {
    use super::*;

    #[test]
    fn refund_releases_only_that_escrow() {
        let mut engine = engine();
        let small = engine
            .place_request(&ctx(BUYER).with_value(Value::from(12)), Energy::from(4), UnitPrice::from(3))
            .unwrap();
        let large = engine
            .place_request(&ctx(BUYER).with_value(Value::from(30)), Energy::from(6), UnitPrice::from(5))
            .unwrap();
        assert_eq!(engine.contract_balance(), Value::from(42));

        let result = engine.refund_request(&ctx(BUYER), small).unwrap();

        assert_eq!(result.released, Value::from(12));
        assert_eq!(engine.contract_balance(), Value::from(30));
        assert_eq!(engine.get_request(small).unwrap().status, RequestStatus::Refunded);
        assert_eq!(engine.get_request(large).unwrap().status, RequestStatus::Created);
        assert_eq!(engine.backend().balance_of(id(BUYER)), Value::from(970));
        engine.check_invariants().unwrap();
    }

    #[test]
    fn operator_can_refund() {
        let mut engine = engine();
        let request = engine
            .place_request(&ctx(BUYER).with_value(Value::from(12)), Energy::from(4), UnitPrice::from(3))
            .unwrap();

        engine.refund_request(&ctx(OPERATOR), request).unwrap();
        assert_eq!(engine.contract_balance(), Value::zero());
        assert_eq!(engine.backend().balance_of(id(BUYER)), Value::from(1_000));
    }

    #[test]
    fn settlement_pays_seller_and_returns_improvement() {
        let mut engine = engine();
        let offer = engine
            .place_offer(&ctx(SELLER), Energy::from(10), UnitPrice::from(4))
            .unwrap();
        let request = engine
            .place_request(&ctx(BUYER).with_value(Value::from(30)), Energy::from(6), UnitPrice::from(5))
            .unwrap();

        let result = engine.settle_request(&ctx(SELLER), request, offer).unwrap();

        assert_eq!(result.status, RequestStatus::Settled);
        assert_eq!(result.offer_id, Some(offer));
        assert_eq!(result.seller_proceeds, Value::from(24));
        assert_eq!(result.buyer_refund, Value::from(6));
        assert_eq!(engine.backend().balance_of(id(SELLER)), Value::from(24));
        assert_eq!(engine.backend().balance_of(id(BUYER)), Value::from(976));
        assert_eq!(engine.offer_remaining_energy(offer), Some(Energy::from(4)));
        assert_eq!(engine.get_request(request).unwrap().settled_against, Some(offer));

        let seller = engine.account(id(SELLER)).unwrap();
        assert_eq!(seller.total_received, Value::from(24));
        engine.check_invariants().unwrap();
    }

    #[test]
    fn settled_request_cannot_be_released_again() {
        let mut engine = engine();
        let offer = engine
            .place_offer(&ctx(SELLER), Energy::from(20), UnitPrice::from(4))
            .unwrap();
        let request = engine
            .place_request(&ctx(BUYER).with_value(Value::from(30)), Energy::from(6), UnitPrice::from(5))
            .unwrap();
        engine.settle_request(&ctx(SELLER), request, offer).unwrap();
        let balance = engine.contract_balance();

        let again = engine.settle_request(&ctx(SELLER), request, offer);
        assert!(matches!(again, Err(EngineError::AlreadySettled { .. })));

        let refund = engine.refund_request(&ctx(BUYER), request);
        assert!(matches!(refund, Err(EngineError::AlreadySettled { .. })));

        assert_eq!(engine.contract_balance(), balance);
        assert_eq!(engine.offer_remaining_energy(offer), Some(Energy::from(14)));
    }

    #[test]
    fn refunded_request_cannot_be_settled() {
        let mut engine = engine();
        let offer = engine
            .place_offer(&ctx(SELLER), Energy::from(20), UnitPrice::from(4))
            .unwrap();
        let request = engine
            .place_request(&ctx(BUYER).with_value(Value::from(30)), Energy::from(6), UnitPrice::from(5))
            .unwrap();
        engine.refund_request(&ctx(BUYER), request).unwrap();

        let err = engine.settle_request(&ctx(SELLER), request, offer).unwrap_err();
        assert_eq!(
            err,
            EngineError::AlreadySettled {
                request_id: request,
                status: RequestStatus::Refunded,
            }
        );
    }
}

/// Who may release escrow.
mod authorization_tests {
    use super::*;

    fn open_trade(engine: &mut Engine) -> (OfferId, RequestId) {
        let offer = engine
            .place_offer(&ctx(SELLER), Energy::from(10), UnitPrice::from(4))
            .unwrap();
        let request = engine
            .place_request(&ctx(BUYER).with_value(Value::from(30)), Energy::from(6), UnitPrice::from(5))
            .unwrap();
        (offer, request)
    }

    #[test]
    fn stranger_cannot_settle_or_refund() {
        let mut engine = engine();
        let (offer, request) = open_trade(&mut engine);

        assert!(matches!(
            engine.settle_request(&ctx(STRANGER), request, offer),
            Err(EngineError::Unauthorized { .. })
        ));
        assert!(matches!(
            engine.refund_request(&ctx(STRANGER), request),
            Err(EngineError::Unauthorized { .. })
        ));
        assert_eq!(engine.contract_balance(), Value::from(30));
    }

    #[test]
    fn buyer_cannot_settle_and_seller_cannot_refund() {
        let mut engine = engine();
        let (offer, request) = open_trade(&mut engine);

        assert!(matches!(
            engine.settle_request(&ctx(BUYER), request, offer),
            Err(EngineError::Unauthorized { .. })
        ));
        assert!(matches!(
            engine.refund_request(&ctx(SELLER), request),
            Err(EngineError::Unauthorized { .. })
        ));
    }

    #[test]
    fn operator_can_settle() {
        let mut engine = engine();
        let (offer, request) = open_trade(&mut engine);

        engine.settle_request(&ctx(OPERATOR), request, offer).unwrap();
        assert_eq!(engine.backend().balance_of(id(SELLER)), Value::from(24));

        match &engine.events().last().unwrap().payload {
            EventPayload::RequestSettled(event) => assert_eq!(event.settled_by, id(OPERATOR)),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn without_operator_only_parties_release() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.backend_mut().set_balance(id(BUYER), Value::from(100));
        let (offer, request) = open_trade(&mut engine);

        assert!(matches!(
            engine.settle_request(&ctx(OPERATOR), request, offer),
            Err(EngineError::Unauthorized { .. })
        ));
        engine.settle_request(&ctx(SELLER), request, offer).unwrap();
    }

    #[test]
    fn attached_value_rejected_on_release() {
        let mut engine = engine();
        let (offer, request) = open_trade(&mut engine);

        let paid = ctx(SELLER).with_value(Value::from(1));
        assert!(matches!(
            engine.settle_request(&paid, request, offer),
            Err(EngineError::InsufficientOrMismatchedValue { .. })
        ));
        let paid = ctx(BUYER).with_value(Value::from(1));
        assert!(matches!(
            engine.refund_request(&paid, request),
            Err(EngineError::InsufficientOrMismatchedValue { .. })
        ));
        assert!(engine.get_request(request).unwrap().is_open());
    }
}

/// Backend failures must leave the engine untouched.
mod backend_failure_tests {
    use super::*;

    // wraps the in-memory backend and rejects every batch once tripped
    #[derive(Debug, Default)]
    struct TrippableBackend {
        inner: InMemorySettlement,
        tripped: bool,
    }

    impl SettlementBackend for TrippableBackend {
        fn execute(&mut self, batch: &SettlementBatch) -> Result<String, SettlementError> {
            if self.tripped {
                return Err(SettlementError::Rejected("rail offline".to_string()));
            }
            self.inner.execute(batch)
        }

        fn check_status(&self, commitment: &str) -> BatchStatus {
            self.inner.check_status(commitment)
        }

        fn balance_of(&self, account: Identity) -> Value {
            self.inner.balance_of(account)
        }

        fn vault_balance(&self) -> Value {
            self.inner.vault_balance()
        }

        fn backend_type(&self) -> &str {
            "trippable"
        }
    }

    fn engine_with_open_trade() -> (Engine<TrippableBackend>, OfferId, RequestId) {
        let mut backend = TrippableBackend::default();
        backend.inner.set_balance(id(BUYER), Value::from(100));
        let config = EngineConfig::default().with_operator(id(OPERATOR));
        let mut engine = Engine::with_backend(config, backend);

        let offer = engine
            .place_offer(&ctx(SELLER), Energy::from(10), UnitPrice::from(4))
            .unwrap();
        let request = engine
            .place_request(&ctx(BUYER).with_value(Value::from(30)), Energy::from(6), UnitPrice::from(5))
            .unwrap();
        (engine, offer, request)
    }

    #[test]
    fn failed_payout_keeps_request_open() {
        let (mut engine, offer, request) = engine_with_open_trade();
        engine.backend_mut().tripped = true;
        let events_before = engine.events().len();

        let err = engine.settle_request(&ctx(SELLER), request, offer).unwrap_err();
        assert!(matches!(err, EngineError::Settlement(SettlementError::Rejected(_))));

        assert!(engine.get_request(request).unwrap().is_open());
        assert_eq!(engine.contract_balance(), Value::from(30));
        assert_eq!(engine.offer_remaining_energy(offer), Some(Energy::from(10)));
        assert_eq!(engine.events().len(), events_before);
        engine.check_invariants().unwrap();

        engine.backend_mut().tripped = false;
        engine.settle_request(&ctx(SELLER), request, offer).unwrap();
        engine.check_invariants().unwrap();
    }

    #[test]
    fn failed_collect_creates_no_request() {
        let (mut engine, _, _) = engine_with_open_trade();
        engine.backend_mut().tripped = true;

        let err = engine
            .place_request(&ctx(BUYER).with_value(Value::from(12)), Energy::from(4), UnitPrice::from(3))
            .unwrap_err();
        assert!(matches!(err, EngineError::Settlement(_)));
        assert_eq!(engine.list_requests().len(), 1);
        assert_eq!(engine.contract_balance(), Value::from(30));
    }

    #[test]
    fn commitments_are_tracked() {
        let (mut engine, offer, request) = engine_with_open_trade();
        let result = engine.settle_request(&ctx(SELLER), request, offer).unwrap();
        assert_eq!(engine.backend().check_status(&result.commitment), BatchStatus::Committed);
        assert_eq!(engine.backend().check_status("batch-999"), BatchStatus::Pending);
    }
}
