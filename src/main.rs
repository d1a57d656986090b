//! Energy Escrow Marketplace Simulation.
//!
//! Walks the offer book, escrowed requests, refunds and settlement against the
//! in-memory settlement backend. Pass a JSON config path to override the
//! testnet preset; `RUST_LOG` overrides the configured log filter.

use energy_escrow_core::*;
use tracing_subscriber::EnvFilter;

const SELLER: u64 = 1;
const BUYER: u64 = 2;
const OPERATOR: u64 = 9;

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => MarketplaceConfig::load(&path).unwrap_or_else(|e| {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }),
        None => MarketplaceConfig::testnet().with_operator(Identity::from_low_u64(OPERATOR)),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("Energy Escrow Marketplace Simulation");
    println!("Environment: {:?}\n", config.environment);

    scenario_a_offer_listing(&config);
    scenario_b_exact_escrow(&config);
    scenario_c_mismatched_escrow(&config);
    scenario_d_refund(&config);
    scenario_e_settlement(&config);

    println!("\nAll simulations completed successfully.");
}

fn funded_engine(config: &MarketplaceConfig, buyer: Identity, amount: u64) -> Engine {
    let mut engine = Engine::new(config.engine.clone());
    engine.sync_clock();
    engine.backend_mut().set_balance(buyer, Value::from(amount));
    engine
}

/// A seller lists energy; the book shows it as placed.
fn scenario_a_offer_listing(config: &MarketplaceConfig) {
    println!("Scenario A: Offer Listing\n");

    let mut engine = Engine::new(config.engine.clone());
    engine.sync_clock();
    let seller = CallContext::new(Identity::from_low_u64(SELLER));

    let offer_id = engine
        .place_offer(&seller, Energy::from(10), UnitPrice::from(5))
        .unwrap();

    let offers = engine.list_offers();
    println!("  Seller {} lists 10 units @ 5 as {}", seller.caller, offer_id);
    println!(
        "  Book holds {} offer(s): {} units @ {}\n",
        offers.len(),
        offers[0].energy_amount,
        offers[0].price_per_unit
    );
}

/// A buyer escrows exactly energy * max price.
fn scenario_b_exact_escrow(config: &MarketplaceConfig) {
    println!("Scenario B: Exact Escrow\n");

    let buyer = Identity::from_low_u64(BUYER);
    let mut engine = funded_engine(config, buyer, 100);

    let request_id = engine
        .place_request(
            &CallContext::new(buyer).with_value(Value::from(12)),
            Energy::from(4),
            UnitPrice::from(3),
        )
        .unwrap();

    println!("  Buyer requests 4 units up to 3 each, attaching 12: {}", request_id);
    println!("  Contract balance: {}", engine.contract_balance());
    println!("  Buyer wallet: {}\n", engine.backend().balance_of(buyer));
}

/// Attaching the wrong amount is rejected and nothing moves.
fn scenario_c_mismatched_escrow(config: &MarketplaceConfig) {
    println!("Scenario C: Mismatched Escrow\n");

    let buyer = Identity::from_low_u64(BUYER);
    let mut engine = funded_engine(config, buyer, 100);
    let before = engine.contract_balance();

    let result = engine.place_request(
        &CallContext::new(buyer).with_value(Value::from(11)),
        Energy::from(4),
        UnitPrice::from(3),
    );

    match result {
        Err(e) => println!("  Rejected: {e}"),
        Ok(id) => println!("  Unexpectedly accepted as {id}"),
    }
    println!(
        "  Contract balance before {}, after {}\n",
        before,
        engine.contract_balance()
    );
}

/// Two escrows, one refunded; custody keeps exactly the open one.
fn scenario_d_refund(config: &MarketplaceConfig) {
    println!("Scenario D: Refund\n");

    let buyer = Identity::from_low_u64(BUYER);
    let mut engine = funded_engine(config, buyer, 100);
    let ctx = CallContext::new(buyer);

    let small = engine
        .place_request(&ctx.with_value(Value::from(12)), Energy::from(4), UnitPrice::from(3))
        .unwrap();
    engine
        .place_request(&ctx.with_value(Value::from(30)), Energy::from(6), UnitPrice::from(5))
        .unwrap();
    println!("  Two requests escrowed, contract balance: {}", engine.contract_balance());

    let refund = engine.refund_request(&ctx, small).unwrap();
    let status = engine.get_request(small).map(|r| r.status);
    println!("  Refunded {} to buyer, {} is now {:?}", refund.released, small, status);
    println!("  Contract balance: {}", engine.contract_balance());
    println!("  Invariants hold: {}\n", engine.check_invariants().is_ok());
}

/// Seller settles a request against its offer; the buyer keeps the price improvement.
fn scenario_e_settlement(config: &MarketplaceConfig) {
    println!("Scenario E: Settlement\n");

    let seller = Identity::from_low_u64(SELLER);
    let buyer = Identity::from_low_u64(BUYER);
    let mut engine = funded_engine(config, buyer, 100);
    let mut indexer = EventCollector::new();

    let offer_id = engine
        .place_offer(&CallContext::new(seller), Energy::from(10), UnitPrice::from(4))
        .unwrap();
    let request_id = engine
        .place_request(
            &CallContext::new(buyer).with_value(Value::from(30)),
            Energy::from(6),
            UnitPrice::from(5),
        )
        .unwrap();

    let result = engine
        .settle_request(&CallContext::new(seller), request_id, offer_id)
        .unwrap();

    let closed_at = engine.get_request(request_id).and_then(|r| r.closed_at);
    println!("  {} settled against {} at {:?}", request_id, offer_id, closed_at);
    println!(
        "  Seller receives {}, buyer gets back {}",
        result.seller_proceeds, result.buyer_refund
    );
    println!(
        "  Offer capacity left: {}",
        engine.offer_remaining_energy(offer_id).unwrap_or_default()
    );
    println!(
        "  Wallets: seller {}, buyer {}",
        engine.backend().balance_of(seller),
        engine.backend().balance_of(buyer)
    );

    let again = engine.settle_request(&CallContext::new(seller), request_id, offer_id);
    if let Err(e) = again {
        println!("  Second settlement rejected: {e}");
    }

    let forwarded = engine.publish_events(None, &mut indexer);
    println!("  Indexer received {} events", forwarded);

    let snapshot = engine.execute_query(&EngineQuery::Snapshot);
    if let Ok(json) = serde_json::to_string(&snapshot) {
        println!("  Snapshot: {} bytes of JSON", json.len());
    }
    println!("  Invariants hold: {}", engine.check_invariants().is_ok());
}
