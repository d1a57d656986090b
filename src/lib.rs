// energy-escrow-core: peer-to-peer energy marketplace with escrowed settlement.
// custody-first architecture: every unit of value a buyer attaches is tracked
// until it is paid out to the seller or returned to the buyer.
// all computation is deterministic; value moves only through the settlement backend.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: OfferId, RequestId, Energy, UnitPrice, Value
//   2.x  offer.rs: append-only offer book with committed capacity
//   3.x  request.rs: request book, escrow records, lifecycle
//   7.x  config.rs: marketplace settings, env presets
//   8.x  engine/: core engine: offers, requests, settlement, queries
//   9.1  settlement.rs: value transfer batches + backend seam
//   9.2  custody.rs: escrow vault accounting
//   10.x account.rs: identities, call context, per-party totals
//   11.x events.rs: state transition events for audit
//   12.x api.rs: JSON command/query surface

// marketplace modules
pub mod account;
pub mod engine;
pub mod events;
pub mod offer;
pub mod request;
pub mod types;

// integration modules
pub mod api;
pub mod config;
pub mod custody;
pub mod settlement;

// re exports for convenience
pub use account::*;
pub use engine::*;
pub use events::*;
pub use offer::*;
pub use request::*;
pub use types::*;
pub use api::{ApiError, ApiResponse, EngineCommand, EngineQuery, ErrorCode};
pub use config::{ConfigError, Environment, MarketplaceConfig};
pub use custody::{CustodyError, CustodyVault};
pub use settlement::{
    BatchId, BatchStatus, InMemorySettlement, SettlementBackend, SettlementBatch, SettlementError,
    SettlementInstruction, TransferReason,
};
pub use primitive_types::U256;
