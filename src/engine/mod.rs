// 8.0: core escrow engine. coordinates the offer book, the request book,
// custody and value transfer. deterministic; the only I/O is the settlement backend.

mod config;
mod core;
mod offers;
mod queries;
mod requests;
mod results;
mod settlement;

pub use config::EngineConfig;
pub use core::Engine;
pub use queries::BookSnapshot;
pub use results::{EngineError, InvariantViolation, SettlementResult};
