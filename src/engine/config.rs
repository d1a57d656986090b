//! Engine configuration options.

use crate::account::Identity;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Accept offers priced at zero.
    pub allow_free_energy: bool,
    /// Arbiter allowed to settle or refund any open request.
    pub operator: Option<Identity>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            allow_free_energy: false,
            operator: None,
        }
    }
}

impl EngineConfig {
    pub fn with_operator(mut self, operator: Identity) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn is_operator(&self, caller: Identity) -> bool {
        self.operator == Some(caller)
    }
}
