use std::collections::BTreeSet;

use gov_types::MarketId;
use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// Known DEX markets and which of them are enabled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRegistry {
    registered: BTreeSet<MarketId>,
    enabled: BTreeSet<MarketId>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a market. Re-registering only updates its enabled flag.
    pub fn register(&mut self, id: MarketId, enabled: bool) {
        self.registered.insert(id);
        if enabled {
            self.enabled.insert(id);
        } else {
            self.enabled.remove(&id);
        }
    }

    pub fn is_registered(&self, id: MarketId) -> bool {
        self.registered.contains(&id)
    }

    pub fn is_enabled(&self, id: MarketId) -> bool {
        self.enabled.contains(&id)
    }

    /// Idempotent for registered markets. Returns whether the flag changed.
    pub fn enable(&mut self, id: MarketId) -> StoreResult<bool> {
        self.ensure_registered(id)?;
        Ok(self.enabled.insert(id))
    }

    /// Idempotent for registered markets. Returns whether the flag changed.
    pub fn disable(&mut self, id: MarketId) -> StoreResult<bool> {
        self.ensure_registered(id)?;
        Ok(self.enabled.remove(&id))
    }

    pub fn registered(&self) -> impl Iterator<Item = MarketId> + '_ {
        self.registered.iter().copied()
    }

    fn ensure_registered(&self, id: MarketId) -> StoreResult<()> {
        if self.registered.contains(&id) {
            Ok(())
        } else {
            Err(StoreError::UnknownMarket(id))
        }
    }
}
