//! # gov-state
//!
//! The governance slice of consensus state. Every store uses ordered
//! containers so the serialized form, and therefore [`GovernanceState::state_root`],
//! is identical on every node that processed the same transactions.
//!
//! Stores here only enforce their own structural rules (known ids, value
//! bounds, registered markets, updatable fee rules). Lifecycle rules belong to
//! the engine.

#![deny(unsafe_code)]

pub mod error;
pub mod fees;
pub mod governors;
pub mod markets;
pub mod params;

pub use error::{StoreError, StoreResult};
pub use fees::FeeScheduleStore;
pub use governors::GovernorSet;
pub use markets::MarketRegistry;
pub use params::ParamStore;

use gov_types::{AccountId, MarketId, Namespace, ParameterCatalog};
use serde::{Deserialize, Serialize};

const STATE_DOMAIN: &[u8] = b"governance-state-v1:";

/// Everything a proposal can mutate, bundled so it can be cloned, swapped and
/// hashed as a unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceState {
    pub params: ParamStore,
    pub governors: GovernorSet,
    pub markets: MarketRegistry,
    pub fees: FeeScheduleStore,
}

impl GovernanceState {
    /// Build the genesis state.
    ///
    /// With `seed_param_defaults`, every global parameter starts at its
    /// catalog default. CDP parameters are never seeded.
    pub fn genesis(
        catalog: &ParameterCatalog,
        governors: impl IntoIterator<Item = AccountId>,
        markets: impl IntoIterator<Item = (MarketId, bool)>,
        seed_param_defaults: bool,
    ) -> Self {
        let mut state = Self {
            governors: governors.into_iter().collect(),
            ..Self::default()
        };
        for (id, enabled) in markets {
            state.markets.register(id, enabled);
        }
        if seed_param_defaults {
            for spec in catalog.specs(Namespace::Global) {
                state.params.set_global(spec.id, spec.default);
            }
        }
        state
    }

    /// blake3 digest of the canonical JSON encoding.
    pub fn state_root(&self) -> StoreResult<[u8; 32]> {
        let encoded =
            serde_json::to_vec(self).map_err(|error| StoreError::Serialization(error.to_string()))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(STATE_DOMAIN);
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }

    pub fn state_root_hex(&self) -> StoreResult<String> {
        Ok(hex::encode(self.state_root()?))
    }
}
