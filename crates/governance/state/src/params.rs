//! Current values of governable parameters.

use std::collections::BTreeMap;

use gov_types::{MarketPair, Namespace, ParamEntry, ParamId, ParameterCatalog};
use serde::{Deserialize, Serialize};

use crate::StoreResult;

/// Global parameters keyed by id, CDP parameters keyed by (pair, id).
///
/// A missing key means "never set"; it is never conflated with a stored zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamStore {
    global: BTreeMap<ParamId, u64>,
    cdp: BTreeMap<MarketPair, BTreeMap<ParamId, u64>>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_global(&self, id: ParamId) -> Option<u64> {
        self.global.get(&id).copied()
    }

    /// Unconditional overwrite.
    pub fn set_global(&mut self, id: ParamId, value: u64) {
        self.global.insert(id, value);
    }

    pub fn get_cdp(&self, pair: &MarketPair, id: ParamId) -> Option<u64> {
        self.cdp.get(pair).and_then(|values| values.get(&id)).copied()
    }

    /// Unconditional overwrite.
    pub fn set_cdp(&mut self, pair: &MarketPair, id: ParamId, value: u64) {
        self.cdp.entry(pair.clone()).or_default().insert(id, value);
    }

    /// Write a batch of global values after checking every entry against the
    /// catalog. Nothing is written unless all entries pass.
    pub fn set_global_batch(
        &mut self,
        catalog: &ParameterCatalog,
        entries: &[ParamEntry],
    ) -> StoreResult<()> {
        for entry in entries {
            catalog.check_value(Namespace::Global, entry.id, entry.value)?;
        }
        for entry in entries {
            self.set_global(entry.id, entry.value);
        }
        Ok(())
    }

    /// CDP counterpart of [`set_global_batch`](Self::set_global_batch).
    pub fn set_cdp_batch(
        &mut self,
        catalog: &ParameterCatalog,
        pair: &MarketPair,
        entries: &[ParamEntry],
    ) -> StoreResult<()> {
        for entry in entries {
            catalog.check_value(Namespace::CdpMarket, entry.id, entry.value)?;
        }
        for entry in entries {
            self.set_cdp(pair, entry.id, entry.value);
        }
        Ok(())
    }

    pub fn globals(&self) -> &BTreeMap<ParamId, u64> {
        &self.global
    }

    /// Configured values of one market pair, empty if none were ever set.
    pub fn cdp_values(&self, pair: &MarketPair) -> BTreeMap<ParamId, u64> {
        self.cdp.get(pair).cloned().unwrap_or_default()
    }

    pub fn cdp_pairs(&self) -> impl Iterator<Item = &MarketPair> {
        self.cdp.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use gov_types::catalog::{cdp, global};
    use gov_types::RATIO_BOOST;

    fn pair() -> MarketPair {
        MarketPair::parse("WICC", "WUSD").unwrap()
    }

    #[test]
    fn absent_is_not_zero() {
        let mut store = ParamStore::new();
        assert_eq!(store.get_global(global::ASSET_ISSUE_FEE), None);
        store.set_global(global::ASSET_ISSUE_FEE, 0);
        assert_eq!(store.get_global(global::ASSET_ISSUE_FEE), Some(0));
        assert_eq!(store.get_cdp(&pair(), cdp::CDP_INTEREST_PARAM_A), None);
    }

    #[test]
    fn cdp_values_are_per_pair() {
        let mut store = ParamStore::new();
        let reversed = MarketPair::parse("WUSD", "WICC").unwrap();
        store.set_cdp(&pair(), cdp::CDP_INTEREST_PARAM_A, 5);
        assert_eq!(store.get_cdp(&pair(), cdp::CDP_INTEREST_PARAM_A), Some(5));
        assert_eq!(store.get_cdp(&reversed, cdp::CDP_INTEREST_PARAM_A), None);
        assert!(store.cdp_values(&reversed).is_empty());
        assert_eq!(store.cdp_pairs().count(), 1);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let catalog = ParameterCatalog::builtin().unwrap();
        let mut store = ParamStore::new();
        let entries = [
            ParamEntry::new(global::ASSET_ISSUE_FEE, 10),
            ParamEntry::new(global::DEX_DEAL_FEE_RATIO, RATIO_BOOST + 1),
        ];
        let err = store.set_global_batch(&catalog, &entries).unwrap_err();
        assert!(matches!(err, StoreError::ValueOutOfRange { .. }));
        assert_eq!(store.get_global(global::ASSET_ISSUE_FEE), None);

        let unknown = [
            ParamEntry::new(cdp::CDP_INTEREST_PARAM_A, 1),
            ParamEntry::new(ParamId(77), 1),
        ];
        let err = store.set_cdp_batch(&catalog, &pair(), &unknown).unwrap_err();
        assert!(matches!(err, StoreError::UnknownParameter { .. }));
        assert!(store.cdp_values(&pair()).is_empty());
    }

    #[test]
    fn serde_roundtrip_keeps_pairs_distinct() {
        let mut store = ParamStore::new();
        store.set_global(global::TOTAL_DELEGATE_COUNT, 11);
        store.set_cdp(&pair(), cdp::CDP_INTEREST_PARAM_B, 3);
        let json = serde_json::to_string(&store).unwrap();
        let back: ParamStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
