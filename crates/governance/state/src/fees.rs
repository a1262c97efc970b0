//! Minimum transaction fees with full history.
//!
//! Each `(tx type, symbol)` keeps every value it ever had, keyed by the height
//! at which it became effective, so historical queries return the value in
//! force at that height.

use std::collections::BTreeMap;

use gov_types::{fee_rule, FeeSymbol, Height, Symbol, TxType};
use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeScheduleStore {
    history: BTreeMap<TxType, BTreeMap<FeeSymbol, BTreeMap<Height, u64>>>,
}

impl FeeScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum fee in force at `height`: the latest override at or before it,
    /// else the fee-rule default, else `None`.
    pub fn get_min_fee(&self, tx_type: TxType, symbol: FeeSymbol, height: Height) -> Option<u64> {
        self.history
            .get(&tx_type)
            .and_then(|by_symbol| by_symbol.get(&symbol))
            .and_then(|changes| changes.range(..=height).next_back())
            .map(|(_, amount)| *amount)
            .or_else(|| fee_rule(tx_type).and_then(|rule| rule.default_for(symbol)))
    }

    /// Record `amount` as the minimum fee effective from `effective_height`.
    pub fn set_min_fee(
        &mut self,
        tx_type: TxType,
        symbol: &Symbol,
        amount: u64,
        effective_height: Height,
    ) -> StoreResult<()> {
        let fee_symbol = Self::check_target(tx_type, symbol)?;
        self.history
            .entry(tx_type)
            .or_default()
            .entry(fee_symbol)
            .or_default()
            .insert(effective_height, amount);
        Ok(())
    }

    /// Validate that `tx_type`'s fee in `symbol` may be governed.
    pub fn check_target(tx_type: TxType, symbol: &Symbol) -> StoreResult<FeeSymbol> {
        let rule = fee_rule(tx_type).ok_or(StoreError::UnknownTxType(tx_type))?;
        if !rule.can_update {
            return Err(StoreError::FeeNotUpdatable(tx_type));
        }
        FeeSymbol::from_symbol(symbol).ok_or_else(|| StoreError::UnsupportedFeeSymbol(symbol.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wicc() -> Symbol {
        Symbol::new("WICC").unwrap()
    }

    const TRANSFER: TxType = TxType(3);

    #[test]
    fn falls_back_to_rule_default() {
        let store = FeeScheduleStore::new();
        let default = fee_rule(TRANSFER).unwrap().default_wicc;
        assert_eq!(store.get_min_fee(TRANSFER, FeeSymbol::Wicc, 0), default);
        assert_eq!(store.get_min_fee(TRANSFER, FeeSymbol::Wusd, 0), None);
        assert_eq!(store.get_min_fee(TxType(250), FeeSymbol::Wicc, 0), None);
    }

    #[test]
    fn history_is_height_aware() {
        let mut store = FeeScheduleStore::new();
        store.set_min_fee(TRANSFER, &wicc(), 500, 100).unwrap();
        store.set_min_fee(TRANSFER, &wicc(), 700, 200).unwrap();
        let default = fee_rule(TRANSFER).unwrap().default_wicc;
        assert_eq!(store.get_min_fee(TRANSFER, FeeSymbol::Wicc, 99), default);
        assert_eq!(store.get_min_fee(TRANSFER, FeeSymbol::Wicc, 100), Some(500));
        assert_eq!(store.get_min_fee(TRANSFER, FeeSymbol::Wicc, 199), Some(500));
        assert_eq!(store.get_min_fee(TRANSFER, FeeSymbol::Wicc, 5_000), Some(700));
    }

    #[test]
    fn rejects_non_updatable_and_unknown_targets() {
        let mut store = FeeScheduleStore::new();
        assert_eq!(
            store.set_min_fee(TxType(1), &wicc(), 1, 1),
            Err(StoreError::FeeNotUpdatable(TxType(1)))
        );
        assert_eq!(
            store.set_min_fee(TxType(250), &wicc(), 1, 1),
            Err(StoreError::UnknownTxType(TxType(250)))
        );
        let wgrt = Symbol::new("WGRT").unwrap();
        assert_eq!(
            store.set_min_fee(TRANSFER, &wgrt, 1, 1),
            Err(StoreError::UnsupportedFeeSymbol(wgrt))
        );
        assert_eq!(store, FeeScheduleStore::new());
    }

    proptest! {
        #[test]
        fn query_returns_latest_change_at_or_before(
            changes in proptest::collection::vec((0u64..1_000, 1u64..1_000_000), 1..20),
            probe in 0u64..1_200,
        ) {
            let mut store = FeeScheduleStore::new();
            let mut expected: BTreeMap<Height, u64> = BTreeMap::new();
            for (height, amount) in &changes {
                store.set_min_fee(TRANSFER, &wicc(), *amount, *height).unwrap();
                expected.insert(*height, *amount);
            }
            let want = expected
                .range(..=probe)
                .next_back()
                .map(|(_, a)| *a)
                .or(fee_rule(TRANSFER).unwrap().default_wicc);
            prop_assert_eq!(store.get_min_fee(TRANSFER, FeeSymbol::Wicc, probe), want);
        }
    }
}
