//! Narrow interfaces to the collaborators the engine does not own, plus
//! in-memory implementations for devnets and tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use gov_types::{AccountId, GovernanceTx, Height, ProposalId, Symbol};
use serde::{Deserialize, Serialize};

use crate::engine::TxOutcome;
use crate::error::{GovernanceResult, LedgerError};

/// Source of the current chain height.
pub trait HeightOracle: Send + Sync {
    fn current_height(&self) -> Height;
}

/// Free-balance bookkeeping for transfer proposals.
pub trait AccountLedger: Send + Sync {
    fn free_balance(&self, account: &AccountId, symbol: &Symbol) -> Result<u64, LedgerError>;

    fn debit(&self, account: &AccountId, symbol: &Symbol, amount: u64) -> Result<(), LedgerError>;

    fn credit(&self, account: &AccountId, symbol: &Symbol, amount: u64) -> Result<(), LedgerError>;
}

/// Asset capability lookup.
pub trait AssetRegistry: Send + Sync {
    fn is_transferable(&self, symbol: &Symbol) -> bool;
}

/// Result of handing a transaction to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub txid: ProposalId,
    /// Execution outcome, when the sink executes synchronously.
    pub outcome: Option<TxOutcome>,
}

/// Where built transactions go (mempool, broadcaster, local executor).
pub trait TransactionSink: Send + Sync {
    fn submit(&self, tx: GovernanceTx) -> GovernanceResult<SubmitReceipt>;
}

// =========================================================================
// IN-MEMORY IMPLEMENTATIONS
// =========================================================================

/// A height oracle driven by hand.
#[derive(Debug, Default)]
pub struct ManualHeight(AtomicU64);

impl ManualHeight {
    pub fn new(height: Height) -> Self {
        Self(AtomicU64::new(height))
    }

    pub fn set(&self, height: Height) {
        self.0.store(height, Ordering::SeqCst);
    }

    /// Move forward by `blocks`, returning the new height. `None`, with the
    /// height unchanged, when it would overflow.
    pub fn advance(&self, blocks: u64) -> Option<Height> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| h.checked_add(blocks))
            .ok()
            .map(|previous| previous + blocks)
    }
}

impl HeightOracle for ManualHeight {
    fn current_height(&self) -> Height {
        self.0.load(Ordering::SeqCst)
    }
}

/// One exported balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub account: AccountId,
    pub symbol: Symbol,
    pub amount: u64,
}

/// Balances held in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: RwLock<BTreeMap<(AccountId, Symbol), u64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = BalanceEntry>) -> Self {
        let balances = entries
            .into_iter()
            .map(|e| ((e.account, e.symbol), e.amount))
            .collect();
        Self {
            balances: RwLock::new(balances),
        }
    }

    /// All non-zero balances, ordered by account then symbol.
    pub fn export(&self) -> Result<Vec<BalanceEntry>, LedgerError> {
        let guard = self
            .balances
            .read()
            .map_err(|_| LedgerError::Backend("balances lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|((account, symbol), amount)| BalanceEntry {
                account: account.clone(),
                symbol: symbol.clone(),
                amount: *amount,
            })
            .collect())
    }
}

impl AccountLedger for InMemoryLedger {
    fn free_balance(&self, account: &AccountId, symbol: &Symbol) -> Result<u64, LedgerError> {
        let guard = self
            .balances
            .read()
            .map_err(|_| LedgerError::Backend("balances lock poisoned".to_string()))?;
        Ok(guard
            .get(&(account.clone(), symbol.clone()))
            .copied()
            .unwrap_or(0))
    }

    fn debit(&self, account: &AccountId, symbol: &Symbol, amount: u64) -> Result<(), LedgerError> {
        let mut guard = self
            .balances
            .write()
            .map_err(|_| LedgerError::Backend("balances lock poisoned".to_string()))?;
        let key = (account.clone(), symbol.clone());
        let available = guard.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::Insufficient {
                account: account.clone(),
                symbol: symbol.clone(),
                required: amount,
                available,
            });
        }
        guard.insert(key, available - amount);
        Ok(())
    }

    fn credit(&self, account: &AccountId, symbol: &Symbol, amount: u64) -> Result<(), LedgerError> {
        let mut guard = self
            .balances
            .write()
            .map_err(|_| LedgerError::Backend("balances lock poisoned".to_string()))?;
        let balance = guard.entry((account.clone(), symbol.clone())).or_insert(0);
        *balance = balance.checked_add(amount).ok_or_else(|| LedgerError::Overflow {
            account: account.clone(),
            symbol: symbol.clone(),
        })?;
        Ok(())
    }
}

/// A fixed set of transferable symbols.
#[derive(Debug, Clone, Default)]
pub struct StaticAssetRegistry {
    transferable: BTreeSet<Symbol>,
}

impl StaticAssetRegistry {
    pub fn new(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            transferable: symbols.into_iter().collect(),
        }
    }
}

impl AssetRegistry for StaticAssetRegistry {
    fn is_transferable(&self, symbol: &Symbol) -> bool {
        self.transferable.contains(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn wicc() -> Symbol {
        Symbol::new("WICC").unwrap()
    }

    #[test]
    fn manual_height_advances() {
        let h = ManualHeight::new(10);
        assert_eq!(h.advance(5), Some(15));
        h.set(3);
        assert_eq!(h.current_height(), 3);
    }

    #[test]
    fn manual_height_refuses_to_overflow() {
        let h = ManualHeight::new(u64::MAX - 2);
        assert_eq!(h.advance(2), Some(u64::MAX));
        assert_eq!(h.advance(1), None);
        assert_eq!(h.current_height(), u64::MAX);

        let h = ManualHeight::new(1);
        assert_eq!(h.advance(u64::MAX), None);
        assert_eq!(h.current_height(), 1);
    }

    #[test]
    fn ledger_debit_and_credit() {
        let ledger = InMemoryLedger::new();
        ledger.credit(&acct("a"), &wicc(), 100).unwrap();
        ledger.debit(&acct("a"), &wicc(), 40).unwrap();
        assert_eq!(ledger.free_balance(&acct("a"), &wicc()).unwrap(), 60);

        let err = ledger.debit(&acct("a"), &wicc(), 61).unwrap_err();
        assert!(matches!(err, LedgerError::Insufficient { available: 60, .. }));
        assert_eq!(ledger.free_balance(&acct("a"), &wicc()).unwrap(), 60);
    }

    #[test]
    fn ledger_credit_overflow() {
        let ledger = InMemoryLedger::new();
        ledger.credit(&acct("a"), &wicc(), u64::MAX).unwrap();
        assert!(matches!(
            ledger.credit(&acct("a"), &wicc(), 1),
            Err(LedgerError::Overflow { .. })
        ));
    }

    #[test]
    fn ledger_export_roundtrip() {
        let ledger = InMemoryLedger::new();
        ledger.credit(&acct("b"), &wicc(), 7).unwrap();
        ledger.credit(&acct("a"), &wicc(), 0).unwrap();
        let exported = ledger.export().unwrap();
        assert_eq!(exported.len(), 1);
        let restored = InMemoryLedger::from_entries(exported.clone());
        assert_eq!(restored.export().unwrap(), exported);
    }

    #[test]
    fn static_asset_registry() {
        let reg = StaticAssetRegistry::new([wicc()]);
        assert!(reg.is_transferable(&wicc()));
        assert!(!reg.is_transferable(&Symbol::new("WUSD").unwrap()));
    }
}
