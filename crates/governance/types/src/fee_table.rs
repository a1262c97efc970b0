//! Static transaction fee-rule table.
//!
//! Lists every transaction type with its default minimum fees and whether the
//! minimum may be changed by a miner-fee proposal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::COIN;
use crate::ids::Symbol;

/// Settlement symbol for native-coin fees.
pub const WICC: &str = "WICC";
/// Settlement symbol for stable-coin fees.
pub const WUSD: &str = "WUSD";

/// Numeric transaction type code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxType(pub u8);

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two symbols a minimum fee can be denominated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeeSymbol {
    Wicc,
    Wusd,
}

impl FeeSymbol {
    pub const ALL: [FeeSymbol; 2] = [FeeSymbol::Wicc, FeeSymbol::Wusd];

    pub fn from_symbol(symbol: &Symbol) -> Option<Self> {
        match symbol.as_str() {
            WICC => Some(FeeSymbol::Wicc),
            WUSD => Some(FeeSymbol::Wusd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeeSymbol::Wicc => WICC,
            FeeSymbol::Wusd => WUSD,
        }
    }
}

impl fmt::Display for FeeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the fee-rule table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeeRule {
    pub tx_type: TxType,
    pub name: &'static str,
    pub default_wicc: Option<u64>,
    pub default_wusd: Option<u64>,
    pub can_update: bool,
}

impl FeeRule {
    pub fn default_for(&self, symbol: FeeSymbol) -> Option<u64> {
        match symbol {
            FeeSymbol::Wicc => self.default_wicc,
            FeeSymbol::Wusd => self.default_wusd,
        }
    }
}

const fn rule(
    code: u8,
    name: &'static str,
    default_wicc: Option<u64>,
    default_wusd: Option<u64>,
    can_update: bool,
) -> FeeRule {
    FeeRule {
        tx_type: TxType(code),
        name,
        default_wicc,
        default_wusd,
        can_update,
    }
}

const CENT: u64 = COIN / 100;
const MILLI: u64 = COIN / 1_000;

/// Builtin fee rules, ordered by type code.
pub static FEE_RULES: &[FeeRule] = &[
    rule(1, "BLOCK_REWARD_TX", None, None, false),
    rule(2, "ACCOUNT_REGISTER_TX", Some(MILLI), None, true),
    rule(3, "BCOIN_TRANSFER_TX", Some(MILLI), None, true),
    rule(4, "LCONTRACT_INVOKE_TX", Some(MILLI), None, true),
    rule(5, "LCONTRACT_DEPLOY_TX", Some(CENT), None, true),
    rule(6, "DELEGATE_VOTE_TX", Some(MILLI), None, true),
    rule(7, "BCOIN_TRANSFER_MTX", Some(MILLI), None, true),
    rule(8, "UCOIN_STAKE_TX", Some(MILLI), Some(MILLI), true),
    rule(9, "ASSET_ISSUE_TX", Some(CENT), Some(CENT), true),
    rule(10, "ASSET_UPDATE_TX", Some(CENT), Some(CENT), true),
    rule(11, "UCOIN_TRANSFER_TX", Some(MILLI), Some(MILLI), true),
    rule(15, "UCOIN_CONTRACT_INVOKE_TX", Some(MILLI), Some(MILLI), true),
    rule(21, "CDP_STAKE_TX", Some(MILLI), Some(MILLI), true),
    rule(22, "CDP_REDEEM_TX", Some(MILLI), Some(MILLI), true),
    rule(23, "CDP_LIQUIDATE_TX", Some(MILLI), Some(MILLI), true),
    rule(31, "PRICE_FEED_TX", Some(MILLI), Some(MILLI), true),
    rule(32, "CDP_FORCE_SETTLE_INTEREST_TX", None, None, false),
    rule(84, "DEX_LIMIT_BUY_ORDER_TX", Some(MILLI), Some(MILLI), true),
    rule(85, "DEX_LIMIT_SELL_ORDER_TX", Some(MILLI), Some(MILLI), true),
    rule(86, "DEX_MARKET_BUY_ORDER_TX", Some(MILLI), Some(MILLI), true),
    rule(87, "DEX_MARKET_SELL_ORDER_TX", Some(MILLI), Some(MILLI), true),
    rule(88, "DEX_CANCEL_ORDER_TX", Some(MILLI), Some(MILLI), true),
    rule(89, "DEX_TRADE_SETTLE_TX", Some(MILLI), Some(MILLI), true),
    rule(90, "DEX_OPERATOR_REGISTER_TX", Some(MILLI), Some(MILLI), true),
    rule(91, "DEX_OPERATOR_UPDATE_TX", Some(MILLI), Some(MILLI), true),
    rule(96, "PROPOSAL_REQUEST_TX", Some(MILLI), Some(MILLI), true),
    rule(97, "PROPOSAL_APPROVAL_TX", Some(MILLI), Some(MILLI), true),
];

/// Look up the rule for a transaction type.
pub fn fee_rule(tx_type: TxType) -> Option<&'static FeeRule> {
    FEE_RULES
        .binary_search_by_key(&tx_type, |r| r.tx_type)
        .ok()
        .map(|idx| &FEE_RULES[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        for pair in FEE_RULES.windows(2) {
            assert!(pair[0].tx_type < pair[1].tx_type, "{} before {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn lookup_by_code() {
        let rule = fee_rule(TxType(11)).unwrap();
        assert_eq!(rule.name, "UCOIN_TRANSFER_TX");
        assert_eq!(rule.default_for(FeeSymbol::Wusd), Some(MILLI));
        assert!(fee_rule(TxType(200)).is_none());
        assert!(!fee_rule(TxType(1)).unwrap().can_update);
    }

    #[test]
    fn fee_symbols() {
        let wicc = Symbol::new("WICC").unwrap();
        let wgrt = Symbol::new("WGRT").unwrap();
        assert_eq!(FeeSymbol::from_symbol(&wicc), Some(FeeSymbol::Wicc));
        assert_eq!(FeeSymbol::from_symbol(&wgrt), None);
        assert_eq!(FeeSymbol::Wusd.to_string(), "WUSD");
    }
}
