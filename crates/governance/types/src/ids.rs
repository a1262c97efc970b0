use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ledger height (block number).
pub type Height = u64;

/// Longest accepted coin symbol.
pub const MAX_SYMBOL_LEN: usize = 12;

/// Errors raised while constructing identifiers from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("account id must not be empty")]
    EmptyAccount,

    #[error("invalid coin symbol {0:?}: expected 1-12 uppercase ASCII letters or digits")]
    InvalidSymbol(String),

    #[error("invalid market pair {0:?}: expected BASE/QUOTE")]
    InvalidMarketPair(String),

    #[error("invalid proposal id: expected 64 hex characters, got {0:?}")]
    InvalidProposalId(String),
}

/// Registration id of an on-chain account (e.g. `"0-1"`).
///
/// Used for proposers, governors and transfer endpoints alike.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyAccount);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl FromStr for AccountId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coin symbol such as `WICC` or `WUSD`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Result<Self, IdError> {
        let symbol = symbol.into();
        let valid = !symbol.is_empty()
            && symbol.len() <= MAX_SYMBOL_LEN
            && symbol
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !valid {
            return Err(IdError::InvalidSymbol(symbol));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

impl FromStr for Symbol {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A CDP market: base (collateral) coin against quote (stable) coin.
///
/// Order matters; `WICC/WUSD` and `WUSD/WICC` are different markets. Serialized
/// as `"BASE/QUOTE"` so pairs can key persisted maps.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarketPair {
    pub base: Symbol,
    pub quote: Symbol,
}

impl MarketPair {
    pub fn new(base: Symbol, quote: Symbol) -> Self {
        Self { base, quote }
    }

    /// Build a pair from raw user input, validating both symbols.
    pub fn parse(base: &str, quote: &str) -> Result<Self, IdError> {
        Ok(Self {
            base: Symbol::new(base)?,
            quote: Symbol::new(quote)?,
        })
    }
}

impl TryFrom<String> for MarketPair {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (base, quote) = value
            .split_once('/')
            .ok_or_else(|| IdError::InvalidMarketPair(value.clone()))?;
        Self::parse(base, quote)
    }
}

impl From<MarketPair> for String {
    fn from(value: MarketPair) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// DEX operator / market identifier targeted by market switch proposals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketId(pub u32);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content-addressed proposal identifier (the creating transaction's id).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProposalId(pub [u8; 32]);

impl ProposalId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut bytes)
            .map_err(|_| IdError::InvalidProposalId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl FromStr for ProposalId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ProposalId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProposalId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        ProposalId::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_rejects_blank() {
        assert_eq!(AccountId::new("   "), Err(IdError::EmptyAccount));
        assert_eq!(AccountId::new(" 0-1 ").unwrap().as_str(), "0-1");
    }

    #[test]
    fn symbol_validation() {
        assert!(Symbol::new("WICC").is_ok());
        assert!(Symbol::new("WUSD").is_ok());
        assert!(Symbol::new("").is_err());
        assert!(Symbol::new("wicc").is_err());
        assert!(Symbol::new("TOOLONGSYMBOL1").is_err());
    }

    #[test]
    fn market_pair_order_matters() {
        let a = MarketPair::parse("WICC", "WUSD").unwrap();
        let b = MarketPair::parse("WUSD", "WICC").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "WICC/WUSD");
    }

    #[test]
    fn market_pair_keys_json_maps() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(MarketPair::parse("WICC", "WUSD").unwrap(), 1u64);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"WICC/WUSD":1}"#);
        let back: std::collections::BTreeMap<MarketPair, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn proposal_id_hex_roundtrip() {
        let id = ProposalId::from_bytes([0xab; 32]);
        let parsed: ProposalId = id.to_hex().parse().unwrap();
        assert_eq!(id, parsed);
        assert!(ProposalId::from_hex("abc").is_err());
    }

    #[test]
    fn account_id_deserialize_rejects_empty() {
        let result: Result<AccountId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
