//! Parameter catalog: the static name ↔ identifier tables for the two
//! governable parameter namespaces.
//!
//! The catalog is process-wide configuration. It is built once at startup
//! (usually from the builtin tables) and shared read-only, typically behind an
//! `Arc`, with every component that needs to resolve parameter names.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest-unit multiplier for one whole coin.
pub const COIN: u64 = 100_000_000;

/// Denominator of ratio parameters (basis points).
pub const RATIO_BOOST: u64 = 10_000;

/// Which parameter table a name or identifier belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// System-wide parameters.
    Global,
    /// Parameters scoped to one CDP market pair.
    CdpMarket,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Global => f.write_str("global"),
            Namespace::CdpMarket => f.write_str("cdp"),
        }
    }
}

/// Parameter identifier, unique within its namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamId(pub u16);

impl ParamId {
    /// Sentinel returned by [`ParameterCatalog::resolve`] for unknown names.
    pub const NULL: ParamId = ParamId(0);

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One catalog row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub id: ParamId,
    /// Documented default, used when a value was never configured.
    pub default: u64,
    /// Inclusive upper bound, if the parameter has one.
    pub max: Option<u64>,
}

const fn spec(name: &'static str, id: u16, default: u64, max: Option<u64>) -> ParamSpec {
    ParamSpec {
        name,
        id: ParamId(id),
        default,
        max,
    }
}

/// Well-known global parameter identifiers.
pub mod global {
    use super::ParamId;

    pub const MEDIAN_PRICE_SLIDE_WINDOW_BLOCKCOUNT: ParamId = ParamId(1);
    pub const PRICE_FEED_BCOIN_STAKE_AMOUNT_MIN: ParamId = ParamId(2);
    pub const PRICE_FEED_CONTINUOUS_DEVIATE_TIMES_MAX: ParamId = ParamId(3);
    pub const PRICE_FEED_DEVIATE_RATIO_MAX: ParamId = ParamId(4);
    pub const PRICE_FEED_DEVIATE_PENALTY: ParamId = ParamId(5);
    pub const DEX_DEAL_FEE_RATIO: ParamId = ParamId(6);
    pub const ASSET_ISSUE_FEE: ParamId = ParamId(7);
    pub const ASSET_UPDATE_FEE: ParamId = ParamId(8);
    pub const DEX_OPERATOR_REGISTER_FEE: ParamId = ParamId(9);
    pub const DEX_OPERATOR_UPDATE_FEE: ParamId = ParamId(10);
    pub const PROPOSAL_EXPIRE_BLOCK_COUNT: ParamId = ParamId(11);
    pub const TOTAL_DELEGATE_COUNT: ParamId = ParamId(12);
    pub const TRANSFER_SCOIN_RESERVE_FEE_RATIO: ParamId = ParamId(13);
}

/// Well-known CDP parameter identifiers.
pub mod cdp {
    use super::ParamId;

    pub const CDP_GLOBAL_COLLATERAL_CEILING_AMOUNT: ParamId = ParamId(1);
    pub const CDP_GLOBAL_COLLATERAL_RATIO_MIN: ParamId = ParamId(2);
    pub const CDP_START_COLLATERAL_RATIO: ParamId = ParamId(3);
    pub const CDP_START_LIQUIDATE_RATIO: ParamId = ParamId(4);
    pub const CDP_NONRETURN_LIQUIDATE_RATIO: ParamId = ParamId(5);
    pub const CDP_FORCE_LIQUIDATE_RATIO: ParamId = ParamId(6);
    pub const CDP_LIQUIDATE_DISCOUNT_RATIO: ParamId = ParamId(7);
    pub const CDP_BCOINSTOSTAKE_AMOUNT_MIN_IN_SCOIN: ParamId = ParamId(8);
    pub const CDP_INTEREST_PARAM_A: ParamId = ParamId(9);
    pub const CDP_INTEREST_PARAM_B: ParamId = ParamId(10);
    pub const CDP_SYSORDER_PENALTY_FEE_MIN: ParamId = ParamId(11);
}

/// Builtin global parameter table.
pub static GLOBAL_PARAMS: &[ParamSpec] = &[
    spec("MEDIAN_PRICE_SLIDE_WINDOW_BLOCKCOUNT", 1, 11, None),
    spec("PRICE_FEED_BCOIN_STAKE_AMOUNT_MIN", 2, 210_000 * COIN, None),
    spec("PRICE_FEED_CONTINUOUS_DEVIATE_TIMES_MAX", 3, 10, None),
    spec("PRICE_FEED_DEVIATE_RATIO_MAX", 4, 3_000, Some(RATIO_BOOST)),
    spec("PRICE_FEED_DEVIATE_PENALTY", 5, 1_000 * COIN, None),
    spec("DEX_DEAL_FEE_RATIO", 6, 4, Some(RATIO_BOOST)),
    spec("ASSET_ISSUE_FEE", 7, 550 * COIN, None),
    spec("ASSET_UPDATE_FEE", 8, 110 * COIN, None),
    spec("DEX_OPERATOR_REGISTER_FEE", 9, 1_100 * COIN, None),
    spec("DEX_OPERATOR_UPDATE_FEE", 10, 110 * COIN, None),
    spec("PROPOSAL_EXPIRE_BLOCK_COUNT", 11, 1_200, None),
    spec("TOTAL_DELEGATE_COUNT", 12, 11, None),
    spec("TRANSFER_SCOIN_RESERVE_FEE_RATIO", 13, 0, Some(RATIO_BOOST)),
];

/// Builtin per-market CDP parameter table.
pub static CDP_PARAMS: &[ParamSpec] = &[
    spec("CDP_GLOBAL_COLLATERAL_CEILING_AMOUNT", 1, 52_500_000 * COIN, None),
    spec("CDP_GLOBAL_COLLATERAL_RATIO_MIN", 2, 8_000, None),
    spec("CDP_START_COLLATERAL_RATIO", 3, 19_000, None),
    spec("CDP_START_LIQUIDATE_RATIO", 4, 15_000, None),
    spec("CDP_NONRETURN_LIQUIDATE_RATIO", 5, 11_300, None),
    spec("CDP_FORCE_LIQUIDATE_RATIO", 6, 10_400, None),
    spec("CDP_LIQUIDATE_DISCOUNT_RATIO", 7, 9_700, Some(RATIO_BOOST)),
    spec("CDP_BCOINSTOSTAKE_AMOUNT_MIN_IN_SCOIN", 8, 90 * COIN, None),
    spec("CDP_INTEREST_PARAM_A", 9, 2, None),
    spec("CDP_INTEREST_PARAM_B", 10, 1, None),
    spec("CDP_SYSORDER_PENALTY_FEE_MIN", 11, 10, None),
];

/// Catalog errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown {namespace} parameter name: {name}")]
    UnknownParameter { namespace: Namespace, name: String },

    #[error("unknown {namespace} parameter id: {id}")]
    UnknownId { namespace: Namespace, id: ParamId },

    #[error("{name} = {value} exceeds the maximum of {max}")]
    ValueAboveMax {
        name: &'static str,
        value: u64,
        max: u64,
    },

    #[error("duplicate {namespace} parameter name in catalog: {name}")]
    DuplicateName { namespace: Namespace, name: String },

    #[error("duplicate {namespace} parameter id in catalog: {id}")]
    DuplicateId { namespace: Namespace, id: ParamId },

    #[error("{namespace} parameter {name} uses the reserved null id")]
    ReservedId { namespace: Namespace, name: String },
}

#[derive(Debug, Clone)]
struct NamespaceTable {
    entries: Vec<ParamSpec>,
    by_name: HashMap<&'static str, usize>,
    by_id: HashMap<ParamId, usize>,
}

impl NamespaceTable {
    fn build(namespace: Namespace, entries: &[ParamSpec]) -> Result<Self, CatalogError> {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_id = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            if entry.id.is_null() {
                return Err(CatalogError::ReservedId {
                    namespace,
                    name: entry.name.to_string(),
                });
            }
            if by_name.insert(entry.name, idx).is_some() {
                return Err(CatalogError::DuplicateName {
                    namespace,
                    name: entry.name.to_string(),
                });
            }
            if by_id.insert(entry.id, idx).is_some() {
                return Err(CatalogError::DuplicateId {
                    namespace,
                    id: entry.id,
                });
            }
        }
        Ok(Self {
            entries: entries.to_vec(),
            by_name,
            by_id,
        })
    }
}

/// Bidirectional name ↔ identifier lookup for both namespaces.
#[derive(Debug, Clone)]
pub struct ParameterCatalog {
    global: NamespaceTable,
    cdp: NamespaceTable,
}

impl ParameterCatalog {
    /// Build a catalog from explicit tables, rejecting duplicate names,
    /// duplicate ids, and entries that use [`ParamId::NULL`].
    pub fn from_tables(global: &[ParamSpec], cdp: &[ParamSpec]) -> Result<Self, CatalogError> {
        Ok(Self {
            global: NamespaceTable::build(Namespace::Global, global)?,
            cdp: NamespaceTable::build(Namespace::CdpMarket, cdp)?,
        })
    }

    /// The builtin catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_tables(GLOBAL_PARAMS, CDP_PARAMS)
    }

    fn table(&self, namespace: Namespace) -> &NamespaceTable {
        match namespace {
            Namespace::Global => &self.global,
            Namespace::CdpMarket => &self.cdp,
        }
    }

    /// Resolve a name to its identifier. Exact, case-sensitive match;
    /// unknown names yield [`ParamId::NULL`].
    pub fn resolve(&self, namespace: Namespace, name: &str) -> ParamId {
        let table = self.table(namespace);
        table
            .by_name
            .get(name)
            .map(|&idx| table.entries[idx].id)
            .unwrap_or(ParamId::NULL)
    }

    /// Like [`resolve`](Self::resolve), but surfaces unknown names as an error.
    pub fn try_resolve(&self, namespace: Namespace, name: &str) -> Result<ParamId, CatalogError> {
        let id = self.resolve(namespace, name);
        if id.is_null() {
            return Err(CatalogError::UnknownParameter {
                namespace,
                name: name.to_string(),
            });
        }
        Ok(id)
    }

    pub fn spec(&self, namespace: Namespace, id: ParamId) -> Option<&ParamSpec> {
        let table = self.table(namespace);
        table.by_id.get(&id).map(|&idx| &table.entries[idx])
    }

    pub fn name_of(&self, namespace: Namespace, id: ParamId) -> Option<&'static str> {
        self.spec(namespace, id).map(|s| s.name)
    }

    /// All `(name, id)` pairs of a namespace, in catalog order.
    pub fn list_all(&self, namespace: Namespace) -> impl Iterator<Item = (&'static str, ParamId)> + '_ {
        self.table(namespace).entries.iter().map(|s| (s.name, s.id))
    }

    pub fn specs(&self, namespace: Namespace) -> &[ParamSpec] {
        &self.table(namespace).entries
    }

    /// Check that `id` exists in `namespace` and `value` respects its bound.
    pub fn check_value(
        &self,
        namespace: Namespace,
        id: ParamId,
        value: u64,
    ) -> Result<&ParamSpec, CatalogError> {
        let spec = self
            .spec(namespace, id)
            .ok_or(CatalogError::UnknownId { namespace, id })?;
        match spec.max {
            Some(max) if value > max => Err(CatalogError::ValueAboveMax {
                name: spec.name,
                value,
                max,
            }),
            _ => Ok(spec),
        }
    }
}
