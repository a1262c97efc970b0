//! # gov-types
//!
//! Shared vocabulary of the governance engine: identifiers, the parameter
//! catalog, the fee-rule table, proposal payloads and the governance
//! transactions that carry them.
//!
//! Everything here is plain data plus pure lookups. Mutable state lives in
//! `gov-state`; the lifecycle lives in `gov-engine`.

#![deny(unsafe_code)]

pub mod catalog;
pub mod fee_table;
pub mod ids;
pub mod proposal;
pub mod tx;

pub use catalog::{CatalogError, Namespace, ParamId, ParamSpec, ParameterCatalog, COIN, RATIO_BOOST};
pub use fee_table::{fee_rule, FeeRule, FeeSymbol, TxType, FEE_RULES, WICC, WUSD};
pub use ids::{AccountId, Height, IdError, MarketId, MarketPair, ProposalId, Symbol};
pub use proposal::{
    GovernorOp, MarketOp, ParamEntry, Proposal, ProposalKind, ProposalPayload, ProposalStatus,
};
pub use tx::{GovernanceTx, TxError};
