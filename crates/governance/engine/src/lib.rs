//! # gov-engine
//!
//! Proposal lifecycle engine for validator governance.
//!
//! ## Core Components
//!
//! - **GovernanceEngine** - block-processing side: creates proposals, records
//!   assents, evaluates quorum, applies payloads atomically, expires overdue
//!   proposals
//! - **GovernanceService** - request side: resolves names, pre-validates and
//!   builds transactions for a [`TransactionSink`]
//! - **Applier** - exhaustive dispatch from payload kind to the store it mutates
//! - **AuditLog** - hash-chained lifecycle history
//!
//! ## Lifecycle
//!
//! `Pending → Applied` once enough current governors approve before
//! `valid_until_height`; `Pending → Expired` on the first access after it.
//! Both end states are terminal.

#![deny(unsafe_code)]

pub mod applier;
pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod ports;
pub mod query;
pub mod registry;
pub mod service;
pub mod validate;

pub use applier::Applier;
pub use audit::{AuditEntry, AuditEvent, AuditLog};
pub use config::{ConfigError, GenesisConfig, GenesisMarket, GovernanceConfig};
pub use engine::{ApprovalReceipt, EngineSnapshot, GovernanceEngine, TxOutcome};
pub use error::{GovernanceError, GovernanceResult, LedgerError};
pub use ports::{
    AccountLedger, AssetRegistry, BalanceEntry, HeightOracle, InMemoryLedger, ManualHeight,
    StaticAssetRegistry, SubmitReceipt, TransactionSink,
};
pub use query::{FeeTableRow, ParamReading};
pub use registry::ProposalRegistry;
pub use service::{GovernanceService, LocalSink, QueuedSink};
pub use validate::PayloadValidator;
