//! Proposal payloads and the `Proposal` entity.
//!
//! The six payload shapes form a closed set. Each [`Proposal`] carries exactly
//! one of them, fixed at creation; only the approval set and the lifecycle
//! status change afterwards.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{Namespace, ParamId};
use crate::fee_table::TxType;
use crate::ids::{AccountId, Height, MarketId, MarketPair, ProposalId, Symbol};

/// Discriminant of [`ProposalPayload`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalKind {
    ParamsGovern,
    CdpParamsGovern,
    GovernorUpdate,
    MarketSwitch,
    MinerFee,
    CoinTransfer,
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProposalKind::ParamsGovern => "params_govern",
            ProposalKind::CdpParamsGovern => "cdp_params_govern",
            ProposalKind::GovernorUpdate => "governor_update",
            ProposalKind::MarketSwitch => "market_switch",
            ProposalKind::MinerFee => "miner_fee",
            ProposalKind::CoinTransfer => "coin_transfer",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GovernorOp {
    Add,
    Remove,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketOp {
    Enable,
    Disable,
}

/// A single `(parameter, new value)` assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamEntry {
    pub id: ParamId,
    pub value: u64,
}

impl ParamEntry {
    pub fn new(id: ParamId, value: u64) -> Self {
        Self { id, value }
    }
}

/// What a proposal does once applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalPayload {
    /// Overwrite global parameters, in order.
    ParamsGovern { entries: Vec<ParamEntry> },
    /// Overwrite CDP parameters of one market pair, in order.
    CdpParamsGovern {
        pair: MarketPair,
        entries: Vec<ParamEntry>,
    },
    GovernorUpdate { governor: AccountId, op: GovernorOp },
    MarketSwitch { market: MarketId, op: MarketOp },
    /// Set the minimum fee of a transaction type in one settlement symbol.
    MinerFee {
        tx_type: TxType,
        fee_symbol: Symbol,
        fee_amount: u64,
    },
    /// One-off transfer between two accounts.
    CoinTransfer {
        from: AccountId,
        to: AccountId,
        symbol: Symbol,
        amount: u64,
    },
}

impl ProposalPayload {
    pub fn kind(&self) -> ProposalKind {
        match self {
            ProposalPayload::ParamsGovern { .. } => ProposalKind::ParamsGovern,
            ProposalPayload::CdpParamsGovern { .. } => ProposalKind::CdpParamsGovern,
            ProposalPayload::GovernorUpdate { .. } => ProposalKind::GovernorUpdate,
            ProposalPayload::MarketSwitch { .. } => ProposalKind::MarketSwitch,
            ProposalPayload::MinerFee { .. } => ProposalKind::MinerFee,
            ProposalPayload::CoinTransfer { .. } => ProposalKind::CoinTransfer,
        }
    }

    /// Namespace of the parameter entries, for the two parameter kinds.
    pub fn param_namespace(&self) -> Option<Namespace> {
        match self {
            ProposalPayload::ParamsGovern { .. } => Some(Namespace::Global),
            ProposalPayload::CdpParamsGovern { .. } => Some(Namespace::CdpMarket),
            _ => None,
        }
    }
}

/// Lifecycle status. `Applied` and `Expired` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Applied,
    Expired,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalStatus::Pending => f.write_str("pending"),
            ProposalStatus::Applied => f.write_str("applied"),
            ProposalStatus::Expired => f.write_str("expired"),
        }
    }
}

/// A governance proposal.
///
/// Fields are private: the payload is immutable and the approval set can only
/// grow while the proposal is pending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    id: ProposalId,
    proposer: AccountId,
    payload: ProposalPayload,
    created_height: Height,
    valid_until_height: Height,
    approvals: BTreeSet<AccountId>,
    status: ProposalStatus,
    applied_height: Option<Height>,
}

impl Proposal {
    pub fn new(
        id: ProposalId,
        proposer: AccountId,
        payload: ProposalPayload,
        created_height: Height,
        valid_until_height: Height,
    ) -> Self {
        Self {
            id,
            proposer,
            payload,
            created_height,
            valid_until_height,
            approvals: BTreeSet::new(),
            status: ProposalStatus::Pending,
            applied_height: None,
        }
    }

    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn proposer(&self) -> &AccountId {
        &self.proposer
    }

    pub fn kind(&self) -> ProposalKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &ProposalPayload {
        &self.payload
    }

    pub fn created_height(&self) -> Height {
        self.created_height
    }

    pub fn valid_until_height(&self) -> Height {
        self.valid_until_height
    }

    pub fn approvals(&self) -> &BTreeSet<AccountId> {
        &self.approvals
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    pub fn applied_height(&self) -> Option<Height> {
        self.applied_height
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    /// Whether `height` is past the approval deadline.
    pub fn is_overdue(&self, height: Height) -> bool {
        height > self.valid_until_height
    }

    /// Record an assent. Returns `false` if the governor had already approved
    /// or the proposal is no longer pending.
    pub fn record_approval(&mut self, governor: AccountId) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.approvals.insert(governor)
    }

    /// Transition `Pending → Applied`. No-op on a terminal proposal.
    pub fn mark_applied(&mut self, height: Height) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status = ProposalStatus::Applied;
        self.applied_height = Some(height);
        true
    }

    /// Transition `Pending → Expired`. No-op on a terminal proposal.
    pub fn mark_expired(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status = ProposalStatus::Expired;
        true
    }
}
