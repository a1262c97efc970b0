//! Governance transactions.
//!
//! Proposals enter the ledger as a `ProposalCreate` transaction and gather
//! assents through `ProposalAssent` transactions. Transaction ids are
//! content-addressed, so a create transaction's id doubles as the proposal id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{AccountId, Height, ProposalId};
use crate::proposal::ProposalPayload;

const TX_DOMAIN: &[u8] = b"governance-tx-v1:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("transaction encoding failed: {0}")]
    Encoding(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernanceTx {
    ProposalCreate {
        submitter: AccountId,
        /// Height the transaction was built at.
        valid_height: Height,
        /// Requested approval window; `None` uses the chain default.
        expiry_blocks: Option<u64>,
        payload: ProposalPayload,
    },
    ProposalAssent {
        submitter: AccountId,
        valid_height: Height,
        proposal_id: ProposalId,
    },
}

impl GovernanceTx {
    pub fn submitter(&self) -> &AccountId {
        match self {
            GovernanceTx::ProposalCreate { submitter, .. }
            | GovernanceTx::ProposalAssent { submitter, .. } => submitter,
        }
    }

    pub fn valid_height(&self) -> Height {
        match self {
            GovernanceTx::ProposalCreate { valid_height, .. }
            | GovernanceTx::ProposalAssent { valid_height, .. } => *valid_height,
        }
    }

    /// Content address of the transaction.
    pub fn txid(&self) -> Result<ProposalId, TxError> {
        let encoded =
            serde_json::to_vec(self).map_err(|error| TxError::Encoding(error.to_string()))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(TX_DOMAIN);
        hasher.update(&encoded);
        Ok(ProposalId::from_bytes(*hasher.finalize().as_bytes()))
    }
}
