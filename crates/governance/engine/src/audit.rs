//! Append-only, hash-chained record of proposal lifecycle events.
//!
//! Each entry commits to its predecessor's hash, so rewriting any past entry
//! breaks every hash after it. The log is kept for operators and is not part
//! of the consensus state root.

use gov_types::{AccountId, Height, ProposalId, ProposalKind};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

const AUDIT_DOMAIN: &[u8] = b"governance-audit-v1:";
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    Created {
        kind: ProposalKind,
        proposer: AccountId,
        valid_until: Height,
    },
    Approved {
        governor: AccountId,
        approvals: usize,
    },
    Applied,
    ApplyFailed {
        reason: String,
    },
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub height: Height,
    pub proposal: ProposalId,
    pub event: AuditEvent,
    pub prev_hash: String,
    pub hash: String,
}

#[derive(Serialize)]
struct HashedFields<'a> {
    seq: u64,
    height: Height,
    proposal: &'a ProposalId,
    event: &'a AuditEvent,
    prev_hash: &'a str,
}

fn entry_hash(fields: &HashedFields<'_>) -> GovernanceResult<String> {
    let encoded =
        serde_json::to_vec(fields).map_err(|error| GovernanceError::Encoding(error.to_string()))?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(AUDIT_DOMAIN);
    hasher.update(&encoded);
    Ok(hasher.finalize().to_hex().to_string())
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        height: Height,
        proposal: ProposalId,
        event: AuditEvent,
    ) -> GovernanceResult<&AuditEntry> {
        let seq = self.entries.len() as u64;
        let prev_hash = self
            .entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let hash = entry_hash(&HashedFields {
            seq,
            height,
            proposal: &proposal,
            event: &event,
            prev_hash: &prev_hash,
        })?;
        self.entries.push(AuditEntry {
            seq,
            height,
            proposal,
            event,
            prev_hash,
            hash,
        });
        let idx = self.entries.len() - 1;
        Ok(&self.entries[idx])
    }

    /// Recompute the chain. Returns the sequence number of the first broken
    /// entry, if any.
    pub fn verify(&self) -> GovernanceResult<Option<u64>> {
        let mut prev = GENESIS_HASH.to_string();
        for (idx, entry) in self.entries.iter().enumerate() {
            let expected = entry_hash(&HashedFields {
                seq: idx as u64,
                height: entry.height,
                proposal: &entry.proposal,
                event: &entry.event,
                prev_hash: &prev,
            })?;
            if entry.seq != idx as u64 || entry.prev_hash != prev || entry.hash != expected {
                return Ok(Some(idx as u64));
            }
            prev = expected;
        }
        Ok(None)
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn for_proposal(&self, id: &ProposalId) -> Vec<&AuditEntry> {
        self.entries.iter().filter(|e| &e.proposal == id).collect()
    }

    pub fn head(&self) -> Option<&str> {
        self.entries.last().map(|e| e.hash.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
