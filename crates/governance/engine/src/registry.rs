use std::collections::BTreeMap;

use gov_types::{Height, Proposal, ProposalId};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

/// Content-addressed proposal store. Entries are never removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRegistry {
    proposals: BTreeMap<ProposalId, Proposal>,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new proposal. An existing id is never overwritten.
    pub fn insert(&mut self, proposal: Proposal) -> GovernanceResult<()> {
        let id = proposal.id();
        if self.proposals.contains_key(&id) {
            return Err(GovernanceError::DuplicateProposalId(id));
        }
        self.proposals.insert(id, proposal);
        Ok(())
    }

    pub fn get(&self, id: &ProposalId) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    pub fn get_mut(&mut self, id: &ProposalId) -> Option<&mut Proposal> {
        self.proposals.get_mut(id)
    }

    pub fn contains(&self, id: &ProposalId) -> bool {
        self.proposals.contains_key(id)
    }

    /// All proposals, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Pending proposals past their deadline at `height`.
    pub fn overdue(&self, height: Height) -> Vec<ProposalId> {
        self.proposals
            .values()
            .filter(|p| p.is_pending() && p.is_overdue(height))
            .map(|p| p.id())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}
