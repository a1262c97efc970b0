use std::collections::BTreeSet;

use gov_types::AccountId;
use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// Identities currently authorized to approve proposals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorSet {
    members: BTreeSet<AccountId>,
}

impl GovernorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.members.contains(id)
    }

    /// Idempotent. Returns whether the set changed.
    pub fn add(&mut self, id: AccountId) -> bool {
        self.members.insert(id)
    }

    /// Idempotent. Returns whether the set changed.
    pub fn remove(&mut self, id: &AccountId) -> bool {
        self.members.remove(id)
    }

    /// Remove `id` unless that would leave fewer than `floor` governors.
    /// Removing a non-member is a no-op and never trips the floor.
    pub fn remove_with_floor(&mut self, id: &AccountId, floor: usize) -> StoreResult<bool> {
        if !self.members.contains(id) {
            return Ok(false);
        }
        let remaining = self.members.len() - 1;
        if remaining < floor {
            return Err(StoreError::GovernorFloor {
                remaining,
                threshold: floor,
            });
        }
        Ok(self.members.remove(id))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountId> {
        self.members.iter()
    }
}

impl FromIterator<AccountId> for GovernorSet {
    fn from_iter<T: IntoIterator<Item = AccountId>>(iter: T) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}
