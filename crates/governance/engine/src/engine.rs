//! The proposal lifecycle engine.
//!
//! All mutable state sits behind one `RwLock`: every mutation (create,
//! approve, apply, expire) runs under the write lock, so mutations are
//! serialized and an apply and its `Applied` transition are never observed
//! separately. Queries take the read lock.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use gov_state::GovernanceState;
use gov_types::catalog::global::PROPOSAL_EXPIRE_BLOCK_COUNT;
use gov_types::{
    AccountId, GovernanceTx, Height, MarketPair, ParameterCatalog, Proposal, ProposalId,
    ProposalPayload, ProposalStatus,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::applier::Applier;
use crate::audit::{AuditEvent, AuditLog};
use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::ports::{AccountLedger, AssetRegistry};
use crate::query::{self, FeeTableRow, ParamReading};
use crate::registry::ProposalRegistry;
use crate::validate::PayloadValidator;

const SNAPSHOT_DOMAIN: &[u8] = b"governance-engine-v1:";

/// Everything the engine persists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: GovernanceState,
    pub proposals: ProposalRegistry,
    pub audit: AuditLog,
}

impl EngineSnapshot {
    /// Digest over consensus data (state and proposals, not the audit log).
    pub fn state_root(&self) -> GovernanceResult<String> {
        let encoded = serde_json::to_vec(&(&self.state, &self.proposals))
            .map_err(|error| GovernanceError::Encoding(error.to_string()))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(SNAPSHOT_DOMAIN);
        hasher.update(&encoded);
        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// Outcome of an accepted approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalReceipt {
    pub proposal: ProposalId,
    pub status: ProposalStatus,
    /// Size of the approval set.
    pub approvals: usize,
    /// Approvals from identities that are governors right now.
    pub counted: usize,
    pub threshold: usize,
    /// False when the governor had already approved.
    pub newly_recorded: bool,
}

/// Outcome of processing one governance transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TxOutcome {
    Created {
        proposal: ProposalId,
        valid_until: Height,
    },
    Assented(ApprovalReceipt),
}

pub struct GovernanceEngine {
    config: GovernanceConfig,
    catalog: Arc<ParameterCatalog>,
    ledger: Arc<dyn AccountLedger>,
    assets: Arc<dyn AssetRegistry>,
    inner: RwLock<EngineSnapshot>,
}

impl GovernanceEngine {
    /// Start from the genesis described by `config`.
    pub fn new(
        config: GovernanceConfig,
        catalog: Arc<ParameterCatalog>,
        ledger: Arc<dyn AccountLedger>,
        assets: Arc<dyn AssetRegistry>,
    ) -> GovernanceResult<Self> {
        config.validate()?;
        let state = GovernanceState::genesis(
            &catalog,
            config.genesis.governors.iter().cloned(),
            config.genesis.markets.iter().map(|m| (m.id, m.enabled)),
            config.genesis.seed_param_defaults,
        );
        info!(
            governors = state.governors.len(),
            threshold = config.quorum_threshold,
            "Governance engine initialized from genesis"
        );
        Ok(Self {
            config,
            catalog,
            ledger,
            assets,
            inner: RwLock::new(EngineSnapshot {
                state,
                ..EngineSnapshot::default()
            }),
        })
    }

    /// Resume from a previously taken snapshot.
    pub fn from_snapshot(
        config: GovernanceConfig,
        catalog: Arc<ParameterCatalog>,
        ledger: Arc<dyn AccountLedger>,
        assets: Arc<dyn AssetRegistry>,
        snapshot: EngineSnapshot,
    ) -> GovernanceResult<Self> {
        config.validate()?;
        if let Some(seq) = snapshot.audit.verify()? {
            return Err(GovernanceError::Backend(format!(
                "snapshot audit chain is broken at entry {seq}"
            )));
        }
        info!(proposals = snapshot.proposals.len(), "Governance engine restored from snapshot");
        Ok(Self {
            config,
            catalog,
            ledger,
            assets,
            inner: RwLock::new(snapshot),
        })
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ParameterCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &dyn AccountLedger {
        self.ledger.as_ref()
    }

    fn read(&self) -> GovernanceResult<RwLockReadGuard<'_, EngineSnapshot>> {
        self.inner
            .read()
            .map_err(|_| GovernanceError::Backend("engine read lock poisoned".to_string()))
    }

    fn write(&self) -> GovernanceResult<RwLockWriteGuard<'_, EngineSnapshot>> {
        self.inner
            .write()
            .map_err(|_| GovernanceError::Backend("engine write lock poisoned".to_string()))
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Execute a governance transaction at `height`.
    pub fn process(&self, tx: &GovernanceTx, height: Height) -> GovernanceResult<TxOutcome> {
        if tx.valid_height() > height {
            return Err(GovernanceError::invalid(format!(
                "transaction built at height {} cannot execute at {height}",
                tx.valid_height()
            )));
        }
        match tx {
            GovernanceTx::ProposalCreate {
                submitter,
                expiry_blocks,
                payload,
                ..
            } => {
                let proposal = self.create_proposal(
                    tx.txid()?,
                    submitter,
                    payload.clone(),
                    *expiry_blocks,
                    height,
                )?;
                Ok(TxOutcome::Created {
                    proposal: proposal.id(),
                    valid_until: proposal.valid_until_height(),
                })
            }
            GovernanceTx::ProposalAssent {
                submitter,
                proposal_id,
                ..
            } => Ok(TxOutcome::Assented(self.approve(proposal_id, submitter, height)?)),
        }
    }

    /// Check everything `create_proposal` would check, without recording.
    pub fn precheck(
        &self,
        proposer: &AccountId,
        payload: &ProposalPayload,
        expiry_blocks: Option<u64>,
    ) -> GovernanceResult<()> {
        let inner = self.read()?;
        self.check_create(&inner.state, proposer, payload, expiry_blocks)
            .map(|_| ())
    }

    fn check_create(
        &self,
        state: &GovernanceState,
        proposer: &AccountId,
        payload: &ProposalPayload,
        expiry_blocks: Option<u64>,
    ) -> GovernanceResult<u64> {
        if self.config.proposers_must_be_governors && !state.governors.contains(proposer) {
            return Err(GovernanceError::not_authorized(proposer, "submit proposals"));
        }
        PayloadValidator {
            catalog: &self.catalog,
            markets: &state.markets,
            assets: self.assets.as_ref(),
        }
        .validate(payload)?;
        self.approval_window(state, expiry_blocks)
    }

    /// Caller value if in range, else the chain parameter, else the default.
    fn approval_window(
        &self,
        state: &GovernanceState,
        requested: Option<u64>,
    ) -> GovernanceResult<u64> {
        match requested {
            Some(blocks) if blocks == 0 || blocks > self.config.max_expiry_blocks => {
                Err(GovernanceError::invalid(format!(
                    "expiry of {blocks} blocks is outside 1..={}",
                    self.config.max_expiry_blocks
                )))
            }
            Some(blocks) => Ok(blocks),
            None => Ok(state
                .params
                .get_global(PROPOSAL_EXPIRE_BLOCK_COUNT)
                .filter(|blocks| *blocks > 0)
                .unwrap_or(self.config.default_expiry_blocks)),
        }
    }

    /// Record a new pending proposal.
    pub fn create_proposal(
        &self,
        id: ProposalId,
        proposer: &AccountId,
        payload: ProposalPayload,
        expiry_blocks: Option<u64>,
        height: Height,
    ) -> GovernanceResult<Proposal> {
        let mut guard = self.write()?;
        let inner = &mut *guard;

        let window = self.check_create(&inner.state, proposer, &payload, expiry_blocks)?;
        if inner.proposals.contains(&id) {
            return Err(GovernanceError::DuplicateProposalId(id));
        }

        let valid_until = height.saturating_add(window);
        let proposal = Proposal::new(id, proposer.clone(), payload, height, valid_until);
        inner.audit.append(
            height,
            id,
            AuditEvent::Created {
                kind: proposal.kind(),
                proposer: proposer.clone(),
                valid_until,
            },
        )?;
        inner.proposals.insert(proposal.clone())?;

        info!(
            proposal = %id,
            kind = %proposal.kind(),
            proposer = %proposer,
            height,
            valid_until,
            "Proposal created"
        );
        Ok(proposal)
    }

    /// Record `governor`'s assent and apply the proposal once quorum holds.
    ///
    /// Quorum is re-evaluated on every accepted call while the proposal is
    /// pending, including a repeated approval, so a previously failed apply
    /// can be retried.
    pub fn approve(
        &self,
        id: &ProposalId,
        governor: &AccountId,
        height: Height,
    ) -> GovernanceResult<ApprovalReceipt> {
        let mut guard = self.write()?;
        let EngineSnapshot {
            state,
            proposals,
            audit,
        } = &mut *guard;

        let proposal = proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(*id))?;

        match proposal.status() {
            ProposalStatus::Applied => {
                warn!(proposal = %id, governor = %governor, "Approval rejected: already applied");
                return Err(GovernanceError::ProposalAlreadyApplied(*id));
            }
            ProposalStatus::Expired => {
                warn!(proposal = %id, governor = %governor, "Approval rejected: expired");
                return Err(GovernanceError::ProposalExpired(*id));
            }
            ProposalStatus::Pending => {}
        }

        // Audit entries are appended before the transition they record, so a
        // failed append leaves the proposal untouched.
        if proposal.is_overdue(height) {
            audit.append(height, *id, AuditEvent::Expired)?;
            proposal.mark_expired();
            info!(
                proposal = %id,
                governor = %governor,
                height,
                valid_until = proposal.valid_until_height(),
                "Proposal expired; approval rejected"
            );
            return Err(GovernanceError::ProposalExpired(*id));
        }

        if !state.governors.contains(governor) {
            warn!(proposal = %id, governor = %governor, "Approval rejected: not a governor");
            return Err(GovernanceError::not_authorized(governor, "approve proposals"));
        }

        let newly_recorded = !proposal.approvals().contains(governor);
        if newly_recorded {
            audit.append(
                height,
                *id,
                AuditEvent::Approved {
                    governor: governor.clone(),
                    approvals: proposal.approvals().len() + 1,
                },
            )?;
            proposal.record_approval(governor.clone());
        }

        let threshold = self.config.quorum_threshold;
        let counted = proposal
            .approvals()
            .iter()
            .filter(|g| state.governors.contains(g))
            .count();
        debug!(
            proposal = %id,
            governor = %governor,
            approvals = proposal.approvals().len(),
            counted,
            threshold,
            newly_recorded,
            "Assent recorded"
        );

        if counted >= threshold {
            let mut next = state.clone();
            let applier = Applier {
                catalog: &self.catalog,
                ledger: self.ledger.as_ref(),
                governor_floor: threshold,
            };
            if let Err(err) = applier.apply(&mut next, proposal.payload(), height) {
                audit.append(
                    height,
                    *id,
                    AuditEvent::ApplyFailed {
                        reason: err.to_string(),
                    },
                )?;
                warn!(proposal = %id, error = %err, "Apply failed; proposal stays pending");
                return Err(err);
            }
            audit.append(height, *id, AuditEvent::Applied)?;
            *state = next;
            proposal.mark_applied(height);
            info!(proposal = %id, kind = %proposal.kind(), height, counted, "Proposal applied");
        }

        Ok(ApprovalReceipt {
            proposal: *id,
            status: proposal.status(),
            approvals: proposal.approvals().len(),
            counted,
            threshold,
            newly_recorded,
        })
    }

    /// Expire every pending proposal past its deadline at `height`.
    pub fn sweep_expired(&self, height: Height) -> GovernanceResult<Vec<ProposalId>> {
        let mut guard = self.write()?;
        let EngineSnapshot {
            proposals, audit, ..
        } = &mut *guard;

        let overdue = proposals.overdue(height);
        for id in &overdue {
            if let Some(proposal) = proposals.get_mut(id) {
                audit.append(height, *id, AuditEvent::Expired)?;
                proposal.mark_expired();
                info!(proposal = %id, height, "Proposal expired");
            }
        }
        Ok(overdue)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Look up a proposal, expiring it first if it is overdue at `height`.
    pub fn get_proposal(&self, id: &ProposalId, height: Height) -> GovernanceResult<Proposal> {
        {
            let inner = self.read()?;
            let proposal = inner
                .proposals
                .get(id)
                .ok_or(GovernanceError::ProposalNotFound(*id))?;
            if !(proposal.is_pending() && proposal.is_overdue(height)) {
                debug!(proposal = %id, status = %proposal.status(), "Proposal read");
                return Ok(proposal.clone());
            }
        }

        let mut guard = self.write()?;
        let EngineSnapshot {
            proposals, audit, ..
        } = &mut *guard;
        let proposal = proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(*id))?;
        if proposal.is_pending() && proposal.is_overdue(height) {
            audit.append(height, *id, AuditEvent::Expired)?;
            proposal.mark_expired();
            info!(proposal = %id, height, "Proposal expired");
        }
        Ok(proposal.clone())
    }

    /// All proposals ordered by id, after expiring overdue ones.
    pub fn list_proposals(&self, height: Height) -> GovernanceResult<Vec<Proposal>> {
        self.sweep_expired(height)?;
        Ok(self.read()?.proposals.iter().cloned().collect())
    }

    pub fn system_params(&self, name: Option<&str>) -> GovernanceResult<Vec<ParamReading>> {
        query::system_params(&self.catalog, &self.read()?.state, name)
    }

    pub fn cdp_params(
        &self,
        pair: &MarketPair,
        name: Option<&str>,
    ) -> GovernanceResult<Vec<ParamReading>> {
        query::cdp_params(&self.catalog, &self.read()?.state, pair, name)
    }

    pub fn min_fee_table(&self, height: Height) -> GovernanceResult<Vec<FeeTableRow>> {
        Ok(query::min_fee_table(&self.read()?.state, height))
    }

    pub fn governors(&self) -> GovernanceResult<Vec<AccountId>> {
        Ok(self.read()?.state.governors.iter().cloned().collect())
    }

    pub fn is_governor(&self, id: &AccountId) -> GovernanceResult<bool> {
        Ok(self.read()?.state.governors.contains(id))
    }

    /// Copy of the governance state.
    pub fn state(&self) -> GovernanceResult<GovernanceState> {
        Ok(self.read()?.state.clone())
    }

    pub fn audit_log(&self) -> GovernanceResult<AuditLog> {
        Ok(self.read()?.audit.clone())
    }

    pub fn state_root(&self) -> GovernanceResult<String> {
        self.read()?.state_root()
    }

    pub fn snapshot(&self) -> GovernanceResult<EngineSnapshot> {
        Ok(self.read()?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{InMemoryLedger, StaticAssetRegistry};
    use gov_types::GovernorOp;

    fn acct(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn engine(config: GovernanceConfig) -> GovernanceEngine {
        let assets = StaticAssetRegistry::new(config.genesis.transferable_symbols.clone());
        GovernanceEngine::new(
            config,
            Arc::new(ParameterCatalog::builtin().unwrap()),
            Arc::new(InMemoryLedger::new()),
            Arc::new(assets),
        )
        .unwrap()
    }

    fn devnet() -> GovernanceEngine {
        engine(GovernanceConfig::devnet())
    }

    fn pid(b: u8) -> ProposalId {
        ProposalId::from_bytes([b; 32])
    }

    fn add_governor(who: &str) -> ProposalPayload {
        ProposalPayload::GovernorUpdate {
            governor: acct(who),
            op: GovernorOp::Add,
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = GovernanceConfig::devnet();
        config.quorum_threshold = 0;
        let result = GovernanceEngine::new(
            config,
            Arc::new(ParameterCatalog::builtin().unwrap()),
            Arc::new(InMemoryLedger::new()),
            Arc::new(StaticAssetRegistry::default()),
        );
        assert!(matches!(result, Err(GovernanceError::Config(_))));
    }

    #[test]
    fn window_defaults_to_chain_parameter() {
        let e = devnet();
        let p = e
            .create_proposal(pid(1), &acct("0-1"), add_governor("0-9"), None, 100)
            .unwrap();
        assert_eq!(p.valid_until_height(), 1_300);

        let p = e
            .create_proposal(pid(2), &acct("0-1"), add_governor("0-9"), Some(5), 100)
            .unwrap();
        assert_eq!(p.valid_until_height(), 105);
    }

    #[test]
    fn window_falls_back_to_config_default() {
        let mut config = GovernanceConfig::devnet();
        config.genesis.seed_param_defaults = false;
        config.default_expiry_blocks = 50;
        let e = engine(config);
        let p = e
            .create_proposal(pid(1), &acct("0-1"), add_governor("0-9"), None, 10)
            .unwrap();
        assert_eq!(p.valid_until_height(), 60);
    }

    #[test]
    fn window_out_of_range_is_invalid() {
        let e = devnet();
        for blocks in [0, 20_161] {
            let err = e
                .create_proposal(pid(1), &acct("0-1"), add_governor("0-9"), Some(blocks), 1)
                .unwrap_err();
            assert!(matches!(err, GovernanceError::InvalidPayload(_)));
        }
        assert!(e.list_proposals(1).unwrap().is_empty());
    }

    #[test]
    fn proposers_can_be_restricted() {
        let mut config = GovernanceConfig::devnet();
        config.proposers_must_be_governors = true;
        let e = engine(config);
        let err = e
            .create_proposal(pid(1), &acct("9-9"), add_governor("0-9"), None, 1)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotAuthorized { .. }));
        assert!(e
            .create_proposal(pid(1), &acct("0-1"), add_governor("0-9"), None, 1)
            .is_ok());
    }

    #[test]
    fn future_transactions_are_rejected() {
        let e = devnet();
        let tx = GovernanceTx::ProposalCreate {
            submitter: acct("0-1"),
            valid_height: 10,
            expiry_blocks: None,
            payload: add_governor("0-9"),
        };
        assert!(matches!(e.process(&tx, 9), Err(GovernanceError::InvalidPayload(_))));
        assert!(matches!(e.process(&tx, 10), Ok(TxOutcome::Created { .. })));
    }

    #[test]
    fn failed_apply_is_retried_by_reapproval() {
        let e = devnet();
        let wicc = gov_types::Symbol::new("WICC").unwrap();
        // The treasury cannot fund this transfer yet.
        let transfer = ProposalPayload::CoinTransfer {
            from: acct("treasury"),
            to: acct("0-7"),
            symbol: wicc.clone(),
            amount: 10,
        };
        e.create_proposal(pid(1), &acct("0-1"), transfer, None, 1).unwrap();
        e.approve(&pid(1), &acct("0-1"), 2).unwrap();
        let err = e.approve(&pid(1), &acct("0-2"), 2).unwrap_err();
        assert!(matches!(err, GovernanceError::InsufficientBalance { .. }));
        assert_eq!(e.get_proposal(&pid(1), 2).unwrap().status(), ProposalStatus::Pending);

        e.ledger().credit(&acct("treasury"), &wicc, 10).unwrap();
        let receipt = e.approve(&pid(1), &acct("0-2"), 3).unwrap();
        assert!(!receipt.newly_recorded);
        assert_eq!(receipt.status, ProposalStatus::Applied);
        assert_eq!(e.ledger().free_balance(&acct("0-7"), &wicc).unwrap(), 10);

        let log = e.audit_log().unwrap();
        assert_eq!(log.verify().unwrap(), None);
        assert!(log
            .for_proposal(&pid(1))
            .iter()
            .any(|entry| matches!(entry.event, AuditEvent::ApplyFailed { .. })));
    }

    #[test]
    fn snapshot_restores_identical_engine() {
        let e = devnet();
        e.create_proposal(pid(1), &acct("0-1"), add_governor("0-9"), None, 1).unwrap();
        e.approve(&pid(1), &acct("0-1"), 1).unwrap();
        let snap = e.snapshot().unwrap();

        let restore = |snapshot: EngineSnapshot| {
            GovernanceEngine::from_snapshot(
                GovernanceConfig::devnet(),
                Arc::new(ParameterCatalog::builtin().unwrap()),
                Arc::new(InMemoryLedger::new()),
                Arc::new(StaticAssetRegistry::default()),
                snapshot,
            )
        };

        let restored = restore(snap.clone()).unwrap();
        assert_eq!(restored.state_root().unwrap(), e.state_root().unwrap());
        assert_eq!(restored.get_proposal(&pid(1), 1).unwrap().approvals().len(), 1);

        let mut audit = serde_json::to_value(&snap.audit).unwrap();
        audit["entries"][0]["height"] = serde_json::json!(99);
        let mut tampered = snap;
        tampered.audit = serde_json::from_value(audit).unwrap();
        assert!(matches!(restore(tampered), Err(GovernanceError::Backend(_))));
    }

    #[test]
    fn audit_trail_tracks_each_transition() {
        let e = devnet();
        e.create_proposal(pid(1), &acct("0-1"), add_governor("0-9"), Some(5), 1).unwrap();
        e.approve(&pid(1), &acct("0-1"), 2).unwrap();
        e.approve(&pid(1), &acct("0-1"), 2).unwrap();
        e.approve(&pid(1), &acct("0-2"), 3).unwrap();

        let log = e.audit_log().unwrap();
        let events: Vec<_> = log
            .for_proposal(&pid(1))
            .iter()
            .map(|entry| entry.event.clone())
            .collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[1], AuditEvent::Approved { approvals: 1, .. }));
        assert!(matches!(events[2], AuditEvent::Approved { approvals: 2, .. }));
        assert_eq!(events[3], AuditEvent::Applied);
        let applied = e.get_proposal(&pid(1), 3).unwrap();
        assert_eq!(applied.approvals().len(), 2);
        assert_eq!(applied.applied_height(), Some(3));

        // An overdue approval expires the proposal once and records nothing else.
        e.create_proposal(pid(2), &acct("0-1"), add_governor("0-8"), Some(5), 1).unwrap();
        for _ in 0..2 {
            let err = e.approve(&pid(2), &acct("0-1"), 7).unwrap_err();
            assert!(matches!(err, GovernanceError::ProposalExpired(_)));
        }
        let log = e.audit_log().unwrap();
        let expired: Vec<_> = log.for_proposal(&pid(2));
        assert_eq!(expired.len(), 2);
        assert_eq!(expired[1].event, AuditEvent::Expired);
        assert!(e.get_proposal(&pid(2), 7).unwrap().approvals().is_empty());
        assert_eq!(log.verify().unwrap(), None);
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GovernanceEngine>();
    }
}
