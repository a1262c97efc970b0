//! Property tests over the approval and apply path of `GovernanceEngine`.

use std::collections::BTreeSet;
use std::sync::Arc;

use gov_engine::{
    GovernanceConfig, GovernanceEngine, GovernanceError, InMemoryLedger, StaticAssetRegistry,
};
use gov_types::catalog::global;
use gov_types::{
    AccountId, GovernorOp, ParamEntry, ParameterCatalog, ProposalId, ProposalPayload,
    ProposalStatus,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const START: u64 = 1_000;
const WINDOW: u64 = 50;

fn acct(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}

fn governor_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("0-{i}")).collect()
}

fn engine(governors: usize, threshold: usize) -> GovernanceEngine {
    let mut config = GovernanceConfig::devnet();
    config.quorum_threshold = threshold;
    config.genesis.governors = governor_names(governors).iter().map(|g| acct(g)).collect();
    let assets = StaticAssetRegistry::new(config.genesis.transferable_symbols.clone());
    GovernanceEngine::new(
        config,
        Arc::new(ParameterCatalog::builtin().unwrap()),
        Arc::new(InMemoryLedger::new()),
        Arc::new(assets),
    )
    .unwrap()
}

fn create(engine: &GovernanceEngine, seed: u8, payload: ProposalPayload) -> ProposalId {
    let id = ProposalId::from_bytes([seed; 32]);
    engine
        .create_proposal(id, &acct("9-9"), payload, Some(WINDOW), START)
        .unwrap();
    id
}

fn fee_change(value: u64) -> ProposalPayload {
    ProposalPayload::ParamsGovern {
        entries: vec![ParamEntry::new(global::ASSET_UPDATE_FEE, value)],
    }
}

/// One approval attempt: voter index (beyond the governor range means an
/// outsider) and block offset from creation.
fn approvals() -> impl Strategy<Value = Vec<(usize, u64)>> {
    prop::collection::vec((0usize..7, 0u64..(WINDOW * 2)), 0..20).prop_map(|mut v| {
        v.sort_by_key(|(_, offset)| *offset);
        v
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Approvals only grow, hold each governor once, and the proposal is
    /// applied exactly when enough distinct governors assented in time.
    #[test]
    fn approvals_are_a_set_and_quorum_decides(
        governors in 2usize..6,
        threshold_pick in 0usize..6,
        attempts in approvals(),
    ) {
        let threshold = 1 + threshold_pick % governors;
        let engine = engine(governors, threshold);
        let names = governor_names(governors);
        let id = create(&engine, 1, fee_change(42));

        let mut in_time = BTreeSet::new();
        let mut previous = 0usize;
        for (voter, offset) in attempts {
            let height = START + offset;
            let voter = acct(&format!("0-{}", voter + 1));
            let result = engine.approve(&id, &voter, height);
            let proposal = engine.get_proposal(&id, height).unwrap();

            let is_governor = names.iter().any(|n| n == voter.as_str());
            if height <= START + WINDOW && is_governor && in_time.len() < threshold {
                in_time.insert(voter.clone());
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
            }

            let size = proposal.approvals().len();
            prop_assert!(size >= previous);
            prop_assert_eq!(size, in_time.len());
            previous = size;
        }

        let proposal = engine.get_proposal(&id, START + WINDOW * 2).unwrap();
        let reached = in_time.len() >= threshold;
        prop_assert_eq!(proposal.status() == ProposalStatus::Applied, reached);
        let value = engine.system_params(Some("ASSET_UPDATE_FEE")).unwrap()[0].value;
        prop_assert_eq!(value == Some(42), reached);
    }

    /// A multi-entry proposal writes every entry or none of them.
    #[test]
    fn params_govern_applies_all_entries(
        update_fee in 0u64..1_000_000,
        deal_ratio in 0u64..=10_000,
        reserve_ratio in 0u64..=10_000,
    ) {
        let engine = engine(3, 2);
        let id = create(&engine, 2, ProposalPayload::ParamsGovern {
            entries: vec![
                ParamEntry::new(global::ASSET_UPDATE_FEE, update_fee),
                ParamEntry::new(global::DEX_DEAL_FEE_RATIO, deal_ratio),
                ParamEntry::new(global::TRANSFER_SCOIN_RESERVE_FEE_RATIO, reserve_ratio),
            ],
        });

        let before = engine.state().unwrap();
        engine.approve(&id, &acct("0-1"), START).unwrap();
        prop_assert_eq!(engine.state().unwrap(), before);

        engine.approve(&id, &acct("0-2"), START + 1).unwrap();
        let state = engine.state().unwrap();
        prop_assert_eq!(state.params.get_global(global::ASSET_UPDATE_FEE), Some(update_fee));
        prop_assert_eq!(state.params.get_global(global::DEX_DEAL_FEE_RATIO), Some(deal_ratio));
        prop_assert_eq!(
            state.params.get_global(global::TRANSFER_SCOIN_RESERVE_FEE_RATIO),
            Some(reserve_ratio)
        );
    }

    /// A failed apply leaves state untouched and the proposal pending.
    #[test]
    fn failed_apply_changes_nothing(extra_approvals in 0usize..3) {
        let engine = engine(2, 2);
        let id = create(&engine, 3, ProposalPayload::GovernorUpdate {
            governor: acct("0-1"),
            op: GovernorOp::Remove,
        });
        let root = engine.state_root().unwrap();

        engine.approve(&id, &acct("0-1"), START).unwrap();
        for _ in 0..=extra_approvals {
            let err = engine.approve(&id, &acct("0-2"), START + 1).unwrap_err();
            let is_floor = matches!(err, GovernanceError::Store(_));
            prop_assert!(is_floor);
        }

        let state = engine.state().unwrap();
        prop_assert!(state.governors.contains(&acct("0-1")));
        let proposal = engine.get_proposal(&id, START + 1).unwrap();
        prop_assert_eq!(proposal.status(), ProposalStatus::Pending);
        // Approvals are recorded even though the apply failed.
        prop_assert_eq!(proposal.approvals().len(), 2);
        prop_assert_ne!(engine.state_root().unwrap(), root);
    }

    /// Two engines fed the same operations agree on the state root.
    #[test]
    fn replay_is_deterministic(values in prop::collection::vec(0u64..1_000_000, 1..6)) {
        let a = engine(3, 2);
        let b = engine(3, 2);
        for node in [&a, &b] {
            for (i, value) in values.iter().enumerate() {
                let id = create(node, i as u8 + 10, fee_change(*value));
                node.approve(&id, &acct("0-3"), START + 1).unwrap();
                node.approve(&id, &acct("0-1"), START + 2).unwrap();
            }
        }
        prop_assert_eq!(a.state_root().unwrap(), b.state_root().unwrap());
        let last = *values.last().unwrap();
        prop_assert_eq!(
            a.system_params(Some("ASSET_UPDATE_FEE")).unwrap()[0].value,
            Some(last)
        );
    }
}
