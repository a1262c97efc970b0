//! A single-node devnet persisted to one JSON file between invocations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use gov_engine::{
    BalanceEntry, EngineSnapshot, GovernanceConfig, GovernanceEngine, GovernanceService,
    HeightOracle, InMemoryLedger, ManualHeight, StaticAssetRegistry,
};
use gov_types::{Height, ParameterCatalog};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Height a fresh devnet starts at.
pub const GENESIS_HEIGHT: Height = 1;

/// On-disk form of a devnet.
#[derive(Debug, Serialize, Deserialize)]
pub struct DevnetFile {
    pub height: Height,
    pub snapshot: EngineSnapshot,
    pub balances: Vec<BalanceEntry>,
    pub saved_at: DateTime<Utc>,
}

pub struct Devnet {
    pub service: GovernanceService,
    pub engine: Arc<GovernanceEngine>,
    pub height: Arc<ManualHeight>,
    pub ledger: Arc<InMemoryLedger>,
}

impl Devnet {
    /// A fresh devnet at genesis.
    pub fn genesis(config: GovernanceConfig) -> Result<Self> {
        let ledger = Arc::new(InMemoryLedger::new());
        let assets = Arc::new(StaticAssetRegistry::new(
            config.genesis.transferable_symbols.clone(),
        ));
        let engine = GovernanceEngine::new(
            config,
            Arc::new(ParameterCatalog::builtin()?),
            ledger.clone(),
            assets,
        )?;
        Ok(Self::assemble(engine, ledger, GENESIS_HEIGHT))
    }

    /// Restore a devnet saved by [`save`](Self::save).
    pub fn open(config: GovernanceConfig, path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "no devnet state at {}; run `govctl init` first",
                path.display()
            );
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading state {}", path.display()))?;
        let file: DevnetFile = serde_json::from_str(&contents)
            .with_context(|| format!("parsing state {}", path.display()))?;

        let ledger = Arc::new(InMemoryLedger::from_entries(file.balances));
        let assets = Arc::new(StaticAssetRegistry::new(
            config.genesis.transferable_symbols.clone(),
        ));
        let engine = GovernanceEngine::from_snapshot(
            config,
            Arc::new(ParameterCatalog::builtin()?),
            ledger.clone(),
            assets,
            file.snapshot,
        )?;
        info!(height = file.height, saved_at = %file.saved_at, "Devnet restored");
        Ok(Self::assemble(engine, ledger, file.height))
    }

    fn assemble(engine: GovernanceEngine, ledger: Arc<InMemoryLedger>, height: Height) -> Self {
        let engine = Arc::new(engine);
        let height = Arc::new(ManualHeight::new(height));
        let service = GovernanceService::local(engine.clone(), height.clone());
        Self {
            service,
            engine,
            height,
            ledger,
        }
    }

    pub fn current_height(&self) -> Height {
        self.height.current_height()
    }

    /// Write the devnet atomically: a sibling temp file, then a rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = DevnetFile {
            height: self.current_height(),
            snapshot: self.engine.snapshot()?,
            balances: self.ledger.export()?,
            saved_at: Utc::now(),
        };
        let encoded = serde_json::to_string_pretty(&file)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, encoded).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_engine::AccountLedger;
    use gov_types::{AccountId, GovernorOp, Symbol};

    #[test]
    fn save_and_reopen_preserves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let net = Devnet::genesis(GovernanceConfig::devnet()).unwrap();
        let wicc = Symbol::new("WICC").unwrap();
        net.ledger
            .credit(&AccountId::new("0-1").unwrap(), &wicc, 500)
            .unwrap();
        net.height.advance(9).unwrap();
        let id = net
            .service
            .submit_governor_update(
                &AccountId::new("0-1").unwrap(),
                &AccountId::new("0-4").unwrap(),
                GovernorOp::Add,
            )
            .unwrap();
        net.save(&path).unwrap();

        let back = Devnet::open(GovernanceConfig::devnet(), &path).unwrap();
        assert_eq!(back.current_height(), GENESIS_HEIGHT + 9);
        assert_eq!(back.engine.state_root().unwrap(), net.engine.state_root().unwrap());
        assert_eq!(back.service.get_proposal(&id).unwrap().id(), id);
        assert_eq!(
            back.ledger
                .free_balance(&AccountId::new("0-1").unwrap(), &wicc)
                .unwrap(),
            500
        );
    }

    #[test]
    fn open_without_init_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Devnet::open(GovernanceConfig::devnet(), &dir.path().join("nope.json"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("govctl init"));
    }
}
