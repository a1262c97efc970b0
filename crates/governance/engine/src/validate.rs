//! Create-time payload validation.
//!
//! Shared by the submission path (so bad requests never become transactions)
//! and by the engine (so bad transactions never become proposals).

use gov_state::{FeeScheduleStore, MarketRegistry};
use gov_types::{Namespace, ParamEntry, ParameterCatalog, ProposalPayload};

use crate::error::{GovernanceError, GovernanceResult};
use crate::ports::AssetRegistry;

pub struct PayloadValidator<'a> {
    pub catalog: &'a ParameterCatalog,
    pub markets: &'a MarketRegistry,
    pub assets: &'a dyn AssetRegistry,
}

impl PayloadValidator<'_> {
    pub fn validate(&self, payload: &ProposalPayload) -> GovernanceResult<()> {
        match payload {
            ProposalPayload::ParamsGovern { entries } => {
                self.check_entries(Namespace::Global, entries)
            }
            ProposalPayload::CdpParamsGovern { pair, entries } => {
                if pair.base == pair.quote {
                    return Err(GovernanceError::invalid(format!(
                        "market pair {pair} uses the same symbol twice"
                    )));
                }
                self.check_entries(Namespace::CdpMarket, entries)
            }
            ProposalPayload::GovernorUpdate { .. } => Ok(()),
            ProposalPayload::MarketSwitch { market, .. } => {
                if !self.markets.is_registered(*market) {
                    return Err(GovernanceError::invalid(format!(
                        "market {market} is not registered"
                    )));
                }
                Ok(())
            }
            ProposalPayload::MinerFee {
                tx_type,
                fee_symbol,
                fee_amount,
            } => {
                if *fee_amount == 0 {
                    return Err(GovernanceError::invalid("miner fee amount must be positive"));
                }
                FeeScheduleStore::check_target(*tx_type, fee_symbol)
                    .map_err(|e| GovernanceError::invalid(e.to_string()))?;
                Ok(())
            }
            ProposalPayload::CoinTransfer {
                from,
                to,
                symbol,
                amount,
            } => {
                if *amount == 0 {
                    return Err(GovernanceError::invalid("transfer amount must be positive"));
                }
                if from == to {
                    return Err(GovernanceError::invalid(format!(
                        "transfer source and destination are both {from}"
                    )));
                }
                if !self.assets.is_transferable(symbol) {
                    return Err(GovernanceError::invalid(format!(
                        "{symbol} is not transferable"
                    )));
                }
                Ok(())
            }
        }
    }

    fn check_entries(&self, namespace: Namespace, entries: &[ParamEntry]) -> GovernanceResult<()> {
        if entries.is_empty() {
            return Err(GovernanceError::invalid("no parameters given"));
        }
        for entry in entries {
            let spec = self
                .catalog
                .spec(namespace, entry.id)
                .ok_or_else(|| GovernanceError::UnknownParameter {
                    namespace,
                    name: format!("#{}", entry.id),
                })?;
            if let Some(max) = spec.max {
                if entry.value > max {
                    return Err(GovernanceError::invalid(format!(
                        "{} = {} exceeds the maximum of {max}",
                        spec.name, entry.value
                    )));
                }
            }
        }
        Ok(())
    }
}
