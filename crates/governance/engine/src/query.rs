//! Read-only views over governance state.

use std::collections::BTreeMap;

use gov_state::GovernanceState;
use gov_types::{
    FeeSymbol, Height, MarketPair, Namespace, ParamId, ParamSpec, ParameterCatalog, TxType,
    FEE_RULES,
};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

/// One parameter as seen by a query. `value` is `None` when the parameter was
/// never configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamReading {
    pub name: String,
    pub id: ParamId,
    pub value: Option<u64>,
    pub default: u64,
}

impl ParamReading {
    fn new(spec: &ParamSpec, value: Option<u64>) -> Self {
        Self {
            name: spec.name.to_string(),
            id: spec.id,
            value,
            default: spec.default,
        }
    }

    /// Configured value, falling back to the documented default.
    pub fn effective(&self) -> u64 {
        self.value.unwrap_or(self.default)
    }
}

/// One row of the minimum-fee table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTableRow {
    pub tx_name: String,
    pub tx_code: TxType,
    pub min_fees: BTreeMap<FeeSymbol, u64>,
    pub can_update: bool,
}

fn select<'a>(
    catalog: &'a ParameterCatalog,
    namespace: Namespace,
    name: Option<&str>,
) -> GovernanceResult<Vec<&'a ParamSpec>> {
    match name {
        None => Ok(catalog.specs(namespace).iter().collect()),
        Some(name) => {
            let id = catalog.resolve(namespace, name);
            catalog
                .spec(namespace, id)
                .map(|spec| vec![spec])
                .ok_or_else(|| GovernanceError::UnknownParameter {
                    namespace,
                    name: name.to_string(),
                })
        }
    }
}

/// Global parameters: all of them in catalog order, or the one named.
pub fn system_params(
    catalog: &ParameterCatalog,
    state: &GovernanceState,
    name: Option<&str>,
) -> GovernanceResult<Vec<ParamReading>> {
    Ok(select(catalog, Namespace::Global, name)?
        .into_iter()
        .map(|spec| ParamReading::new(spec, state.params.get_global(spec.id)))
        .collect())
}

/// CDP parameters of one market pair.
pub fn cdp_params(
    catalog: &ParameterCatalog,
    state: &GovernanceState,
    pair: &MarketPair,
    name: Option<&str>,
) -> GovernanceResult<Vec<ParamReading>> {
    Ok(select(catalog, Namespace::CdpMarket, name)?
        .into_iter()
        .map(|spec| ParamReading::new(spec, state.params.get_cdp(pair, spec.id)))
        .collect())
}

/// Minimum fees in force at `height` for every fee rule.
pub fn min_fee_table(state: &GovernanceState, height: Height) -> Vec<FeeTableRow> {
    FEE_RULES
        .iter()
        .map(|rule| FeeTableRow {
            tx_name: rule.name.to_string(),
            tx_code: rule.tx_type,
            min_fees: FeeSymbol::ALL
                .iter()
                .filter_map(|sym| {
                    state
                        .fees
                        .get_min_fee(rule.tx_type, *sym, height)
                        .map(|amount| (*sym, amount))
                })
                .collect(),
            can_update: rule.can_update,
        })
        .collect()
}
