//! Dispatches a proposal's payload to the store it mutates.
//!
//! The applier works on a caller-owned copy of [`GovernanceState`]; the engine
//! swaps that copy in only when the whole apply succeeded. Ledger transfers
//! live outside that copy and undo their own debit when the credit fails.

use gov_state::GovernanceState;
use gov_types::{
    AccountId, GovernorOp, Height, MarketOp, ParameterCatalog, ProposalPayload, Symbol,
};
use tracing::{debug, error};

use crate::error::{GovernanceError, GovernanceResult, LedgerError};
use crate::ports::AccountLedger;

pub struct Applier<'a> {
    pub catalog: &'a ParameterCatalog,
    pub ledger: &'a dyn AccountLedger,
    /// Minimum governor count a removal may leave behind.
    pub governor_floor: usize,
}

impl Applier<'_> {
    pub fn apply(
        &self,
        state: &mut GovernanceState,
        payload: &ProposalPayload,
        height: Height,
    ) -> GovernanceResult<()> {
        match payload {
            ProposalPayload::ParamsGovern { entries } => {
                state.params.set_global_batch(self.catalog, entries)?;
            }
            ProposalPayload::CdpParamsGovern { pair, entries } => {
                state.params.set_cdp_batch(self.catalog, pair, entries)?;
            }
            ProposalPayload::GovernorUpdate { governor, op } => match op {
                GovernorOp::Add => {
                    state.governors.add(governor.clone());
                }
                GovernorOp::Remove => {
                    state
                        .governors
                        .remove_with_floor(governor, self.governor_floor)?;
                }
            },
            ProposalPayload::MarketSwitch { market, op } => match op {
                MarketOp::Enable => {
                    state.markets.enable(*market)?;
                }
                MarketOp::Disable => {
                    state.markets.disable(*market)?;
                }
            },
            ProposalPayload::MinerFee {
                tx_type,
                fee_symbol,
                fee_amount,
            } => {
                state
                    .fees
                    .set_min_fee(*tx_type, fee_symbol, *fee_amount, height)?;
            }
            ProposalPayload::CoinTransfer {
                from,
                to,
                symbol,
                amount,
            } => self.transfer(from, to, symbol, *amount)?,
        }
        Ok(())
    }

    fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        symbol: &Symbol,
        amount: u64,
    ) -> GovernanceResult<()> {
        self.ledger.debit(from, symbol, amount)?;
        if let Err(credit_err) = self.ledger.credit(to, symbol, amount) {
            if let Err(refund_err) = self.ledger.credit(from, symbol, amount) {
                error!(
                    from = %from,
                    symbol = %symbol,
                    amount,
                    error = %refund_err,
                    "Refund after failed transfer credit also failed"
                );
                return Err(LedgerError::Backend(format!(
                    "credit failed ({credit_err}) and refund failed ({refund_err})"
                ))
                .into());
            }
            return Err(credit_err.into());
        }
        debug!(from = %from, to = %to, symbol = %symbol, amount, "Transfer applied");
        Ok(())
    }
}
