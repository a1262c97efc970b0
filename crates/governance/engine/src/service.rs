//! The operation surface used by command handlers.
//!
//! Submit operations resolve names, run the same checks the engine will run,
//! build a transaction at the current height and hand it to the configured
//! [`TransactionSink`]. Queries read straight from the engine.

use std::sync::{Arc, Mutex};

use gov_types::{
    AccountId, GovernanceTx, GovernorOp, MarketId, MarketOp, MarketPair, Namespace, ParamEntry,
    Proposal, ProposalId, ProposalPayload, Symbol, TxType,
};
use tracing::{debug, info};

use crate::engine::GovernanceEngine;
use crate::error::{GovernanceError, GovernanceResult};
use crate::ports::{HeightOracle, SubmitReceipt, TransactionSink};
use crate::query::{FeeTableRow, ParamReading};

pub struct GovernanceService {
    engine: Arc<GovernanceEngine>,
    oracle: Arc<dyn HeightOracle>,
    sink: Arc<dyn TransactionSink>,
}

impl GovernanceService {
    pub fn new(
        engine: Arc<GovernanceEngine>,
        oracle: Arc<dyn HeightOracle>,
        sink: Arc<dyn TransactionSink>,
    ) -> Self {
        Self {
            engine,
            oracle,
            sink,
        }
    }

    /// A single-node service whose sink executes transactions immediately.
    pub fn local(engine: Arc<GovernanceEngine>, oracle: Arc<dyn HeightOracle>) -> Self {
        let sink = Arc::new(LocalSink::new(engine.clone(), oracle.clone()));
        Self::new(engine, oracle, sink)
    }

    pub fn engine(&self) -> &GovernanceEngine {
        &self.engine
    }

    pub fn current_height(&self) -> u64 {
        self.oracle.current_height()
    }

    fn resolve_entries(
        &self,
        namespace: Namespace,
        params: &[(String, u64)],
    ) -> GovernanceResult<Vec<ParamEntry>> {
        params
            .iter()
            .map(|(name, value)| {
                let id = self.engine.catalog().resolve(namespace, name);
                if id.is_null() {
                    return Err(GovernanceError::UnknownParameter {
                        namespace,
                        name: name.clone(),
                    });
                }
                Ok(ParamEntry::new(id, *value))
            })
            .collect()
    }

    fn submit_create(
        &self,
        proposer: &AccountId,
        payload: ProposalPayload,
        expiry_blocks: Option<u64>,
    ) -> GovernanceResult<ProposalId> {
        self.engine.precheck(proposer, &payload, expiry_blocks)?;
        let kind = payload.kind();
        let tx = GovernanceTx::ProposalCreate {
            submitter: proposer.clone(),
            valid_height: self.oracle.current_height(),
            expiry_blocks,
            payload,
        };
        let receipt = self.sink.submit(tx)?;
        info!(proposal = %receipt.txid, kind = %kind, proposer = %proposer, "Proposal submitted");
        Ok(receipt.txid)
    }

    // =========================================================================
    // SUBMISSIONS
    // =========================================================================

    /// Propose new values for global parameters, given by name.
    pub fn submit_params_govern(
        &self,
        proposer: &AccountId,
        params: &[(String, u64)],
        expiry_blocks: Option<u64>,
    ) -> GovernanceResult<ProposalId> {
        let entries = self.resolve_entries(Namespace::Global, params)?;
        self.submit_create(proposer, ProposalPayload::ParamsGovern { entries }, expiry_blocks)
    }

    /// Propose a new value for one CDP parameter of a market pair.
    pub fn submit_cdp_params_govern(
        &self,
        proposer: &AccountId,
        param_name: &str,
        value: u64,
        base_symbol: &str,
        quote_symbol: &str,
        expiry_blocks: Option<u64>,
    ) -> GovernanceResult<ProposalId> {
        let pair = MarketPair::parse(base_symbol, quote_symbol)?;
        let entries =
            self.resolve_entries(Namespace::CdpMarket, &[(param_name.to_string(), value)])?;
        self.submit_create(
            proposer,
            ProposalPayload::CdpParamsGovern { pair, entries },
            expiry_blocks,
        )
    }

    pub fn submit_governor_update(
        &self,
        proposer: &AccountId,
        governor: &AccountId,
        op: GovernorOp,
    ) -> GovernanceResult<ProposalId> {
        self.submit_create(
            proposer,
            ProposalPayload::GovernorUpdate {
                governor: governor.clone(),
                op,
            },
            None,
        )
    }

    pub fn submit_market_switch(
        &self,
        proposer: &AccountId,
        market: MarketId,
        op: MarketOp,
    ) -> GovernanceResult<ProposalId> {
        self.submit_create(proposer, ProposalPayload::MarketSwitch { market, op }, None)
    }

    pub fn submit_miner_fee(
        &self,
        proposer: &AccountId,
        tx_type: TxType,
        fee_symbol: &str,
        fee_amount: u64,
    ) -> GovernanceResult<ProposalId> {
        let fee_symbol = Symbol::new(fee_symbol)?;
        self.submit_create(
            proposer,
            ProposalPayload::MinerFee {
                tx_type,
                fee_symbol,
                fee_amount,
            },
            None,
        )
    }

    /// Propose a transfer. The source must currently hold `amount`.
    pub fn submit_coin_transfer(
        &self,
        proposer: &AccountId,
        from: &AccountId,
        to: &AccountId,
        symbol: &str,
        amount: u64,
    ) -> GovernanceResult<ProposalId> {
        let symbol = Symbol::new(symbol)?;
        let payload = ProposalPayload::CoinTransfer {
            from: from.clone(),
            to: to.clone(),
            symbol: symbol.clone(),
            amount,
        };
        self.engine.precheck(proposer, &payload, None)?;

        let available = self.engine.ledger().free_balance(from, &symbol)?;
        if available < amount {
            return Err(GovernanceError::InsufficientBalance {
                account: from.clone(),
                symbol,
                required: amount,
                available,
            });
        }
        self.submit_create(proposer, payload, None)
    }

    /// Cast `governor`'s assent on a proposal.
    pub fn approve_proposal(
        &self,
        governor: &AccountId,
        proposal_id: &ProposalId,
    ) -> GovernanceResult<SubmitReceipt> {
        let tx = GovernanceTx::ProposalAssent {
            submitter: governor.clone(),
            valid_height: self.oracle.current_height(),
            proposal_id: *proposal_id,
        };
        let receipt = self.sink.submit(tx)?;
        info!(proposal = %proposal_id, governor = %governor, "Assent submitted");
        Ok(receipt)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn get_proposal(&self, proposal_id: &ProposalId) -> GovernanceResult<Proposal> {
        self.engine
            .get_proposal(proposal_id, self.oracle.current_height())
    }

    pub fn list_proposals(&self) -> GovernanceResult<Vec<Proposal>> {
        self.engine.list_proposals(self.oracle.current_height())
    }

    /// One named global parameter, or all of them.
    pub fn get_system_param(&self, name: Option<&str>) -> GovernanceResult<Vec<ParamReading>> {
        debug!(name = ?name, "System param query");
        self.engine.system_params(name)
    }

    /// One named CDP parameter of a market pair, or all of them.
    pub fn get_cdp_param(
        &self,
        base_symbol: &str,
        quote_symbol: &str,
        name: Option<&str>,
    ) -> GovernanceResult<Vec<ParamReading>> {
        let pair = MarketPair::parse(base_symbol, quote_symbol)?;
        debug!(pair = %pair, name = ?name, "CDP param query");
        self.engine.cdp_params(&pair, name)
    }

    pub fn get_min_fee_table(&self) -> GovernanceResult<Vec<FeeTableRow>> {
        self.engine.min_fee_table(self.oracle.current_height())
    }
}

/// Executes each transaction against a local engine at the oracle height.
pub struct LocalSink {
    engine: Arc<GovernanceEngine>,
    oracle: Arc<dyn HeightOracle>,
}

impl LocalSink {
    pub fn new(engine: Arc<GovernanceEngine>, oracle: Arc<dyn HeightOracle>) -> Self {
        Self { engine, oracle }
    }
}

impl TransactionSink for LocalSink {
    fn submit(&self, tx: GovernanceTx) -> GovernanceResult<SubmitReceipt> {
        let txid = tx.txid()?;
        let outcome = self.engine.process(&tx, self.oracle.current_height())?;
        Ok(SubmitReceipt {
            txid,
            outcome: Some(outcome),
        })
    }
}

/// Collects transactions for later block inclusion.
#[derive(Default)]
pub struct QueuedSink {
    queue: Mutex<Vec<GovernanceTx>>,
}

impl QueuedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued transaction, oldest first.
    pub fn drain(&self) -> GovernanceResult<Vec<GovernanceTx>> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| GovernanceError::Sink("queue lock poisoned".to_string()))?;
        Ok(std::mem::take(&mut *queue))
    }
}

impl TransactionSink for QueuedSink {
    fn submit(&self, tx: GovernanceTx) -> GovernanceResult<SubmitReceipt> {
        let txid = tx.txid()?;
        self.queue
            .lock()
            .map_err(|_| GovernanceError::Sink("queue lock poisoned".to_string()))?
            .push(tx);
        Ok(SubmitReceipt {
            txid,
            outcome: None,
        })
    }
}
