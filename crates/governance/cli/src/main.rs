//! govctl - drive a local governance devnet from the command line
//!
//! Every invocation restores the devnet from the state file, runs one
//! operation against a `GovernanceService` whose sink executes transactions
//! immediately, prints the result as JSON and saves the devnet back, also
//! when the operation fails.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gov_engine::AccountLedger;
use gov_types::{AccountId, GovernorOp, MarketId, MarketOp, ProposalId, Symbol, TxType};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod devnet;

use devnet::Devnet;

/// govctl application
#[derive(Parser)]
#[command(name = "govctl")]
#[command(about = "Validator governance proposals on a local devnet", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GOVCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Devnet state file
    #[arg(short, long, env = "GOVCTL_STATE", default_value = "govctl-state.json")]
    state: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GOVCTL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "GOVCTL_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum GovernorAction {
    Add,
    Remove,
}

impl From<GovernorAction> for GovernorOp {
    fn from(action: GovernorAction) -> Self {
        match action {
            GovernorAction::Add => GovernorOp::Add,
            GovernorAction::Remove => GovernorOp::Remove,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MarketAction {
    Enable,
    Disable,
}

impl From<MarketAction> for MarketOp {
    fn from(action: MarketAction) -> Self {
        match action {
            MarketAction::Enable => MarketOp::Enable,
            MarketAction::Disable => MarketOp::Disable,
        }
    }
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Create a fresh devnet state file from the configuration
    Init {
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Propose new values for global parameters
    SubmitParams {
        /// Proposer account
        #[arg(long)]
        from: AccountId,

        /// NAME=VALUE, repeatable
        #[arg(long = "param", value_parser = parse_param, required = true)]
        params: Vec<(String, u64)>,

        /// Approval window in blocks
        #[arg(long)]
        expiry_blocks: Option<u64>,
    },

    /// Propose a new value for one CDP parameter of a market pair
    SubmitCdpParams {
        #[arg(long)]
        from: AccountId,

        #[arg(long)]
        name: String,

        #[arg(long)]
        value: u64,

        /// Collateral symbol
        #[arg(long)]
        base: String,

        /// Stable coin symbol
        #[arg(long)]
        quote: String,

        #[arg(long)]
        expiry_blocks: Option<u64>,
    },

    /// Propose adding or removing a governor
    SubmitGovernor {
        #[arg(long)]
        from: AccountId,

        #[arg(long)]
        governor: AccountId,

        #[arg(long, value_enum)]
        op: GovernorAction,
    },

    /// Propose enabling or disabling a DEX market
    SubmitMarket {
        #[arg(long)]
        from: AccountId,

        #[arg(long)]
        market: u32,

        #[arg(long, value_enum)]
        op: MarketAction,
    },

    /// Propose a new minimum fee for a transaction type
    SubmitMinerFee {
        #[arg(long)]
        from: AccountId,

        /// Transaction type code
        #[arg(long)]
        tx_type: u8,

        #[arg(long)]
        symbol: String,

        #[arg(long)]
        amount: u64,
    },

    /// Propose moving funds between accounts
    SubmitTransfer {
        #[arg(long)]
        from: AccountId,

        #[arg(long)]
        source: AccountId,

        #[arg(long)]
        to: AccountId,

        #[arg(long)]
        symbol: String,

        #[arg(long)]
        amount: u64,
    },

    /// Assent to a proposal as a governor
    Approve {
        #[arg(long)]
        governor: AccountId,

        proposal: ProposalId,
    },

    /// Show one proposal
    GetProposal { proposal: ProposalId },

    /// List all proposals
    ListProposals,

    /// Show global parameters
    GetSysParam {
        /// Parameter name; all parameters when omitted
        name: Option<String>,
    },

    /// Show CDP parameters of a market pair
    GetCdpParam {
        #[arg(long)]
        base: String,

        #[arg(long)]
        quote: String,

        /// Parameter name; all parameters when omitted
        name: Option<String>,
    },

    /// Show minimum fees in force
    GetMinFeeTable,

    /// Move the devnet height forward and expire overdue proposals
    Advance {
        #[arg(default_value_t = 1)]
        blocks: u64,
    },

    /// Credit a devnet balance
    Fund {
        account: AccountId,
        symbol: Symbol,
        amount: u64,
    },

    /// Show the audit log and verify its hash chain
    Audit {
        /// Only entries for this proposal
        #[arg(long)]
        proposal: Option<ProposalId>,
    },

    /// Show the consensus state root
    StateRoot,
}

fn parse_param(raw: &str) -> Result<(String, u64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let value = value
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid value for {name}: {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = config::load(cli.config.as_deref())?;

    if let Commands::Init { force } = cli.command {
        if cli.state.exists() && !force {
            bail!(
                "{} already exists; pass --force to overwrite",
                cli.state.display()
            );
        }
        let net = Devnet::genesis(config)?;
        net.save(&cli.state)?;
        info!(state = %cli.state.display(), height = net.current_height(), "Devnet initialized");
        return print_json(&json!({
            "state": cli.state.display().to_string(),
            "height": net.current_height(),
            "governors": net.engine.governors()?,
            "state_root": net.engine.state_root()?,
        }));
    }

    let net = Devnet::open(config, &cli.state)?;
    // A failed command may still have changed the engine (recorded assent,
    // ApplyFailed audit entry, lazy expiry), so the devnet is saved either way.
    let outcome = run(&net, cli.command);
    net.save(&cli.state)
        .with_context(|| format!("saving {}", cli.state.display()))?;
    outcome
}

fn run(net: &Devnet, command: Commands) -> Result<()> {
    let service = &net.service;
    match command {
        Commands::Init { .. } => bail!("init cannot run against an open devnet"),

        Commands::SubmitParams {
            from,
            params,
            expiry_blocks,
        } => {
            let id = service.submit_params_govern(&from, &params, expiry_blocks)?;
            print_json(&service.get_proposal(&id)?)
        }

        Commands::SubmitCdpParams {
            from,
            name,
            value,
            base,
            quote,
            expiry_blocks,
        } => {
            let id = service.submit_cdp_params_govern(
                &from,
                &name,
                value,
                &base,
                &quote,
                expiry_blocks,
            )?;
            print_json(&service.get_proposal(&id)?)
        }

        Commands::SubmitGovernor { from, governor, op } => {
            let id = service.submit_governor_update(&from, &governor, op.into())?;
            print_json(&service.get_proposal(&id)?)
        }

        Commands::SubmitMarket { from, market, op } => {
            let id = service.submit_market_switch(&from, MarketId(market), op.into())?;
            print_json(&service.get_proposal(&id)?)
        }

        Commands::SubmitMinerFee {
            from,
            tx_type,
            symbol,
            amount,
        } => {
            let id = service.submit_miner_fee(&from, TxType(tx_type), &symbol, amount)?;
            print_json(&service.get_proposal(&id)?)
        }

        Commands::SubmitTransfer {
            from,
            source,
            to,
            symbol,
            amount,
        } => {
            let id = service.submit_coin_transfer(&from, &source, &to, &symbol, amount)?;
            print_json(&service.get_proposal(&id)?)
        }

        Commands::Approve { governor, proposal } => {
            let receipt = service.approve_proposal(&governor, &proposal)?;
            print_json(&receipt)
        }

        Commands::GetProposal { proposal } => print_json(&service.get_proposal(&proposal)?),

        Commands::ListProposals => print_json(&service.list_proposals()?),

        Commands::GetSysParam { name } => print_json(&service.get_system_param(name.as_deref())?),

        Commands::GetCdpParam { base, quote, name } => {
            print_json(&service.get_cdp_param(&base, &quote, name.as_deref())?)
        }

        Commands::GetMinFeeTable => print_json(&service.get_min_fee_table()?),

        Commands::Advance { blocks } => {
            let height = net.height.advance(blocks).with_context(|| {
                format!(
                    "advancing {blocks} blocks from height {} overflows",
                    net.current_height()
                )
            })?;
            let expired = net.engine.sweep_expired(height)?;
            info!(height, expired = expired.len(), "Devnet advanced");
            print_json(&json!({ "height": height, "expired": expired }))
        }

        Commands::Fund {
            account,
            symbol,
            amount,
        } => {
            net.ledger.credit(&account, &symbol, amount)?;
            let balance = net.ledger.free_balance(&account, &symbol)?;
            print_json(&json!({ "account": account, "symbol": symbol, "balance": balance }))
        }

        Commands::Audit { proposal } => {
            let log = net.engine.audit_log()?;
            let entries = match &proposal {
                Some(id) => log.for_proposal(id).into_iter().cloned().collect(),
                None => log.entries().to_vec(),
            };
            print_json(&json!({
                "entries": entries,
                "head": log.head(),
                "broken_at": log.verify()?,
            }))
        }

        Commands::StateRoot => print_json(&json!({
            "height": net.current_height(),
            "state_root": net.engine.state_root()?,
        })),
    }
}
