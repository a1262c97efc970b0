use gov_state::StoreError;
use gov_types::{AccountId, IdError, Namespace, ProposalId, Symbol, TxError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the governance engine and service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    #[error("unknown {namespace} parameter: {name}")]
    UnknownParameter { namespace: Namespace, name: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("proposal {0} has expired")]
    ProposalExpired(ProposalId),

    #[error("proposal {0} was already applied")]
    ProposalAlreadyApplied(ProposalId),

    #[error("{account} is not authorized to {action}")]
    NotAuthorized { account: AccountId, action: String },

    #[error("insufficient {symbol} balance in {account}: need {required}, have {available}")]
    InsufficientBalance {
        account: AccountId,
        symbol: Symbol,
        required: u64,
        available: u64,
    },

    #[error("duplicate proposal id: {0}")]
    DuplicateProposalId(ProposalId),

    #[error("state store rejected the change: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("transaction sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl GovernanceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        GovernanceError::InvalidPayload(msg.into())
    }

    pub fn not_authorized(account: &AccountId, action: impl Into<String>) -> Self {
        GovernanceError::NotAuthorized {
            account: account.clone(),
            action: action.into(),
        }
    }
}

impl From<IdError> for GovernanceError {
    fn from(err: IdError) -> Self {
        GovernanceError::InvalidPayload(err.to_string())
    }
}

impl From<TxError> for GovernanceError {
    fn from(err: TxError) -> Self {
        GovernanceError::Encoding(err.to_string())
    }
}

impl From<LedgerError> for GovernanceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Insufficient {
                account,
                symbol,
                required,
                available,
            } => GovernanceError::InsufficientBalance {
                account,
                symbol,
                required,
                available,
            },
            other => GovernanceError::Ledger(other.to_string()),
        }
    }
}

/// Errors reported by an [`AccountLedger`](crate::ports::AccountLedger).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient {symbol} in {account}: need {required}, have {available}")]
    Insufficient {
        account: AccountId,
        symbol: Symbol,
        required: u64,
        available: u64,
    },

    #[error("{symbol} balance of {account} would overflow")]
    Overflow { account: AccountId, symbol: Symbol },

    #[error("ledger backend error: {0}")]
    Backend(String),
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_insufficiency_maps_to_balance_error() {
        let account = AccountId::new("0-5").unwrap();
        let symbol = Symbol::new("WICC").unwrap();
        let err: GovernanceError = LedgerError::Insufficient {
            account: account.clone(),
            symbol: symbol.clone(),
            required: 10,
            available: 3,
        }
        .into();
        assert_eq!(
            err,
            GovernanceError::InsufficientBalance {
                account,
                symbol,
                required: 10,
                available: 3
            }
        );

        let other: GovernanceError = LedgerError::Backend("down".into()).into();
        assert!(matches!(other, GovernanceError::Ledger(_)));
    }

    #[test]
    fn id_errors_are_invalid_payloads() {
        let err: GovernanceError = Symbol::new("bad").unwrap_err().into();
        assert!(matches!(err, GovernanceError::InvalidPayload(_)));
    }
}
