use gov_types::{CatalogError, MarketId, Namespace, ParamId, Symbol, TxType};
use thiserror::Error;

/// Errors raised by the consensus-state stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown {namespace} parameter id {id}")]
    UnknownParameter { namespace: Namespace, id: ParamId },

    #[error("{name} = {value} is out of range (max {max})")]
    ValueOutOfRange {
        name: String,
        value: u64,
        max: u64,
    },

    #[error("market {0} is not registered")]
    UnknownMarket(MarketId),

    #[error("removing a governor would leave {remaining}, below the quorum threshold of {threshold}")]
    GovernorFloor { remaining: usize, threshold: usize },

    #[error("no fee rule for tx type {0}")]
    UnknownTxType(TxType),

    #[error("min fee of tx type {0} is not updatable")]
    FeeNotUpdatable(TxType),

    #[error("unsupported fee symbol {0}")]
    UnsupportedFeeSymbol(Symbol),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("catalog error: {0}")]
    Catalog(String),
}

impl From<CatalogError> for StoreError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownId { namespace, id } => StoreError::UnknownParameter { namespace, id },
            CatalogError::ValueAboveMax { name, value, max } => StoreError::ValueOutOfRange {
                name: name.to_string(),
                value,
                max,
            },
            other => StoreError::Catalog(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
