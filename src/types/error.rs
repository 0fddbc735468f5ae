use thiserror::Error;

use crate::types::{Address, Amount, Asset, Rate, RateBound};

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Pool already initialized")]
    AlreadyInitialized,

    #[error("Pool not initialized")]
    NotInitialized,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Insufficient reserves: requested {requested} {asset}, available {available}")]
    InsufficientReserves {
        asset: Asset,
        requested: Amount,
        available: Amount,
    },

    #[error("Insufficient shares for {provider}: requested {requested}, held {held}")]
    InsufficientShares {
        provider: Address,
        requested: Amount,
        held: Amount,
    },

    #[error("Insufficient pending {asset} reward: requested {requested}, pending {pending}")]
    InsufficientPendingReward {
        asset: Asset,
        requested: Amount,
        pending: Amount,
    },

    #[error("Slippage exceeded: bound {bound}, actual {actual}")]
    SlippageExceeded { bound: RateBound, actual: Rate },

    #[error("Rate {0} is too small to bound at two decimal places")]
    UnboundableRate(Rate),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Insufficient {asset} balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: Address,
        asset: Asset,
        requested: Amount,
        available: Amount,
    },

    #[error("Unauthorized: {0} is not the pool admin")]
    Unauthorized(Address),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Event error: {0}")]
    Event(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExchangeError>;

impl ExchangeError {
    pub fn insufficient_reserves(asset: Asset, requested: Amount, available: Amount) -> Self {
        Self::InsufficientReserves {
            asset,
            requested,
            available,
        }
    }

    /// Whether the failure depends on pool prices, so the caller must re-query
    /// state before resubmitting.
    pub fn is_price_sensitive(&self) -> bool {
        matches!(
            self,
            ExchangeError::SlippageExceeded { .. }
                | ExchangeError::InsufficientReserves { .. }
                | ExchangeError::UnboundableRate(_)
        )
    }
}
