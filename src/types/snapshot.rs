use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pool::PoolPhase;
use crate::types::{Address, Amount, Timestamp};

/// Read-only view of the whole pool at one point in the commit order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub phase: PoolPhase,
    pub admin: Option<Address>,

    /// Reserves and invariant
    pub eth_reserve: Amount,
    pub token_reserve: Amount,
    pub k: Amount,

    /// Spot prices, unscaled
    pub price_eth: Decimal,
    pub price_token: Decimal,

    /// Liquidity
    pub total_shares: Amount,
    pub provider_count: usize,

    /// Fees
    pub fee_percent: Decimal,
    pub pending_eth_reward: Amount,
    pub pending_token_reward: Amount,

    /// Metadata
    pub sequence: u64,
    pub timestamp: Timestamp,
}

impl PoolSnapshot {
    pub fn is_active(&self) -> bool {
        matches!(self.phase, PoolPhase::Active)
    }
}

impl std::fmt::Display for PoolSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} pool: {} ETH / {} token (k={}), 1 ETH = {} token, {} shares across {} providers",
            self.phase,
            self.eth_reserve,
            self.token_reserve,
            self.k,
            self.price_eth,
            self.total_shares,
            self.provider_count
        )
    }
}
