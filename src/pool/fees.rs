use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::pool::{Direction, PoolState};
use crate::types::{Amount, Asset, ExchangeError, Result};
use crate::utils::math::{bips_to_percent, checked_add};

/// 0.3%
pub const DEFAULT_FEE_BIPS: u32 = 30;

/// When accrued swap fees flow back into the reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeePolicy {
    /// Reinvest both accumulators after a swap once each holds a reward,
    /// so reserves only ever grow on both sides together
    #[default]
    ReinvestOnPair,
    /// Rewards stay pending until the admin reinvests or distributes them
    Manual,
}

impl fmt::Display for FeePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeePolicy::ReinvestOnPair => write!(f, "reinvest_on_pair"),
            FeePolicy::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for FeePolicy {
    type Err = ExchangeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reinvest_on_pair" => Ok(FeePolicy::ReinvestOnPair),
            "manual" => Ok(FeePolicy::Manual),
            _ => Err(ExchangeError::Config(format!("Unknown fee policy: {}", s))),
        }
    }
}

/// Amounts moved from the accumulators into the reserves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reinvestment {
    pub eth: Amount,
    pub token: Amount,
}

impl Reinvestment {
    pub fn is_empty(&self) -> bool {
        self.eth == 0 && self.token == 0
    }
}

/// Pending swap fees, owned by the pool until they are folded into reserves.
///
/// Reinvesting grows `k` without minting shares, which is how fees accrue to
/// existing providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDistributor {
    pending_eth: Amount,
    pending_token: Amount,
    policy: FeePolicy,
}

impl FeeDistributor {
    pub fn new(policy: FeePolicy) -> Self {
        Self {
            pending_eth: 0,
            pending_token: 0,
            policy,
        }
    }

    pub fn accumulate(&self, asset: Asset, amount: Amount) -> Result<FeeDistributor> {
        let mut next = *self;
        match asset {
            Asset::Eth => next.pending_eth = checked_add(self.pending_eth, amount)?,
            Asset::Token => next.pending_token = checked_add(self.pending_token, amount)?,
        }
        Ok(next)
    }

    /// Move both accumulators into the reserves in full.
    pub fn reinvest(&self, pool: &PoolState) -> Result<(FeeDistributor, PoolState, Reinvestment)> {
        pool.ensure_active()?;
        let reinvestment = Reinvestment {
            eth: self.pending_eth,
            token: self.pending_token,
        };
        let pool = pool.apply_reserve_delta(reinvestment.eth, reinvestment.token, Direction::Deposit)?;

        Ok((
            FeeDistributor {
                pending_eth: 0,
                pending_token: 0,
                policy: self.policy,
            },
            pool,
            reinvestment,
        ))
    }

    /// Move `fee` of one asset's accumulator into the matching reserve.
    pub fn distribute(&self, asset: Asset, fee: Amount, pool: &PoolState) -> Result<(FeeDistributor, PoolState)> {
        pool.ensure_active()?;
        if fee == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        let pending = self.pending(asset);
        if fee > pending {
            return Err(ExchangeError::InsufficientPendingReward {
                asset,
                requested: fee,
                pending,
            });
        }

        let mut next = *self;
        match asset {
            Asset::Eth => next.pending_eth -= fee,
            Asset::Token => next.pending_token -= fee,
        }
        let pool = pool.apply_asset_delta(asset, fee, Direction::Deposit)?;
        Ok((next, pool))
    }

    pub fn distribute_eth_fee(&self, fee: Amount, pool: &PoolState) -> Result<(FeeDistributor, PoolState)> {
        self.distribute(Asset::Eth, fee, pool)
    }

    pub fn distribute_token_fee(&self, fee: Amount, pool: &PoolState) -> Result<(FeeDistributor, PoolState)> {
        self.distribute(Asset::Token, fee, pool)
    }

    pub fn should_auto_reinvest(&self) -> bool {
        self.policy == FeePolicy::ReinvestOnPair && self.pending_eth > 0 && self.pending_token > 0
    }

    pub fn pending(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Eth => self.pending_eth,
            Asset::Token => self.pending_token,
        }
    }

    pub fn pending_eth(&self) -> Amount {
        self.pending_eth
    }

    pub fn pending_token(&self) -> Amount {
        self.pending_token
    }

    pub fn policy(&self) -> FeePolicy {
        self.policy
    }
}

/// Swap fee rate charged on the input side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStructure {
    pub fee_bips: u32,
}

impl FeeStructure {
    pub fn flat(fee_bips: u32) -> Self {
        Self { fee_bips }
    }

    pub fn percent(&self) -> Decimal {
        bips_to_percent(self.fee_bips)
    }
}

impl Default for FeeStructure {
    fn default() -> Self {
        Self::flat(DEFAULT_FEE_BIPS)
    }
}
