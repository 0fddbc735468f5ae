use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Amount, Asset, ExchangeError, Rate, Result};
use crate::utils::math::{Rounding, checked_add, checked_mul};

/// Pool lifecycle. A pool can be created exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolPhase {
    Uninitialized,
    Active,
    /// Every share was withdrawn; terminal
    Drained,
}

/// Direction of a reserve adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Deposit,
    Withdraw,
}

/// Reserves and invariant of the ETH/token pair.
///
/// All transitions return a new value; the exchange commits it only once the
/// whole operation has been planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    eth_reserve: Amount,
    token_reserve: Amount,
    k: Amount,
    phase: PoolPhase,
}

impl PoolState {
    pub fn new() -> Self {
        Self {
            eth_reserve: 0,
            token_reserve: 0,
            k: 0,
            phase: PoolPhase::Uninitialized,
        }
    }

    /// Seed the reserves of an uninitialized pool.
    pub fn create_pool(&self, initial_token: Amount, initial_eth: Amount) -> Result<PoolState> {
        if self.phase != PoolPhase::Uninitialized {
            return Err(ExchangeError::AlreadyInitialized);
        }
        if initial_token == 0 || initial_eth == 0 {
            return Err(ExchangeError::ZeroAmount);
        }

        Ok(PoolState {
            eth_reserve: initial_eth,
            token_reserve: initial_token,
            k: checked_mul(initial_eth, initial_token)?,
            phase: PoolPhase::Active,
        })
    }

    /// Move both reserves in one direction and recompute `k`.
    pub fn apply_reserve_delta(
        &self,
        delta_eth: Amount,
        delta_token: Amount,
        direction: Direction,
    ) -> Result<PoolState> {
        let (eth_reserve, token_reserve) = match direction {
            Direction::Deposit => (
                checked_add(self.eth_reserve, delta_eth)?,
                checked_add(self.token_reserve, delta_token)?,
            ),
            Direction::Withdraw => (
                self.eth_reserve.checked_sub(delta_eth).ok_or_else(|| {
                    ExchangeError::insufficient_reserves(Asset::Eth, delta_eth, self.eth_reserve)
                })?,
                self.token_reserve.checked_sub(delta_token).ok_or_else(|| {
                    ExchangeError::insufficient_reserves(Asset::Token, delta_token, self.token_reserve)
                })?,
            ),
        };

        let next = PoolState {
            eth_reserve,
            token_reserve,
            k: checked_mul(eth_reserve, token_reserve)?,
            phase: self.phase,
        };
        debug!(
            ?direction,
            delta_eth,
            delta_token,
            k_before = self.k,
            k_after = next.k,
            "planned reserve delta"
        );
        Ok(next)
    }

    /// Same as [`apply_reserve_delta`](Self::apply_reserve_delta) for one asset.
    pub fn apply_asset_delta(&self, asset: Asset, amount: Amount, direction: Direction) -> Result<PoolState> {
        match asset {
            Asset::Eth => self.apply_reserve_delta(amount, 0, direction),
            Asset::Token => self.apply_reserve_delta(0, amount, direction),
        }
    }

    /// Mark the pool as drained after its last share was burned.
    pub fn into_drained(self) -> PoolState {
        PoolState {
            phase: PoolPhase::Drained,
            ..self
        }
    }

    pub fn ensure_active(&self) -> Result<()> {
        match self.phase {
            PoolPhase::Active => Ok(()),
            PoolPhase::Uninitialized | PoolPhase::Drained => Err(ExchangeError::NotInitialized),
        }
    }

    pub fn eth_reserve(&self) -> Amount {
        self.eth_reserve
    }

    pub fn token_reserve(&self) -> Amount {
        self.token_reserve
    }

    pub fn reserve(&self, asset: Asset) -> Amount {
        match asset {
            Asset::Eth => self.eth_reserve,
            Asset::Token => self.token_reserve,
        }
    }

    pub fn k(&self) -> Amount {
        self.k
    }

    pub fn phase(&self) -> PoolPhase {
        self.phase
    }

    /// Units of the other asset per unit of `base`.
    pub fn rate(&self, base: Asset, rounding: Rounding) -> Result<Rate> {
        self.ensure_active()?;
        Rate::of(self.reserve(base.other()), self.reserve(base), rounding)
    }

    /// Tokens per ETH, floored
    pub fn price_eth(&self) -> Result<Rate> {
        self.rate(Asset::Eth, Rounding::Down)
    }

    /// ETH per token, floored
    pub fn price_token(&self) -> Result<Rate> {
        self.rate(Asset::Token, Rounding::Down)
    }
}

impl Default for PoolState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_pool() -> PoolState {
        PoolState::new().create_pool(20_000, 10_000).unwrap()
    }

    #[test]
    fn test_create_pool() {
        let pool = active_pool();
        assert_eq!(pool.phase(), PoolPhase::Active);
        assert_eq!(pool.eth_reserve(), 10_000);
        assert_eq!(pool.token_reserve(), 20_000);
        assert_eq!(pool.k(), 200_000_000);
    }

    #[test]
    fn test_create_pool_twice() {
        let pool = active_pool();
        assert!(matches!(pool.create_pool(1, 1), Err(ExchangeError::AlreadyInitialized)));
        assert!(matches!(
            pool.into_drained().create_pool(1, 1),
            Err(ExchangeError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_create_pool_zero_amount() {
        assert!(matches!(PoolState::new().create_pool(0, 10), Err(ExchangeError::ZeroAmount)));
        assert!(matches!(PoolState::new().create_pool(10, 0), Err(ExchangeError::ZeroAmount)));
    }

    #[test]
    fn test_create_pool_overflow() {
        assert!(matches!(
            PoolState::new().create_pool(Amount::MAX, 2),
            Err(ExchangeError::ArithmeticOverflow)
        ));
    }

    #[test]
    fn test_apply_reserve_delta() {
        let pool = active_pool();

        let deposited = pool.apply_reserve_delta(1_000, 2_000, Direction::Deposit).unwrap();
        assert_eq!(deposited.eth_reserve(), 11_000);
        assert_eq!(deposited.token_reserve(), 22_000);
        assert_eq!(deposited.k(), 11_000 * 22_000);

        let withdrawn = deposited.apply_reserve_delta(11_000, 22_000, Direction::Withdraw).unwrap();
        assert_eq!(withdrawn.k(), 0);

        // Original value untouched
        assert_eq!(pool.eth_reserve(), 10_000);
    }

    #[test]
    fn test_apply_reserve_delta_insufficient() {
        let pool = active_pool();
        let result = pool.apply_reserve_delta(0, 20_001, Direction::Withdraw);
        assert!(matches!(
            result,
            Err(ExchangeError::InsufficientReserves { asset: Asset::Token, requested: 20_001, available: 20_000 })
        ));
    }

    #[test]
    fn test_prices() {
        let pool = active_pool();
        assert_eq!(pool.price_eth().unwrap().scaled(), 200);
        assert_eq!(pool.price_token().unwrap().scaled(), 50);
        assert!(matches!(PoolState::new().price_eth(), Err(ExchangeError::NotInitialized)));
    }

    #[test]
    fn test_rate_rounding() {
        let pool = PoolState::new().create_pool(52_000, 1_000).unwrap();
        assert_eq!(pool.rate(Asset::Token, Rounding::Down).unwrap().scaled(), 1);
        assert_eq!(pool.rate(Asset::Token, Rounding::Up).unwrap().scaled(), 2);
        assert_eq!(pool.rate(Asset::Eth, Rounding::Up).unwrap().scaled(), 5_200);
    }
}
