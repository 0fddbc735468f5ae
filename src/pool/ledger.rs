use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pool::PoolState;
use crate::types::{Address, Amount, ExchangeError, Result};
use crate::utils::math::{Rounding, checked_add, mul_div};

/// Shares to be credited to a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareMint {
    pub provider: Address,
    pub shares: Amount,
}

/// Shares to be burned and the reserves they redeem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareBurn {
    pub provider: Address,
    pub shares: Amount,
    pub eth_out: Amount,
    pub token_out: Amount,
}

/// Share accounting for liquidity providers.
///
/// `plan_*` methods only compute; [`commit_mint`](Self::commit_mint) and
/// [`commit_burn`](Self::commit_burn) apply a plan and cannot fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiquidityLedger {
    total_shares: Amount,
    balances: HashMap<Address, Amount>,
    /// Providers in order of first contribution
    providers: Vec<Address>,
}

impl LiquidityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares owed for `eth_contribution`.
    ///
    /// At genesis (no shares yet) the contribution itself is the share count,
    /// which fixes the unit scale for later proportional issuance.
    pub fn plan_mint(&self, provider: &Address, eth_contribution: Amount, eth_reserve: Amount) -> Result<ShareMint> {
        let shares = if self.total_shares == 0 {
            eth_contribution
        } else {
            mul_div(eth_contribution, self.total_shares, eth_reserve, Rounding::Down)?
        };

        if shares == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        checked_add(self.total_shares, shares)?;

        Ok(ShareMint {
            provider: provider.clone(),
            shares,
        })
    }

    /// Plan and commit a mint in one step.
    pub fn mint_shares(&mut self, provider: &Address, eth_contribution: Amount, eth_reserve: Amount) -> Result<Amount> {
        let mint = self.plan_mint(provider, eth_contribution, eth_reserve)?;
        let shares = mint.shares;
        self.commit_mint(mint);
        Ok(shares)
    }

    /// Redeem `shares` for a floored proportional slice of both reserves.
    pub fn plan_burn(&self, provider: &Address, shares: Amount, pool: &PoolState) -> Result<ShareBurn> {
        self.ensure_holds(provider, shares)?;
        if shares == 0 {
            return Err(ExchangeError::ZeroAmount);
        }

        Ok(ShareBurn {
            provider: provider.clone(),
            shares,
            eth_out: mul_div(shares, pool.eth_reserve(), self.total_shares, Rounding::Down)?,
            token_out: mul_div(shares, pool.token_reserve(), self.total_shares, Rounding::Down)?,
        })
    }

    /// Plan a burn of the provider's whole balance.
    pub fn plan_burn_all(&self, provider: &Address, pool: &PoolState) -> Result<ShareBurn> {
        let held = self.shares_of(provider);
        if held == 0 {
            return Err(ExchangeError::InsufficientShares {
                provider: provider.clone(),
                requested: 0,
                held,
            });
        }
        self.plan_burn(provider, held, pool)
    }

    /// Plan a withdrawal of exactly `eth_amount` ETH.
    ///
    /// The share cost is rounded up and the token side down, so the remaining
    /// providers never fund the rounding.
    pub fn plan_withdraw_eth(&self, provider: &Address, eth_amount: Amount, pool: &PoolState) -> Result<ShareBurn> {
        if eth_amount == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        let shares = mul_div(eth_amount, self.total_shares, pool.eth_reserve(), Rounding::Up)?;
        self.ensure_holds(provider, shares)?;

        Ok(ShareBurn {
            provider: provider.clone(),
            shares,
            eth_out: eth_amount,
            token_out: mul_div(eth_amount, pool.token_reserve(), pool.eth_reserve(), Rounding::Down)?,
        })
    }

    /// Plan and commit a burn in one step.
    pub fn burn_shares(&mut self, provider: &Address, shares: Amount, pool: &PoolState) -> Result<ShareBurn> {
        let burn = self.plan_burn(provider, shares, pool)?;
        self.commit_burn(&burn);
        Ok(burn)
    }

    pub fn burn_all_shares(&mut self, provider: &Address, pool: &PoolState) -> Result<ShareBurn> {
        let burn = self.plan_burn_all(provider, pool)?;
        self.commit_burn(&burn);
        Ok(burn)
    }

    pub fn commit_mint(&mut self, mint: ShareMint) {
        self.total_shares += mint.shares;
        let balance = self.balances.entry(mint.provider.clone()).or_insert_with(|| {
            self.providers.push(mint.provider.clone());
            0
        });
        *balance += mint.shares;
        debug!(provider = %mint.provider, shares = mint.shares, total = self.total_shares, "minted shares");
    }

    pub fn commit_burn(&mut self, burn: &ShareBurn) {
        let remaining = match self.balances.get_mut(&burn.provider) {
            Some(balance) => {
                *balance -= burn.shares;
                *balance
            }
            None => return,
        };
        self.total_shares -= burn.shares;

        if remaining == 0 {
            self.balances.remove(&burn.provider);
            self.providers.retain(|p| p != &burn.provider);
        }
        debug!(provider = %burn.provider, shares = burn.shares, total = self.total_shares, "burned shares");
    }

    pub fn total_shares(&self) -> Amount {
        self.total_shares
    }

    pub fn shares_of(&self, provider: &Address) -> Amount {
        self.balances.get(provider).copied().unwrap_or(0)
    }

    pub fn providers(&self) -> &[Address] {
        &self.providers
    }

    pub fn provider_at(&self, index: usize) -> Option<&Address> {
        self.providers.get(index)
    }

    /// Recorded total equals the sum of provider balances
    pub fn is_consistent(&self) -> bool {
        let sum: Option<Amount> = self.balances.values().try_fold(0u128, |acc, b| acc.checked_add(*b));
        sum == Some(self.total_shares) && self.balances.len() == self.providers.len()
    }

    fn ensure_holds(&self, provider: &Address, shares: Amount) -> Result<()> {
        let held = self.shares_of(provider);
        if shares > held {
            return Err(ExchangeError::InsufficientShares {
                provider: provider.clone(),
                requested: shares,
                held,
            });
        }
        Ok(())
    }
}
