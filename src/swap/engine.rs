use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pool::{Direction, FeeStructure, PoolState};
use crate::types::{Amount, Asset, ExchangeError, Rate, RateBound, Result};
use crate::utils::math::{Rounding, apply_fee, calculate_amm_output, calculate_price_impact};

/// Priced swap against a pool snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    pub asset_in: Asset,
    /// Gross input supplied by the trader
    pub amount_in: Amount,
    /// Input left after the fee, the part that enters the reserves
    pub net_in: Amount,
    pub fee: Amount,
    pub amount_out: Amount,
    /// Input paid per unit of output, rounded up
    pub realized_rate: Rate,
    pub price_impact_percent: Decimal,
}

impl SwapQuote {
    pub fn asset_out(&self) -> Asset {
        self.asset_in.other()
    }
}

/// Constant-product pricing with the fee taken from the input side.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapEngine {
    fees: FeeStructure,
}

impl SwapEngine {
    pub fn new(fees: FeeStructure) -> Self {
        Self { fees }
    }

    pub fn fee_bips(&self) -> u32 {
        self.fees.fee_bips
    }

    /// Price `amount_in` of `asset_in` without any slippage check.
    pub fn quote(&self, pool: &PoolState, asset_in: Asset, amount_in: Amount) -> Result<SwapQuote> {
        pool.ensure_active()?;
        if amount_in == 0 {
            return Err(ExchangeError::ZeroAmount);
        }

        let reserve_in = pool.reserve(asset_in);
        let reserve_out = pool.reserve(asset_in.other());

        let (net_in, fee) = apply_fee(amount_in, self.fees.fee_bips)?;
        let amount_out = calculate_amm_output(net_in, reserve_in, reserve_out)?;
        if amount_out == 0 {
            return Err(ExchangeError::ZeroAmount);
        }

        Ok(SwapQuote {
            asset_in,
            amount_in,
            net_in,
            fee,
            amount_out,
            realized_rate: Rate::of(amount_in, amount_out, Rounding::Up)?,
            price_impact_percent: calculate_price_impact(amount_in, amount_out, reserve_in, reserve_out),
        })
    }

    /// Quote and enforce the caller's maximum input-per-output rate.
    pub fn quote_with_bound(
        &self,
        pool: &PoolState,
        asset_in: Asset,
        amount_in: Amount,
        max_rate: RateBound,
    ) -> Result<SwapQuote> {
        let quote = self.quote(pool, asset_in, amount_in)?;
        if !max_rate.admits_at_most(quote.realized_rate) {
            return Err(ExchangeError::SlippageExceeded {
                bound: max_rate,
                actual: quote.realized_rate,
            });
        }

        debug!(
            %asset_in,
            amount_in,
            amount_out = quote.amount_out,
            fee = quote.fee,
            realized_rate = %quote.realized_rate,
            "swap quoted"
        );
        Ok(quote)
    }

    pub fn swap_exact_eth_for_tokens(&self, pool: &PoolState, eth_in: Amount, max_rate: RateBound) -> Result<SwapQuote> {
        self.quote_with_bound(pool, Asset::Eth, eth_in, max_rate)
    }

    pub fn swap_exact_tokens_for_eth(
        &self,
        pool: &PoolState,
        token_in: Amount,
        max_rate: RateBound,
    ) -> Result<SwapQuote> {
        self.quote_with_bound(pool, Asset::Token, token_in, max_rate)
    }

    /// Reserves after the quote executes. The fee is not included; it belongs
    /// to the fee accumulator.
    pub fn settle(&self, pool: &PoolState, quote: &SwapQuote) -> Result<PoolState> {
        let after = pool
            .apply_asset_delta(quote.asset_in, quote.net_in, Direction::Deposit)?
            .apply_asset_delta(quote.asset_out(), quote.amount_out, Direction::Withdraw)?;

        debug_assert!(after.k() >= pool.k(), "swap decreased k");
        Ok(after)
    }
}
