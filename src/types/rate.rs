use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Amount, ExchangeError, Result};
use crate::utils::math::{Rounding, mul_div};

/// Fixed-point scale of every [`Rate`] and [`RateBound`]: a raw ratio of 1.5
/// is carried as `150`.
pub const RATE_SCALE: Amount = 100;

/// Exchange rate between the two assets, scaled by [`RATE_SCALE`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rate(Amount);

impl Rate {
    pub const ZERO: Rate = Rate(0);

    pub fn from_scaled(scaled: Amount) -> Self {
        Self(scaled)
    }

    /// `numerator / denominator`, scaled and rounded as requested.
    pub fn of(numerator: Amount, denominator: Amount, rounding: Rounding) -> Result<Self> {
        mul_div(numerator, RATE_SCALE, denominator, rounding).map(Rate)
    }

    pub fn scaled(&self) -> Amount {
        self.0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_u128(self.0)
            .map(|v| v / Decimal::from(RATE_SCALE as u64))
            .unwrap_or(Decimal::MAX)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Caller-supplied price protection, scaled by [`RATE_SCALE`].
///
/// A zero bound means no protection was requested and admits every rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateBound(Amount);

impl RateBound {
    pub const NONE: RateBound = RateBound(0);

    pub fn from_scaled(scaled: Amount) -> Self {
        Self(scaled)
    }

    /// Upper bound `quote * (1 + slippage_pct / 100)`, rounded up.
    ///
    /// `quote` should itself be rounded up (see [`PoolState::rate`]) so the
    /// bound never sits below the pre-trade rate. A zero `slippage_pct` yields
    /// [`RateBound::NONE`], matching callers that ask for no protection.
    ///
    /// [`PoolState::rate`]: crate::pool::PoolState::rate
    pub fn max_with_slippage(quote: Rate, slippage_pct: u32) -> Result<Self> {
        if slippage_pct == 0 {
            return Ok(Self::NONE);
        }
        if quote.scaled() == 0 {
            return Err(ExchangeError::UnboundableRate(quote));
        }
        let factor = 100 + Amount::from(slippage_pct);
        mul_div(quote.scaled(), factor, 100, Rounding::Up).map(RateBound)
    }

    /// Lower bound `quote * (1 - slippage_pct / 100)`, rounded down.
    ///
    /// Fails when the bound would round to zero, since zero disables the
    /// check. A tolerance of 100% or more asks for no lower bound.
    pub fn min_with_slippage(quote: Rate, slippage_pct: u32) -> Result<Self> {
        if slippage_pct == 0 || slippage_pct >= 100 {
            return Ok(Self::NONE);
        }
        let factor = 100 - Amount::from(slippage_pct);
        let bound = mul_div(quote.scaled(), factor, 100, Rounding::Down)?;
        if bound == 0 {
            return Err(ExchangeError::UnboundableRate(quote));
        }
        Ok(RateBound(bound))
    }

    pub fn scaled(&self) -> Amount {
        self.0
    }

    pub fn is_disabled(&self) -> bool {
        self.0 == 0
    }

    /// Rates above this bound are rejected.
    pub fn admits_at_most(&self, actual: Rate) -> bool {
        self.is_disabled() || actual.scaled() <= self.0
    }

    /// Rates below this bound are rejected.
    pub fn admits_at_least(&self, actual: Rate) -> bool {
        self.is_disabled() || actual.scaled() >= self.0
    }
}

impl fmt::Display for RateBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_disabled() {
            write!(f, "none")
        } else {
            write!(f, "{}", Rate(self.0))
        }
    }
}
