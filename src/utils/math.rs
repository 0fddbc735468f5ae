use rust_decimal::Decimal;

use crate::types::{Amount, ExchangeError, Result};

/// 100% expressed in basis points
pub const BIPS_DENOMINATOR: Amount = 10_000;

/// Rounding direction for integer division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
    Nearest,
}

pub fn checked_add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(ExchangeError::ArithmeticOverflow)
}

pub fn checked_sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b).ok_or(ExchangeError::ArithmeticOverflow)
}

pub fn checked_mul(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_mul(b).ok_or(ExchangeError::ArithmeticOverflow)
}

pub fn checked_div(a: Amount, b: Amount, rounding: Rounding) -> Result<Amount> {
    if b == 0 {
        return Err(ExchangeError::ArithmeticOverflow);
    }
    let quotient = a / b;
    let remainder = a % b;

    let round_up = match rounding {
        Rounding::Down => false,
        Rounding::Up => remainder > 0,
        // remainder >= b - remainder, without overflowing on 2 * remainder
        Rounding::Nearest => remainder >= b - remainder,
    };

    if round_up {
        checked_add(quotient, 1)
    } else {
        Ok(quotient)
    }
}

/// `a * b / denominator` with an overflow-checked intermediate product.
pub fn mul_div(a: Amount, b: Amount, denominator: Amount, rounding: Rounding) -> Result<Amount> {
    checked_div(checked_mul(a, b)?, denominator, rounding)
}

/// Split `amount` into `(net, fee)` for a fee of `fee_bips` basis points.
///
/// The net side is floored, so any rounding dust lands in the fee.
pub fn apply_fee(amount: Amount, fee_bips: u32) -> Result<(Amount, Amount)> {
    let fee_bips = Amount::from(fee_bips);
    if fee_bips > BIPS_DENOMINATOR {
        return Err(ExchangeError::Config(format!(
            "fee of {} bips exceeds 100%",
            fee_bips
        )));
    }
    let net = mul_div(amount, BIPS_DENOMINATOR - fee_bips, BIPS_DENOMINATOR, Rounding::Down)?;
    Ok((net, amount - net))
}

/// Calculate constant product AMM output amount
///
/// `reserve_out * amount_in / (reserve_in + amount_in)`, floored so the pool
/// never pays out more than the invariant allows.
pub fn calculate_amm_output(amount_in: Amount, reserve_in: Amount, reserve_out: Amount) -> Result<Amount> {
    let denominator = checked_add(reserve_in, amount_in)?;
    mul_div(reserve_out, amount_in, denominator, Rounding::Down)
}

/// Calculate price impact for a trade, as a percentage of the spot output
///
/// Compares the realized output against what the pre-trade spot price would
/// have paid for the same input.
pub fn calculate_price_impact(
    amount_in: Amount,
    amount_out: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
) -> Decimal {
    let Ok(spot_out) = mul_div(amount_in, reserve_out, reserve_in, Rounding::Down) else {
        return Decimal::ZERO;
    };
    if spot_out == 0 || amount_out >= spot_out {
        return Decimal::ZERO;
    }
    let shortfall = spot_out - amount_out;
    mul_div(shortfall, BIPS_DENOMINATOR, spot_out, Rounding::Up)
        .map(|bips| Decimal::from(bips as u64) / Decimal::from(100))
        .unwrap_or(Decimal::ZERO)
}

/// Convert basis points to a percentage
pub fn bips_to_percent(bips: u32) -> Decimal {
    Decimal::from(bips) / Decimal::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_checked_ops_fail_on_overflow() {
        assert!(matches!(checked_add(Amount::MAX, 1), Err(ExchangeError::ArithmeticOverflow)));
        assert!(matches!(checked_sub(0, 1), Err(ExchangeError::ArithmeticOverflow)));
        assert!(matches!(checked_mul(Amount::MAX, 2), Err(ExchangeError::ArithmeticOverflow)));
        assert!(matches!(checked_div(1, 0, Rounding::Down), Err(ExchangeError::ArithmeticOverflow)));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(checked_div(7, 2, Rounding::Down).unwrap(), 3);
        assert_eq!(checked_div(7, 2, Rounding::Up).unwrap(), 4);
        assert_eq!(checked_div(7, 2, Rounding::Nearest).unwrap(), 4);
        assert_eq!(checked_div(7, 3, Rounding::Nearest).unwrap(), 2);
        assert_eq!(checked_div(6, 3, Rounding::Up).unwrap(), 2);
        assert_eq!(checked_div(Amount::MAX, Amount::MAX, Rounding::Nearest).unwrap(), 1);
    }

    #[test]
    fn test_apply_fee() {
        assert_eq!(apply_fee(10_000, 30).unwrap(), (9_970, 30));
        assert_eq!(apply_fee(10_000, 0).unwrap(), (10_000, 0));
        // 999 * 0.997 = 996.003 -> net floors to 996
        assert_eq!(apply_fee(999, 30).unwrap(), (996, 3));
        assert!(apply_fee(1, 10_001).is_err());
    }

    #[test]
    fn test_calculate_amm_output() {
        // 10e9/10e9 pool, 10e6 in: 10e9 * 10e6 / (10e9 + 10e6) = 9_990_009.99..
        let out = calculate_amm_output(10_000_000, 10_000_000_000, 10_000_000_000).unwrap();
        assert_eq!(out, 9_990_009);
    }

    #[test]
    fn test_calculate_price_impact() {
        let impact = calculate_price_impact(1_000, 909, 10_000, 10_000);
        assert_eq!(impact, dec!(9.10));

        assert_eq!(calculate_price_impact(1_000, 1_000, 10_000, 10_000), Decimal::ZERO);
    }
}
