/*
 * Amount, slippage, gas and deadline helpers
 */

use chrono::Utc;
use ethers::types::U256;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;
use crate::models::{Result, SwapError, TradeType};

pub const DEFAULT_SLIPPAGE_PERCENT: u32 = 10;
pub const DEFAULT_GAS_BUFFER_PERCENT: u32 = 30;
pub const DEFAULT_DEADLINE_MINUTES: u64 = 30;
pub const ETHER_DECIMALS: u32 = 18;

const PRICE_SCALE: u32 = 12;

/// `expected * (100 - slippage) / 100`. Slippage above 100 is clamped so the
/// result never underflows.
#[must_use]
pub fn calculate_min_amount_out(expected_output: U256, slippage_percent: u32) -> U256 {
    if expected_output.is_zero() {
        return U256::zero();
    }
    let factor = 100 - slippage_percent.min(100);
    scale_percent(expected_output, u64::from(factor))
}

/// `estimate * (100 + buffer) / 100`, truncated.
#[must_use]
pub fn calculate_gas_with_buffer(gas_estimate: U256, buffer_percent: u32) -> U256 {
    scale_percent(gas_estimate, 100 + u64::from(buffer_percent))
}

/// `floor(value * percent / 100)` without overflowing the intermediate
/// product. Saturates at `U256::MAX`.
fn scale_percent(value: U256, percent: u64) -> U256 {
    let hundred = U256::from(100u8);
    let percent = U256::from(percent);
    let (quotient, remainder) = value.div_mod(hundred);
    quotient
        .saturating_mul(percent)
        .saturating_add(remainder * percent / hundred)
}

/// Unix timestamp `minutes_from_now` minutes ahead of the wall clock.
#[must_use]
pub fn create_deadline(minutes_from_now: u64) -> U256 {
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    U256::from(now + minutes_from_now * 60)
}

/// Parses a decimal ETH-style amount ("1.5") into an 18-decimal fixed point integer.
pub fn parse_amount(amount: &str) -> Result<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(SwapError::Format("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(SwapError::Format(format!("amount must not be negative: {trimmed}")));
    }

    let mut parts = trimmed.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();
    let well_formed = !(whole.is_empty() && fraction.is_empty())
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(SwapError::Format(format!("not a decimal number: {trimmed}")));
    }
    if fraction.len() > ETHER_DECIMALS as usize {
        return Err(SwapError::Format(format!(
            "more than {ETHER_DECIMALS} decimal places: {trimmed}"
        )));
    }

    ethers::utils::parse_ether(trimmed)
        .map_err(|e| SwapError::Format(format!("{trimmed}: {e}")))
}

/// Parses an amount that must also be strictly positive.
pub fn parse_positive_amount(amount: &str) -> Result<U256> {
    let parsed = parse_amount(amount)?;
    if parsed.is_zero() {
        return Err(SwapError::Validation("Invalid amount input".to_string()));
    }
    Ok(parsed)
}

#[must_use]
pub fn format_amount(amount: U256) -> String {
    ethers::utils::format_ether(amount)
}

/// Native ETH is always currency0, so buying is always zeroForOne.
#[must_use]
pub fn get_swap_direction(is_buying: bool) -> bool {
    is_buying
}

#[must_use]
pub fn get_swap_direction_from_trade_type(trade_type: TradeType) -> bool {
    get_swap_direction(trade_type == TradeType::Buy)
}

/// Spot price of currency1 denominated in currency0 units, adjusted for decimals.
pub fn sqrt_price_x96_to_price(sqrt_price_x96: U256, decimals0: u32, decimals1: u32) -> Result<Decimal> {
    if sqrt_price_x96.is_zero() {
        return Err(SwapError::Contract("Invalid sqrt price: zero".to_string()));
    }

    let mut raw = [0u8; 32];
    sqrt_price_x96.to_big_endian(&mut raw);
    let sqrt_price = BigUint::from_bytes_be(&raw);

    let ten = BigUint::from(10u32);
    let numerator = sqrt_price.pow(2) * ten.pow(decimals0) * ten.pow(PRICE_SCALE);
    let denominator = (BigUint::from(1u8) << 192u32) * ten.pow(decimals1);
    let scaled = numerator / denominator;

    if scaled.is_zero() {
        return Err(SwapError::Contract("Price calculation resulted in zero".to_string()));
    }

    let scaled = scaled
        .to_i128()
        .ok_or_else(|| SwapError::Contract("Price out of range".to_string()))?;
    Decimal::try_from_i128_with_scale(scaled, PRICE_SCALE)
        .map(|price| price.normalize())
        .map_err(|e| SwapError::Contract(format!("Failed to convert price: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    #[test]
    fn min_amount_out_applies_slippage() {
        let expected = eth(1);
        assert_eq!(
            calculate_min_amount_out(expected, 10),
            U256::from(900_000_000_000_000_000u64)
        );
        assert_eq!(calculate_min_amount_out(expected, 0), expected);
        assert_eq!(calculate_min_amount_out(expected, 100), U256::zero());
        assert_eq!(calculate_min_amount_out(U256::zero(), 5), U256::zero());
    }

    #[test]
    fn min_amount_out_is_monotonic_and_bounded() {
        let expected = U256::from(987_654_321u64);
        let mut previous = expected;
        for slippage in 0..=100 {
            let out = calculate_min_amount_out(expected, slippage);
            assert!(out <= expected);
            assert!(out <= previous);
            previous = out;
        }
        assert_eq!(calculate_min_amount_out(expected, 250), U256::zero());
    }

    #[test]
    fn percent_math_handles_full_width_values() {
        let max = U256::MAX;
        assert_eq!(calculate_min_amount_out(max, 0), max);
        assert_eq!(
            calculate_min_amount_out(max, 10),
            max / U256::from(100u8) * U256::from(90u8) + U256::from(35u8) * U256::from(90u8) / U256::from(100u8)
        );
        assert!(calculate_min_amount_out(max, 10) < max);
        assert_eq!(calculate_gas_with_buffer(max, 30), max);
        assert_eq!(calculate_gas_with_buffer(U256::from(1_001u32), 30), U256::from(1_301u32));
    }

    #[test]
    fn gas_buffer_never_shrinks_estimate() {
        for estimate in [0u64, 1, 21_000, 150_000, 2_999_999] {
            for buffer in [0u32, 10, 30, 100] {
                assert!(calculate_gas_with_buffer(U256::from(estimate), buffer) >= U256::from(estimate));
            }
        }
        assert_eq!(calculate_gas_with_buffer(U256::from(100_000u64), 30), U256::from(130_000u64));
        assert_eq!(calculate_gas_with_buffer(U256::from(3u64), 30), U256::from(3u64));
    }

    #[test]
    fn deadline_is_in_the_future() {
        let now = U256::from(Utc::now().timestamp() as u64);
        let deadline = create_deadline(30);
        assert!(deadline >= now + U256::from(30 * 60 - 1));
        assert!(deadline <= now + U256::from(30 * 60 + 5));
    }

    #[test]
    fn parses_decimal_amounts() {
        assert_eq!(parse_amount("1.0").unwrap(), eth(1));
        assert_eq!(parse_amount(" 2 ").unwrap(), eth(2));
        assert_eq!(parse_amount("0.5").unwrap(), U256::from(500_000_000_000_000_000u64));
        assert_eq!(parse_amount(".25").unwrap(), U256::from(250_000_000_000_000_000u64));
        assert_eq!(parse_amount("0.000000000000000001").unwrap(), U256::one());
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", "-1", "abc", "1.2.3", "1e18", ".", "0.0000000000000000001"] {
            assert!(
                matches!(parse_amount(bad), Err(SwapError::Format(_))),
                "{bad} should not parse"
            );
        }
        assert!(matches!(parse_positive_amount("0"), Err(SwapError::Validation(_))));
    }

    #[test]
    fn formats_back_to_ether_units() {
        assert!(format_amount(eth(3)).starts_with('3'));
    }

    #[test]
    fn direction_follows_native_currency0() {
        assert!(get_swap_direction(true));
        assert!(!get_swap_direction(false));
        assert!(get_swap_direction_from_trade_type(TradeType::Buy));
        assert!(!get_swap_direction_from_trade_type(TradeType::Sell));
    }

    #[test]
    fn sqrt_price_converts_to_spot_price() {
        // sqrtPriceX96 = 2^96 encodes a price of exactly 1.
        let one = U256::one() << 96;
        assert_eq!(sqrt_price_x96_to_price(one, 18, 18).unwrap(), Decimal::ONE);

        // 2 * 2^96 encodes a price of 4.
        let two = U256::from(2u8) << 96;
        assert_eq!(sqrt_price_x96_to_price(two, 18, 18).unwrap(), Decimal::from(4));

        let usdc_style = sqrt_price_x96_to_price(one, 18, 6).unwrap();
        assert_eq!(usdc_style, Decimal::from_str("1000000000000").unwrap());

        assert!(sqrt_price_x96_to_price(U256::zero(), 18, 18).is_err());
    }
}
