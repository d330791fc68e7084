//! Human-unit to smallest-unit conversion.
//!
//! Conversion is done on the decimal text of the amount rather than with
//! float multiplication, so `1.23456789` at 9 decimals is exactly
//! `1_234_567_890`. Fractional digits beyond the asset's scale are dropped
//! (truncation toward zero); the result is never rounded up.

use crate::error::DelegationError;

/// Convert a decimal string such as `"1.5"` to smallest units.
pub fn parse_ui_amount(amount: &str, decimals: u8) -> Result<u64, DelegationError> {
    let amount = amount.trim();
    if amount.starts_with('-') {
        return Err(DelegationError::InvalidAmount(format!(
            "negative amount {amount}"
        )));
    }
    let amount = amount.strip_prefix('+').unwrap_or(amount);

    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(DelegationError::InvalidAmount("empty amount".into()));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(DelegationError::InvalidAmount(format!(
            "not a decimal number: {amount}"
        )));
    }

    let overflow = || DelegationError::InvalidAmount(format!("{amount} overflows u64"));

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| overflow())?
    };

    let kept: String = fraction.chars().take(decimals as usize).collect();
    let fraction_units = if kept.bytes().all(|b| b == b'0') {
        0
    } else {
        let padded = format!("{kept:0<width$}", width = decimals as usize);
        padded.parse::<u64>().map_err(|_| overflow())?
    };

    // The scale only matters once there are whole units to multiply.
    if whole_units == 0 {
        return Ok(fraction_units);
    }
    let scale = 10u64.checked_pow(decimals as u32).ok_or_else(overflow)?;

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(overflow)
}

/// Convert a floating-point human amount to smallest units.
///
/// The float is rendered with its shortest round-trip representation and
/// parsed as decimal text, so the truncation rule matches
/// [`parse_ui_amount`] exactly.
pub fn ui_amount_to_smallest_units(amount: f64, decimals: u8) -> Result<u64, DelegationError> {
    if !amount.is_finite() {
        return Err(DelegationError::InvalidAmount(format!(
            "non-finite amount {amount}"
        )));
    }
    if amount < 0.0 {
        return Err(DelegationError::InvalidAmount(format!(
            "negative amount {amount}"
        )));
    }
    // -0.0 passes the sign check but renders as "-0".
    if amount == 0.0 {
        return Ok(0);
    }
    // `{}` on f64 never uses exponent notation.
    parse_ui_amount(&format!("{amount}"), decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_and_a_half_at_nine_decimals() {
        assert_eq!(ui_amount_to_smallest_units(1.5, 9).unwrap(), 1_500_000_000);
    }

    #[test]
    fn excess_precision_truncates() {
        assert_eq!(
            ui_amount_to_smallest_units(1.23456789, 9).unwrap(),
            1_234_567_890
        );
        assert_eq!(parse_ui_amount("0.1234567899", 9).unwrap(), 123_456_789);
        assert_eq!(parse_ui_amount("2.999", 2).unwrap(), 299);
    }

    #[test]
    fn zero_decimals_drops_fraction() {
        assert_eq!(parse_ui_amount("42.9", 0).unwrap(), 42);
    }

    #[test]
    fn accepts_bare_forms() {
        assert_eq!(parse_ui_amount("3", 6).unwrap(), 3_000_000);
        assert_eq!(parse_ui_amount(".5", 6).unwrap(), 500_000);
        assert_eq!(parse_ui_amount("7.", 6).unwrap(), 7_000_000);
        assert_eq!(parse_ui_amount(" 0 ", 9).unwrap(), 0);
    }

    #[test]
    fn rejects_negative_and_garbage() {
        for input in ["-1", "abc", "1.2.3", "", ".", "1e9"] {
            assert!(
                matches!(
                    parse_ui_amount(input, 9),
                    Err(DelegationError::InvalidAmount(_))
                ),
                "{input:?} should be rejected"
            );
        }
        assert!(ui_amount_to_smallest_units(-0.5, 9).is_err());
        assert!(ui_amount_to_smallest_units(f64::NAN, 9).is_err());
        assert!(ui_amount_to_smallest_units(f64::INFINITY, 9).is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_ui_amount("18446744074", 9).is_err());
        assert!(parse_ui_amount("1", 20).is_err());
        assert_eq!(
            parse_ui_amount("18446744073.709551615", 9).unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn negative_zero_is_zero() {
        assert_eq!(ui_amount_to_smallest_units(-0.0, 9).unwrap(), 0);
        assert_eq!(ui_amount_to_smallest_units(0.0, 9).unwrap(), 0);
    }

    #[test]
    fn zero_at_any_scale_is_zero() {
        assert_eq!(parse_ui_amount("0", 20).unwrap(), 0);
        assert_eq!(parse_ui_amount("0.000", 255).unwrap(), 0);
        assert_eq!(ui_amount_to_smallest_units(0.0, 30).unwrap(), 0);
    }

    #[test]
    fn fraction_alone_fits_wide_scale() {
        assert_eq!(parse_ui_amount("0.5", 19).unwrap(), 5_000_000_000_000_000_000);
        assert!(parse_ui_amount("0.5", 20).is_err());
    }

    #[test]
    fn tiny_float_truncates_to_zero() {
        assert_eq!(ui_amount_to_smallest_units(0.0000000001, 9).unwrap(), 0);
    }
}
