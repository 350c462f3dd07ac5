//! Money Conversion Module
//!
//! Unified conversion between the internal u64 representation and the
//! client-facing string/Decimal representation. All conversions MUST go
//! through this module.
//!
//! ## Internal Representation
//! - All amounts are stored as `u64` scaled units
//! - The scale factor is `10^decimals` (10^6 for USDC = micro-USDC)
//! - The authoritative source for decimals is [`crate::core_types::Currency`]
//!
//! No silent truncation: input with more fractional digits than the asset
//! allows is rejected, as are zero and negative amounts.

use rust_decimal::prelude::*;
use thiserror::Error;

/// Money conversion errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Convert a client string amount to the internal u64 representation.
///
/// # Errors
/// * `PrecisionOverflow` - input has more decimal places than allowed
/// * `InvalidAmount` - amount is zero or signed
/// * `Overflow` - result would overflow u64
/// * `InvalidFormat` - string format is invalid
pub fn parse_amount(amount_str: &str, decimals: u32) -> Result<u64, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    // Signs are rejected outright; a custodial transfer amount is unsigned.
    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    let parts: Vec<&str> = amount_str.split('.').collect();
    let (whole, frac) = match parts.len() {
        1 => (parts[0], ""),
        2 => {
            // Require both sides of the dot: rejects ".5" and "5."
            if parts[0].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing leading zero (e.g., use 0.5 instead of .5)".into(),
                ));
            }
            if parts[1].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
                ));
            }
            (parts[0], parts[1])
        }
        _ => return Err(MoneyError::InvalidFormat("multiple decimal points".into())),
    };

    if frac.len() > decimals as usize {
        return Err(MoneyError::PrecisionOverflow {
            provided: frac.len() as u32,
            max: decimals,
        });
    }

    let whole_num: u64 = whole.parse::<u64>().map_err(|e| {
        let err_str = e.to_string();
        if err_str.contains("too large") || err_str.contains("overflow") {
            MoneyError::Overflow
        } else {
            MoneyError::InvalidFormat(format!("invalid character in whole part: {}", whole))
        }
    })?;

    let frac_num: u64 = if frac.is_empty() {
        0
    } else {
        let frac_padded = format!("{:0<width$}", frac, width = decimals as usize);
        frac_padded[..decimals as usize]
            .parse::<u64>()
            .map_err(|_| MoneyError::InvalidFormat("invalid fractional part".into()))?
    };

    let multiplier = 10u64.pow(decimals);
    let amount = whole_num
        .checked_mul(multiplier)
        .and_then(|v: u64| v.checked_add(frac_num))
        .ok_or(MoneyError::Overflow)?;

    if amount == 0 {
        return Err(MoneyError::InvalidAmount);
    }

    Ok(amount)
}

/// Convert a `Decimal` (JSON boundary) to the internal u64 representation.
pub fn parse_decimal(decimal: Decimal, decimals: u32) -> Result<u64, MoneyError> {
    if decimal.is_sign_negative() || decimal.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }

    if decimal.scale() > decimals {
        return Err(MoneyError::PrecisionOverflow {
            provided: decimal.scale(),
            max: decimals,
        });
    }

    let multiplier = Decimal::from(10u64.pow(decimals));
    let scaled = decimal
        .checked_mul(multiplier)
        .ok_or(MoneyError::Overflow)?;
    scaled.trunc().to_u64().ok_or(MoneyError::Overflow)
}

/// Format an internal u64 amount for display.
///
/// Trailing fractional zeros are trimmed; whole amounts render without a dot.
pub fn format_amount(amount: u64, decimals: u32) -> String {
    let multiplier = 10u64.pow(decimals);
    let whole = amount / multiplier;
    let frac = amount % multiplier;

    if frac == 0 {
        return whole.to_string();
    }

    let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    format!("{}.{}", whole, trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_basic() {
        assert_eq!(parse_amount("1.5", 6).unwrap(), 1_500_000);
        assert_eq!(parse_amount("300", 6).unwrap(), 300_000_000);
        assert_eq!(parse_amount("0.000001", 6).unwrap(), 1);
    }

    #[test]
    fn test_parse_amount_rejects_non_positive() {
        assert_eq!(parse_amount("0", 6), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("0.0", 6), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("-5", 6), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("+5", 6), Err(MoneyError::InvalidAmount));
    }

    #[test]
    fn test_parse_amount_precision() {
        assert!(matches!(
            parse_amount("1.0000001", 6),
            Err(MoneyError::PrecisionOverflow { provided: 7, max: 6 })
        ));
    }

    #[test]
    fn test_parse_amount_format_errors() {
        assert!(matches!(
            parse_amount(".5", 6),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_amount("5.", 6),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_amount("1.2.3", 6),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_amount("abc", 6),
            Err(MoneyError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_amount_overflow() {
        assert_eq!(
            parse_amount("18446744073709551616", 6),
            Err(MoneyError::Overflow)
        );
    }

    fn dec(s: &str) -> Decimal {
        use std::str::FromStr;
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(dec("1.5"), 6).unwrap(), 1_500_000);
        assert_eq!(parse_decimal(dec("0"), 6), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_decimal(dec("-1"), 6), Err(MoneyError::InvalidAmount));
        assert!(matches!(
            parse_decimal(dec("1.1234567"), 6),
            Err(MoneyError::PrecisionOverflow { .. })
        ));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1_500_000, 6), "1.5");
        assert_eq!(format_amount(300_000_000, 6), "300");
        assert_eq!(format_amount(1, 6), "0.000001");
        assert_eq!(format_amount(0, 6), "0");
    }

    #[test]
    fn test_parse_format_roundtrip() {
        for s in ["1.5", "300", "0.000001", "12.345678"] {
            let v = parse_amount(s, 6).unwrap();
            assert_eq!(format_amount(v, 6), *s);
        }
    }
}
