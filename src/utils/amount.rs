//! Amount normalization utilities
//!
//! All matching and aggregation compares integer minor units; decimals only
//! exist at the boundaries (source text, external ledger amounts).

use bigdecimal::{BigDecimal, ToPrimitive};

use crate::types::{ReconError, ReconResult};

/// Convert a decimal amount to integer minor units (two decimal places)
///
/// Returns `None` if the value carries more than two decimal places or
/// does not fit an i64 after scaling; no silent rounding.
pub fn to_minor_units(amount: &BigDecimal) -> Option<i64> {
    let scaled = amount * BigDecimal::from(100);
    if !scaled.is_integer() {
        return None;
    }
    scaled.with_scale(0).to_i64()
}

/// Parse a decimal string from a statement source into minor units
///
/// Accepts both "," and "." as the decimal separator and strips thousands
/// separators and surrounding whitespace, so "1.234,56", "1,234.56" and
/// "1234.56" all yield 123456.
pub fn parse_decimal(raw: &str) -> ReconResult<i64> {
    let text = normalize_decimal_text(raw)?;
    let value: BigDecimal = text
        .parse()
        .map_err(|_| invalid_amount(raw, "not a decimal number"))?;
    to_minor_units(&value)
        .ok_or_else(|| invalid_amount(raw, "finer than two decimal places or out of range"))
}

fn invalid_amount(raw: &str, why: &str) -> ReconError {
    ReconError::Validation(format!("invalid amount '{}': {}", raw.trim(), why))
}

/// Rewrite a localized decimal string into canonical "-1234.56" form
fn normalize_decimal_text(raw: &str) -> ReconResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid_amount(raw, "empty"));
    }

    let last_comma = trimmed.rfind(',');
    let last_dot = trimmed.rfind('.');

    // The rightmost separator is the decimal point; everything else is a
    // thousands separator and dropped.
    let decimal_sep = match (last_comma, last_dot) {
        (Some(c), Some(d)) => Some(if c > d { ',' } else { '.' }),
        (Some(_), None) => Some(','),
        (None, Some(_)) => Some('.'),
        (None, None) => None,
    };

    let mut out = String::with_capacity(trimmed.len());
    for (i, ch) in trimmed.char_indices() {
        match ch {
            '0'..='9' => out.push(ch),
            '-' | '+' if out.is_empty() => out.push(ch),
            ',' | '.' => {
                let is_decimal = decimal_sep == Some(ch)
                    && Some(i) == if ch == ',' { last_comma } else { last_dot };
                if is_decimal {
                    out.push('.');
                }
            }
            ' ' | '\u{a0}' | '\'' => {} // thousands spacing
            _ => return Err(invalid_amount(raw, "unexpected character")),
        }
    }

    if out.is_empty() || out == "-" || out == "+" {
        return Err(invalid_amount(raw, "no digits"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_plain_decimal_point() {
        assert_eq!(parse_decimal("150.00").unwrap(), 15000);
        assert_eq!(parse_decimal("0.05").unwrap(), 5);
    }

    #[test]
    fn test_parse_decimal_comma() {
        assert_eq!(parse_decimal("150,00").unwrap(), 15000);
        assert_eq!(parse_decimal("-75,50").unwrap(), -7550);
    }

    #[test]
    fn test_parse_thousands_separators() {
        assert_eq!(parse_decimal("1.234,56").unwrap(), 123456);
        assert_eq!(parse_decimal("1,234.56").unwrap(), 123456);
        assert_eq!(parse_decimal("12 345,00").unwrap(), 1234500);
    }

    #[test]
    fn test_parse_integral_amount() {
        assert_eq!(parse_decimal("200").unwrap(), 20000);
        assert_eq!(parse_decimal("-42").unwrap(), -4200);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_decimal("").is_err());
        assert!(parse_decimal("abc").is_err());
        assert!(parse_decimal("12x.00").is_err());
        assert!(parse_decimal("-").is_err());
    }

    #[test]
    fn test_parse_rejects_sub_minor_precision() {
        assert!(parse_decimal("12.345").is_err());
        assert!(parse_decimal("0,001").is_err());
        // Trailing zeros beyond two places are still exact minor units
        assert_eq!(parse_decimal("12.3400").unwrap(), 1234);
    }

    #[test]
    fn test_to_minor_units_from_bigdecimal() {
        let amount = BigDecimal::from_str("99.99").unwrap();
        assert_eq!(to_minor_units(&amount), Some(9999));
        let whole = BigDecimal::from(100);
        assert_eq!(to_minor_units(&whole), Some(10000));
        let sub_minor = BigDecimal::from_str("12.345").unwrap();
        assert_eq!(to_minor_units(&sub_minor), None);
    }
}
