//! Fixed-point price helpers used during enrichment.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::core::PriceError;

/// On-chain prices carry 18 decimals.
pub const BASE_PRICE_SCALE: u32 = 18;
pub const AMOUNT_DECIMALS: u32 = 3;
pub const FIAT_DECIMALS: u32 = 2;

/// Converts an unsigned integer base price to a token amount rounded to
/// three places.
/// The result is normalized, so whole amounts display without a fraction.
pub fn amount_from_base_price(base_price: &str) -> Result<Decimal, PriceError> {
    let trimmed = base_price.trim();
    if trimmed.starts_with('-') {
        return Err(PriceError::OutOfRange(trimmed.to_string()));
    }
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceError::NotAnInteger(base_price.to_string()));
    }

    let raw = trimmed
        .parse::<u128>()
        .ok()
        .and_then(|raw| i128::try_from(raw).ok())
        .ok_or_else(|| PriceError::OutOfRange(trimmed.to_string()))?;

    let amount = Decimal::try_from_i128_with_scale(raw, BASE_PRICE_SCALE)
        .map_err(|_| PriceError::OutOfRange(trimmed.to_string()))?;

    Ok(amount
        .round_dp_with_strategy(AMOUNT_DECIMALS, RoundingStrategy::MidpointNearestEven)
        .normalize())
}

/// Fiat value of `amount` at `rate`, rounded to cents.
pub fn fiat_value(amount: Decimal, rate: Decimal) -> Decimal {
    amount
        .checked_mul(rate)
        .unwrap_or(Decimal::MAX)
        .round_dp_with_strategy(FIAT_DECIMALS, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Shortens an address to `front...back` characters.
pub fn truncate_address(address: &str, front: usize, back: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= front + back {
        return address.to_string();
    }

    let head: String = chars[..front].iter().collect();
    let tail: String = chars[chars.len() - back..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_amount_collapses_to_integer() {
        let amount = amount_from_base_price("3000000000000000000").unwrap();
        assert_eq!(amount, Decimal::from(3));
        assert_eq!(amount.to_string(), "3");
    }

    #[test]
    fn test_fractional_amount() {
        let amount = amount_from_base_price("1500000000000000000").unwrap();
        assert_eq!(amount.to_string(), "1.5");
    }

    #[test]
    fn test_amount_rounds_half_even_to_three_places() {
        // 1.2345 -> 1.234, 1.2355 -> 1.236
        assert_eq!(
            amount_from_base_price("1234500000000000000").unwrap().to_string(),
            "1.234"
        );
        assert_eq!(
            amount_from_base_price("1235500000000000000").unwrap().to_string(),
            "1.236"
        );
        assert_eq!(
            amount_from_base_price("999").unwrap().to_string(),
            "0"
        );
    }

    #[test]
    fn test_invalid_base_price() {
        assert_eq!(
            amount_from_base_price("1.5"),
            Err(PriceError::NotAnInteger("1.5".to_string()))
        );
        assert!(matches!(
            amount_from_base_price(&"9".repeat(35)),
            Err(PriceError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_signed_base_price_is_rejected() {
        assert_eq!(
            amount_from_base_price("-1000000000000000000"),
            Err(PriceError::OutOfRange("-1000000000000000000".to_string()))
        );
        assert_eq!(
            amount_from_base_price("+2000000000000000000"),
            Err(PriceError::NotAnInteger("+2000000000000000000".to_string()))
        );
        assert!(matches!(
            amount_from_base_price(""),
            Err(PriceError::NotAnInteger(_))
        ));
        assert!(matches!(
            amount_from_base_price(&"9".repeat(40)),
            Err(PriceError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_fiat_value() {
        assert_eq!(
            fiat_value(Decimal::from(2), Decimal::new(45, 2)).to_string(),
            "0.9"
        );
        assert_eq!(
            fiat_value(Decimal::from(1), Decimal::new(5, 1)).to_string(),
            "0.5"
        );
        assert_eq!(
            fiat_value(Decimal::from(4), Decimal::new(25, 2)).to_string(),
            "1"
        );
        assert_eq!(
            fiat_value(Decimal::new(1333, 3), Decimal::new(3, 0)).to_string(),
            "4"
        );
    }

    #[test]
    fn test_truncate_address() {
        assert_eq!(truncate_address("0xABCDEF1234567890", 6, 3), "0xABCD...890");
        assert_eq!(truncate_address("0xABCDEF", 6, 3), "0xABCDEF");
    }
}
