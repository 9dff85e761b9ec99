//! Money arithmetic
//!
//! Line totals are computed in `Decimal` and stored as `f64`, rounded to
//! 2 decimal places half-up. Raw records keep floats because that is what
//! the store holds; the decimal detour avoids compounding float error when
//! multiplying price by quantity.

use rust_decimal::prelude::*;

const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Line total for a unit price and quantity
pub fn line_total(price: f64, quantity: i64) -> f64 {
    to_f64(to_decimal(price) * Decimal::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(12.0, 3), 36.0);
        assert_eq!(line_total(10.99, 3), 32.97);
        assert_eq!(line_total(0.0, 5), 0.0);
    }

    #[test]
    fn test_no_float_drift() {
        // 0.1 * 3 in raw f64 is 0.30000000000000004
        assert_eq!(line_total(0.1, 3), 0.3);
    }

    #[test]
    fn test_rounds_half_up() {
        assert_eq!(line_total(19.995, 1), 20.0);
        assert_eq!(to_f64(to_decimal(2.675)), 2.68);
    }
}
