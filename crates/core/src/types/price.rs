//! Price helpers.
//!
//! The backend sends prices as plain numbers in euros. They are kept as
//! [`Decimal`] everywhere so subtotals do not pick up float noise, and only
//! converted to minor units when building a checkout payload.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount for display, e.g. `"12.50 €"`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2} €")
}

/// Convert an amount to integer minor units (cents), rounding half away from zero.
///
/// Returns `None` if the result does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price_pads_decimals() {
        assert_eq!(format_price(Decimal::new(25, 0)), "25.00 €");
        assert_eq!(format_price(Decimal::new(1999, 2)), "19.99 €");
    }

    #[test]
    fn test_format_price_rounds() {
        assert_eq!(format_price(Decimal::new(10005, 3)), "10.01 €");
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(25, 0)), Some(2500));
        assert_eq!(to_minor_units(Decimal::new(1999, 2)), Some(1999));
        // 0.125 € -> 12.5 cents -> 13
        assert_eq!(to_minor_units(Decimal::new(125, 3)), Some(13));
    }

    #[test]
    fn test_to_minor_units_overflow() {
        assert_eq!(to_minor_units(Decimal::MAX), None);
    }
}
