//! Fixed-precision money helpers built on [`Decimal`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Fraction digits carried by displayed and compared amounts.
pub const MONEY_SCALE: u32 = 2;

/// One cent; the smallest remainder the settlement netting keeps alive.
pub const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Rounds an amount to [`MONEY_SCALE`] digits, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Renders an amount with exactly two fraction digits (`280` -> `"280.00"`).
pub fn format_money(amount: Decimal) -> String {
    let mut rounded = round_money(amount);
    rounded.rescale(MONEY_SCALE);
    rounded.to_string()
}

/// True when `a` and `b` differ by at most `tolerance`.
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn formats_with_two_fraction_digits() {
        assert_eq!(format_money(dec("280")), "280.00");
        assert_eq!(format_money(dec("0.005")), "0.01");
        assert_eq!(format_money(dec("-12.345")), "-12.35");
    }

    #[test]
    fn decimal_sums_stay_exact() {
        let total: Decimal = [dec("0.1"), dec("0.2")].into_iter().sum();
        assert_eq!(total, dec("0.3"));
        assert!(within_tolerance(total, dec("0.30005"), dec("0.0001")));
        assert_eq!(CENT, dec("0.01"));
    }
}
