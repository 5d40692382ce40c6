//! Price arithmetic shared by the strategies

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Percent change going from `from` to `to`
///
/// `None` when `from` is zero, which strategies treat as missing data.
pub fn percent_diff(from: Decimal, to: Decimal) -> Option<Decimal> {
    if from.is_zero() {
        return None;
    }
    Some((to - from) / from * dec!(100))
}

/// Whether no point falls below the first, plus the overall percent change
pub fn upward(points: &[Decimal]) -> Option<(bool, Decimal)> {
    let (first, rest) = points.split_first()?;
    let last = rest.last().unwrap_or(first);
    let change = percent_diff(*first, *last)?;
    Some((rest.iter().all(|p| p >= first), change))
}

/// Whether no point rises above the first, plus the overall percent change
pub fn downward(points: &[Decimal]) -> Option<(bool, Decimal)> {
    let (first, rest) = points.split_first()?;
    let last = rest.last().unwrap_or(first);
    let change = percent_diff(*first, *last)?;
    Some((rest.iter().all(|p| p <= first), change))
}

/// The trailing `n` points, or all of them when there are fewer
pub fn last_n(points: &[Decimal], n: usize) -> &[Decimal] {
    &points[points.len().saturating_sub(n)..]
}

/// Format with `dp` decimals, rounding half away from zero
pub fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_diff() {
        assert_eq!(percent_diff(dec!(100), dec!(80)), Some(dec!(-20)));
        assert_eq!(percent_diff(dec!(4), dec!(5)), Some(dec!(25)));
        assert_eq!(percent_diff(Decimal::ZERO, dec!(5)), None);
    }

    #[test]
    fn test_upward() {
        assert_eq!(
            upward(&[dec!(2), dec!(2), dec!(3), dec!(4)]),
            Some((true, dec!(100)))
        );
        assert_eq!(
            upward(&[dec!(2), dec!(2), dec!(1), dec!(4)]),
            Some((false, dec!(100)))
        );
        assert_eq!(
            upward(&[dec!(0.1), dec!(0.2), dec!(0.2), dec!(0.3)]),
            Some((true, dec!(200)))
        );
        assert_eq!(
            upward(&[dec!(100), dec!(100), dec!(101), dec!(101)]),
            Some((true, dec!(1)))
        );
        assert_eq!(upward(&[]), None);
    }

    #[test]
    fn test_downward() {
        assert_eq!(
            downward(&[dec!(4), dec!(3), dec!(3), dec!(2)]),
            Some((true, dec!(-50)))
        );
        assert_eq!(
            downward(&[dec!(4), dec!(5), dec!(3), dec!(2)]),
            Some((false, dec!(-50)))
        );
    }

    #[test]
    fn test_last_n() {
        let points = [dec!(1), dec!(2), dec!(3)];
        assert_eq!(last_n(&points, 2), &[dec!(2), dec!(3)]);
        assert_eq!(last_n(&points, 8), &points);
    }

    #[test]
    fn test_fixed_rounds_half_away_from_zero() {
        assert_eq!(fixed(dec!(0.675675), 1), "0.7");
        assert_eq!(fixed(dec!(0.05), 1), "0.1");
        assert_eq!(fixed(dec!(-0.112994), 2), "-0.11");
        assert_eq!(fixed(Decimal::ZERO, 1), "0.0");
        assert_eq!(fixed(dec!(8.8), 2), "8.80");
    }
}
