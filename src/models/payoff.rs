use crate::models::{round_half_up, CONTRACT_MULTIPLIER};
use crate::state::{OptionType, PayoffCurve, PayoffPoint};

/// Grid intervals across the price range. The curve has one more point than this.
pub const PAYOFF_STEPS: usize = 20;
pub const CURVE_POINTS: usize = PAYOFF_STEPS + 1;

/// Half-width of the grid as a fraction of strike.
pub const PRICE_RANGE_PCT: f64 = 0.4;

/// P/L at expiry per contract over [strike * 0.6, strike * 1.4].
///
/// Deterministic: identical inputs give bit-identical output.
pub fn build_payoff_curve(option_type: OptionType, strike: f64, premium: f64) -> PayoffCurve {
    let range = strike * PRICE_RANGE_PCT;
    let min_price = strike - range;
    let max_price = strike + range;
    let step = (max_price - min_price) / PAYOFF_STEPS as f64;

    (0..CURVE_POINTS)
        .map(|i| {
            let price = min_price + i as f64 * step;
            let pl = (option_type.intrinsic(price, strike) - premium) * CONTRACT_MULTIPLIER;
            PayoffPoint {
                price: round_half_up(price, 2),
                pl: round_half_up(pl, 2),
            }
        })
        .collect()
}

/// Underlying price at expiry where P/L is zero (per-share terms).
#[inline]
pub fn breakeven(option_type: OptionType, strike: f64, premium: f64) -> f64 {
    let raw = match option_type {
        OptionType::Call => strike + premium,
        OptionType::Put => strike - premium,
    };
    round_half_up(raw, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_curve_shape() {
        let curve = build_payoff_curve(OptionType::Call, 100.0, 5.0);
        assert_eq!(curve.len(), CURVE_POINTS);
        assert_eq!(curve[0].price, 60.0);
        assert_eq!(curve[CURVE_POINTS - 1].price, 140.0);
        for w in curve.windows(2) {
            assert!(w[1].price > w[0].price, "prices must ascend: {:?}", w);
        }

        let at_strike = curve.iter().find(|p| p.price == 100.0).unwrap();
        assert_eq!(at_strike.pl, -500.0);
        assert_eq!(curve[CURVE_POINTS - 1].pl, 3500.0);
        // Max loss below strike is the premium
        assert_eq!(curve[0].pl, -500.0);
    }

    #[test]
    fn test_put_curve_mirrors_call() {
        let curve = build_payoff_curve(OptionType::Put, 50.0, 2.0);
        assert_eq!(curve[0].price, 30.0);
        assert_eq!(curve[0].pl, (20.0 - 2.0) * 100.0);
        assert_eq!(curve[CURVE_POINTS - 1].price, 70.0);
        assert_eq!(curve[CURVE_POINTS - 1].pl, -200.0);
        // Put P/L never rises with price
        for w in curve.windows(2) {
            assert!(w[1].pl <= w[0].pl);
        }
    }

    #[test]
    fn test_range_is_forty_percent_of_strike() {
        for &strike in &[12.5, 50.0, 237.0, 4150.0] {
            let curve = build_payoff_curve(OptionType::Call, strike, 1.0);
            assert!((curve[0].price - round_half_up(strike * 0.6, 2)).abs() < 1e-9);
            assert!((curve[CURVE_POINTS - 1].price - round_half_up(strike * 1.4, 2)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_idempotent() {
        let a = build_payoff_curve(OptionType::Put, 187.3, 4.17);
        let b = build_payoff_curve(OptionType::Put, 187.3, 4.17);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_breakeven() {
        assert_eq!(breakeven(OptionType::Call, 100.0, 5.0), 105.0);
        assert_eq!(breakeven(OptionType::Put, 50.0, 2.0), 48.0);
        assert_eq!(breakeven(OptionType::Call, 101.5, 2.333), 103.83);
    }
}
