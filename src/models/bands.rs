use crate::models::round_half_up;
use crate::state::{Bands, PayoffCurve, PayoffPoint};

const P50_SPREAD_FACTOR: f64 = 0.3;
const P80_SPREAD_FACTOR: f64 = 0.6;

/// Dollar spreads (p50, p80) subtracted from the curve at `price`.
///
/// vol_adj = iv * sqrt(T) * 100
/// spread  = vol_adj * factor * (1 + |price - S| / S)
#[inline]
pub fn band_spreads(price: f64, underlying: f64, iv: f64, ttl_years: f64) -> (f64, f64) {
    let distance = (price - underlying).abs() / underlying;
    let vol_adj = iv * ttl_years.sqrt() * 100.0;
    let widen = 1.0 + distance;
    (
        vol_adj * P50_SPREAD_FACTOR * widen,
        vol_adj * P80_SPREAD_FACTOR * widen,
    )
}

/// Confidence envelopes under the payoff curve.
///
/// Both bands sit below the curve; there is no upper envelope.
pub fn build_bands(curve: &PayoffCurve, underlying: f64, iv: f64, ttl_years: f64) -> Bands {
    let mut p50 = PayoffCurve::new();
    let mut p80 = PayoffCurve::new();

    for point in curve {
        let (s50, s80) = band_spreads(point.price, underlying, iv, ttl_years);
        let price = round_half_up(point.price, 2);
        p50.push(PayoffPoint {
            price,
            pl: round_half_up(point.pl - s50, 0),
        });
        p80.push(PayoffPoint {
            price,
            pl: round_half_up(point.pl - s80, 0),
        });
    }

    Bands { p50, p80 }
}
