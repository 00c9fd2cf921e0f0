//! Heuristic Greeks. Not derivatives of a pricing model: bounded
//! approximations good enough for a fantasy-trading dashboard.
//!
//! delta (call) = 0.6 + (m - 1) * 0.3   if m > 1
//!              = 0.2 + m * 0.4         otherwise
//! delta (put)  = -0.6 - (1 - m) * 0.3  if m < 1
//!              = -0.2 - (1 - m) * 0.4  otherwise
//! theta        = -premium / max(2 * days, 1)
//!
//! with m = underlying / strike.

use crate::models::round_half_up;
use crate::state::{Greeks, OptionType};

const DELTA_FLOOR: f64 = 0.01;
const DELTA_CAP: f64 = 0.99;

#[inline]
pub fn delta(option_type: OptionType, underlying: f64, strike: f64) -> f64 {
    let m = underlying / strike;
    match option_type {
        OptionType::Call => {
            let raw = if m > 1.0 { 0.6 + (m - 1.0) * 0.3 } else { 0.2 + m * 0.4 };
            raw.clamp(DELTA_FLOOR, DELTA_CAP)
        }
        OptionType::Put => {
            let raw = if m < 1.0 { -0.6 - (1.0 - m) * 0.3 } else { -0.2 - (1.0 - m) * 0.4 };
            raw.clamp(-DELTA_CAP, -DELTA_FLOOR)
        }
    }
}

/// Dollars of premium lost per calendar day.
#[inline]
pub fn theta_per_day(premium: f64, expiry_days: i64) -> f64 {
    let divisor = (expiry_days as f64 * 2.0).max(1.0);
    -premium / divisor
}

/// Rounded Greeks as reported to callers (delta 3dp, theta 2dp).
pub fn compute_greeks(
    option_type: OptionType,
    underlying: f64,
    strike: f64,
    premium: f64,
    expiry_days: i64,
) -> Greeks {
    Greeks {
        delta: round_half_up(delta(option_type, underlying, strike), 3),
        theta: round_half_up(theta_per_day(premium, expiry_days), 2),
    }
}
