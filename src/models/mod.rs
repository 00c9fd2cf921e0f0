pub mod bands;
pub mod black_scholes;
pub mod greeks;
pub mod monte_carlo;
pub mod payoff;

use crate::state::ModelParams;
use rand::RngCore;

/// Shares per contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Estimators of P(terminal P/L > 0) for a long option position.
/// Send + Sync required so one engine can serve concurrent requests.
pub trait ProfitModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns a probability in [0, 1]. Never panics.
    /// Closed-form models ignore `rng`.
    fn probability(&self, params: &ModelParams, rng: &mut dyn RngCore) -> f64;
}

/// Round half-up (toward +inf) to `decimals` places.
/// Matches the rounding the front-end applies, so re-serialized results stay stable.
#[inline]
pub fn round_half_up(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor + 0.5).floor() / factor
}
