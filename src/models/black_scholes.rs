use crate::models::ProfitModel;
use crate::state::{ModelParams, OptionType};
use rand::RngCore;
use statrs::distribution::{ContinuousCDF, Normal};

/// Closed-form probability of profit under the same GBM the Monte Carlo samples.
///
/// Profit means finishing past the breakeven B:
///   call: P(S_T > B) = Phi(d2)
///   put:  P(S_T < B) = Phi(-d2)
///
/// where d2 = (ln(S/B) + (r - sigma^2/2)*T) / (sigma * sqrt(T)).
///
/// Used as a diagnostic reference for the Monte Carlo estimate.
pub struct ClosedFormPop {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl ClosedFormPop {
    pub fn new() -> Self {
        let normal = Normal::new(0.0, 1.0).unwrap_or(Normal::standard());
        Self { normal }
    }
}

impl Default for ClosedFormPop {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfitModel for ClosedFormPop {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    fn probability(&self, params: &ModelParams, _rng: &mut dyn RngCore) -> f64 {
        let barrier = params.breakeven;

        // A put can never finish below a non-positive breakeven
        if barrier <= 0.0 {
            return match params.option_type {
                OptionType::Call => 1.0,
                OptionType::Put => 0.0,
            };
        }

        // No diffusion: the terminal price is the drifted spot
        if params.diffusion < 1e-12 {
            let terminal = params.spot * params.drift.exp();
            let wins = match params.option_type {
                OptionType::Call => terminal > barrier,
                OptionType::Put => terminal < barrier,
            };
            return if wins { 1.0 } else { 0.0 };
        }

        let d2 = ((params.spot / barrier).ln() + params.drift) / params.diffusion;

        let p = match params.option_type {
            OptionType::Call => self.normal.cdf(d2),
            OptionType::Put => 1.0 - self.normal.cdf(d2),
        };

        p.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AnalysisRequest;
    use rand::rngs::mock::StepRng;

    fn params(option_type: OptionType, strike: f64, premium: f64, spot: f64, days: i64, iv: f64) -> ModelParams {
        let req = AnalysisRequest {
            option_type,
            strike,
            premium,
            underlying: spot,
            expiry_days: days,
            iv,
            iv_percentile: None,
        };
        ModelParams::new(&req, 0.05)
    }

    #[test]
    fn test_atm_call_below_half() {
        // Must clear strike + premium, so odds are worse than a coin flip
        let model = ClosedFormPop::new();
        let p = model.probability(
            &params(OptionType::Call, 100.0, 5.0, 100.0, 30, 0.25),
            &mut StepRng::new(0, 1),
        );
        assert!(p > 0.15 && p < 0.4, "ATM call pop={p}");
    }

    #[test]
    fn test_deep_itm_call() {
        let model = ClosedFormPop::new();
        let p = model.probability(
            &params(OptionType::Call, 80.0, 2.0, 100.0, 30, 0.25),
            &mut StepRng::new(0, 1),
        );
        assert!(p > 0.9, "deep ITM call pop={p}");
    }

    #[test]
    fn test_call_and_put_sum_below_one() {
        // Profit regions (S_T > K + c) and (S_T < K - p) are disjoint
        let model = ClosedFormPop::new();
        let mut rng = StepRng::new(0, 1);
        let call = model.probability(&params(OptionType::Call, 100.0, 3.0, 100.0, 45, 0.3), &mut rng);
        let put = model.probability(&params(OptionType::Put, 100.0, 3.0, 100.0, 45, 0.3), &mut rng);
        assert!(call + put < 1.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let model = ClosedFormPop::new();
        let mut rng = StepRng::new(0, 1);
        // Premium above strike: put breakeven below zero
        assert_eq!(model.probability(&params(OptionType::Put, 5.0, 6.0, 5.0, 30, 0.4), &mut rng), 0.0);
        // Zero vol
        assert_eq!(model.probability(&params(OptionType::Call, 100.0, 1.0, 120.0, 30, 0.0), &mut rng), 1.0);
        assert_eq!(model.probability(&params(OptionType::Call, 100.0, 1.0, 90.0, 30, 0.0), &mut rng), 0.0);
    }
}
