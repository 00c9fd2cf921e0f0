use crate::models::ProfitModel;
use crate::state::ModelParams;
use rand::{Rng, RngCore};

/// Default trial count per analysis.
pub const DEFAULT_SIMULATIONS: u32 = 10_000;

/// Standard normal variate via Box-Muller.
///
/// u1 is drawn from (0, 1] so ln(u1) stays finite.
#[inline]
pub fn box_muller<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Monte Carlo probability of profit under risk-neutral GBM.
///
/// S_T = S_0 * exp((r - sigma^2/2) * T + sigma * sqrt(T) * Z)
///
/// A trial counts only if intrinsic(S_T) - premium > 0 (strict).
/// The loop allocates nothing.
pub struct MonteCarloPop {
    simulations: u32,
}

impl MonteCarloPop {
    pub fn new(simulations: u32) -> Self {
        Self {
            simulations: simulations.max(1),
        }
    }

    #[inline]
    pub fn simulations(&self) -> u32 {
        self.simulations
    }
}

impl Default for MonteCarloPop {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATIONS)
    }
}

impl ProfitModel for MonteCarloPop {
    #[inline]
    fn name(&self) -> &'static str {
        "Monte-Carlo"
    }

    fn probability(&self, params: &ModelParams, rng: &mut dyn RngCore) -> f64 {
        let mut profitable: u32 = 0;

        for _ in 0..self.simulations {
            let z = box_muller(&mut *rng);
            let terminal = params.spot * (params.drift + params.diffusion * z).exp();
            let pl = params.option_type.intrinsic(terminal, params.strike) - params.premium;
            if pl > 0.0 {
                profitable += 1;
            }
        }

        profitable as f64 / self.simulations as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::ClosedFormPop;
    use crate::state::{AnalysisRequest, OptionType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

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
    fn test_box_muller_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 100_000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let z = box_muller(&mut rng);
            assert!(z.is_finite());
            sum += z;
            sum_sq += z * z;
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64 - mean * mean;
        assert!(mean.abs() < 0.02, "mean={mean}");
        assert!((var - 1.0).abs() < 0.03, "var={var}");
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mc = MonteCarloPop::default();
        let p = params(OptionType::Call, 100.0, 5.0, 100.0, 30, 0.25);
        let a = mc.probability(&p, &mut StdRng::seed_from_u64(42));
        let b = mc.probability(&p, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_matches_closed_form() {
        let mc = MonteCarloPop::default();
        let cf = ClosedFormPop::new();
        let cases = [
            params(OptionType::Call, 100.0, 5.0, 100.0, 30, 0.25),
            params(OptionType::Put, 50.0, 2.0, 50.0, 5, 0.5),
            params(OptionType::Call, 90.0, 12.0, 100.0, 120, 0.35),
            params(OptionType::Put, 110.0, 9.0, 100.0, 60, 0.3),
        ];
        for (i, p) in cases.iter().enumerate() {
            let mut rng = StdRng::seed_from_u64(1000 + i as u64);
            let est = mc.probability(p, &mut rng);
            let exact = cf.probability(p, &mut rng);
            assert!((est - exact).abs() < 0.02, "case {i}: mc={est} closed-form={exact}");
        }
    }

    #[test]
    fn test_zero_expiry_is_deterministic() {
        let mc = MonteCarloPop::new(500);
        let mut rng = StdRng::seed_from_u64(3);
        // ATM call expiring now: intrinsic 0, premium lost on every path
        let atm = params(OptionType::Call, 100.0, 5.0, 100.0, 0, 0.25);
        assert_eq!(mc.probability(&atm, &mut rng), 0.0);
        // Deep ITM put expiring now: profitable on every path
        let itm = params(OptionType::Put, 100.0, 5.0, 80.0, 0, 0.25);
        assert_eq!(mc.probability(&itm, &mut rng), 1.0);
    }

    #[test]
    fn test_zero_simulations_clamped() {
        let mc = MonteCarloPop::new(0);
        assert_eq!(mc.simulations(), 1);
        let p = params(OptionType::Call, 100.0, 5.0, 100.0, 30, 0.25);
        let prob = mc.probability(&p, &mut StdRng::seed_from_u64(9));
        assert!((0.0..=1.0).contains(&prob));
    }
}
