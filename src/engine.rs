use crate::errors::{EngineError, EngineResult};
use crate::insight::classify::classify;
use crate::insight::text::generate_insight;
use crate::insight::InsightContext;
use crate::models::bands::build_bands;
use crate::models::black_scholes::ClosedFormPop;
use crate::models::greeks::{compute_greeks, theta_per_day};
use crate::models::monte_carlo::MonteCarloPop;
use crate::models::payoff::{breakeven, build_payoff_curve};
use crate::models::{round_half_up, ProfitModel};
use crate::state::{AnalysisRequest, AnalysisResult, EngineParams, ModelParams};
use rand::RngCore;

/// Floor applied to strike and underlying so ratios stay finite.
pub const MIN_PRICE: f64 = 0.01;

/// Monte Carlo vs closed-form gap above which the run is logged.
const REFERENCE_TOLERANCE: f64 = 0.05;

/// Option analysis engine. Holds only immutable tunables; every call owns
/// its RNG and buffers, so one instance serves any number of threads.
pub struct AnalysisEngine {
    params: EngineParams,
    monte_carlo: MonteCarloPop,
    reference: ClosedFormPop,
}

impl AnalysisEngine {
    pub fn new(params: EngineParams) -> Self {
        Self {
            params,
            monte_carlo: MonteCarloPop::new(params.simulations),
            reference: ClosedFormPop::new(),
        }
    }

    #[inline]
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Analyze with the thread-local random source.
    pub fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let mut rng = rand::thread_rng();
        self.analyze_with_rng(request, &mut rng)
    }

    /// Analyze with an injected random source. A seeded RNG makes the result reproducible.
    ///
    /// Never fails: numeric edge cases are normalized first.
    pub fn analyze_with_rng(&self, request: &AnalysisRequest, rng: &mut dyn RngCore) -> AnalysisResult {
        let req = normalize(request);
        if req != *request {
            tracing::debug!(?request, normalized = ?req, "request normalized");
        }

        // 1. Payoff curve + breakeven (deterministic)
        let payoff_curve = build_payoff_curve(req.option_type, req.strike, req.premium);
        let breakeven = breakeven(req.option_type, req.strike, req.premium);

        // 2. Greeks
        let greeks = compute_greeks(
            req.option_type,
            req.underlying,
            req.strike,
            req.premium,
            req.expiry_days,
        );

        // 3. Probability of profit
        let model_params = ModelParams::new(&req, self.params.risk_free_rate);
        let raw_pop = self.monte_carlo.probability(&model_params, &mut *rng);
        let probability_of_profit = round_half_up(raw_pop, 3);

        if probability_of_profit <= 0.0 || probability_of_profit >= 1.0 {
            tracing::warn!(
                pop = probability_of_profit,
                option_type = %req.option_type,
                spot = req.underlying,
                strike = req.strike,
                premium = req.premium,
                iv = req.iv,
                ttl_years = model_params.ttl_years,
                rate = model_params.rate,
                "degenerate probability of profit, check input parameters"
            );
        }

        let reference = self.reference.probability(&model_params, &mut *rng);
        if (raw_pop - reference).abs() > REFERENCE_TOLERANCE {
            tracing::debug!(
                model = self.monte_carlo.name(),
                estimate = raw_pop,
                reference_model = self.reference.name(),
                reference,
                simulations = self.monte_carlo.simulations(),
                "monte carlo diverges from closed form"
            );
        }

        // 4. Bands
        let bands = build_bands(&payoff_curve, req.underlying, req.iv, model_params.ttl_years);

        // 5. Insight
        let ctx = InsightContext {
            option_type: req.option_type,
            strike: req.strike,
            underlying: req.underlying,
            premium: req.premium,
            expiry_days: req.expiry_days,
            iv: req.iv,
            historical_vol: Some(self.params.historical_vol).filter(|hv| *hv > 0.0),
            iv_percentile: req.iv_percentile,
            theta: theta_per_day(req.premium, req.expiry_days),
            probability_of_profit,
            breakeven,
        };
        let classes = classify(&ctx);
        tracing::debug!(
            time = %classes.time,
            time_risk = classes.time.risk(),
            moneyness = %classes.moneyness.bucket,
            gamma_risk = classes.moneyness.bucket.gamma_risk(),
            iv = %classes.iv.level,
            iv_score = classes.iv.level.score(),
            decay = %classes.theta.level,
            decay_score = classes.theta.level.score(),
            liquidity = %classes.liquidity.tag,
            liquidity_score = classes.liquidity.score,
            "classified contract"
        );
        let insight = generate_insight(&ctx, &classes);

        AnalysisResult {
            payoff_curve,
            greeks,
            probability_of_profit,
            insight,
            bands: Some(bands),
            breakeven,
        }
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new(EngineParams::default())
    }
}

/// One-shot analysis with default parameters.
pub fn analyze(request: &AnalysisRequest) -> AnalysisResult {
    AnalysisEngine::default().analyze(request)
}

/// Parse a JSON request body. Structural problems are the only failure mode.
pub fn parse_request(body: &[u8]) -> EngineResult<AnalysisRequest> {
    serde_json::from_slice(body).map_err(|e| EngineError::InvalidRequest(e.to_string()))
}

/// Clamp numeric fields into the range the models handle.
///
/// Non-finite values become 0 before the floors apply.
pub fn normalize(request: &AnalysisRequest) -> AnalysisRequest {
    #[inline]
    fn finite_or_zero(x: f64) -> f64 {
        if x.is_finite() { x } else { 0.0 }
    }

    AnalysisRequest {
        option_type: request.option_type,
        strike: finite_or_zero(request.strike).max(MIN_PRICE),
        premium: finite_or_zero(request.premium).max(0.0),
        underlying: finite_or_zero(request.underlying).max(MIN_PRICE),
        expiry_days: request.expiry_days.max(0),
        iv: finite_or_zero(request.iv).max(0.0),
        iv_percentile: request
            .iv_percentile
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 1.0)),
    }
}
