pub mod classify;
pub mod text;

use crate::state::OptionType;

/// Everything the classifiers and the sentence templates read.
/// Built by the engine from the normalized request and computed numbers.
#[derive(Debug, Clone, Copy)]
pub struct InsightContext {
    pub option_type: OptionType,
    pub strike: f64,
    pub underlying: f64,
    pub premium: f64,
    pub expiry_days: i64,
    pub iv: f64,
    pub historical_vol: Option<f64>,
    pub iv_percentile: Option<f64>,
    /// Unrounded daily theta
    pub theta: f64,
    pub probability_of_profit: f64,
    pub breakeven: f64,
}
