use crate::config::AppConfig;
use crate::db::DbPool;
use crate::engine::AnalysisEngine;
use crate::models::payoff::CURVE_POINTS;
use portable_atomic::{AtomicU64, Ordering};
use smallvec::SmallVec;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

// ── Contract side ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Per-share value at expiry for an underlying price.
    #[inline]
    pub fn intrinsic(self, price: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (price - strike).max(0.0),
            Self::Put => (strike - price).max(0.0),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

// ── Request / Result (the wire contract) ──

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisRequest {
    pub option_type: OptionType,
    pub strike: f64,
    pub premium: f64,
    pub underlying: f64,
    pub expiry_days: i64,
    pub iv: f64,
    /// Optional IV rank in [0, 1]; takes priority over the historical-vol comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv_percentile: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PayoffPoint {
    pub price: f64,
    pub pl: f64,
}

/// Fixed-size price grid; stays inline, no heap allocation.
pub type PayoffCurve = SmallVec<[PayoffPoint; CURVE_POINTS]>;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Greeks {
    pub delta: f64,
    pub theta: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Bands {
    pub p50: PayoffCurve,
    pub p80: PayoffCurve,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AnalysisResult {
    pub payoff_curve: PayoffCurve,
    pub greeks: Greeks,
    pub probability_of_profit: f64,
    pub insight: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bands: Option<Bands>,
    pub breakeven: f64,
}

impl AnalysisResult {
    /// A probability of exactly 0 or 1 usually means pathological inputs.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.probability_of_profit <= 0.0 || self.probability_of_profit >= 1.0
    }
}

// ── Engine tunables ──

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    pub risk_free_rate: f64,
    /// Baseline for the IV classifier. Zero falls back to absolute IV levels.
    pub historical_vol: f64,
    pub simulations: u32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            historical_vol: 0.20,
            simulations: 10_000,
        }
    }
}

// ── Precomputed model parameters (stack, no alloc) ──

#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ModelParams {
    pub option_type: OptionType,
    pub spot: f64,
    pub strike: f64,
    pub premium: f64,
    pub ttl_years: f64,
    pub sigma: f64,
    pub rate: f64,
    // Precomputed
    pub sqrt_t: f64,
    /// (r - sigma^2/2) * T
    pub drift: f64,
    /// sigma * sqrt(T)
    pub diffusion: f64,
    /// Unrounded underlying price at which P/L is zero
    pub breakeven: f64,
}

impl ModelParams {
    #[inline]
    pub fn new(request: &AnalysisRequest, rate: f64) -> Self {
        let ttl_years = request.expiry_days as f64 / 365.0;
        let sigma = request.iv;
        let sqrt_t = ttl_years.sqrt();
        let breakeven = match request.option_type {
            OptionType::Call => request.strike + request.premium,
            OptionType::Put => request.strike - request.premium,
        };
        Self {
            option_type: request.option_type,
            spot: request.underlying,
            strike: request.strike,
            premium: request.premium,
            ttl_years,
            sigma,
            rate,
            sqrt_t,
            drift: (rate - 0.5 * sigma * sigma) * ttl_years,
            diffusion: sigma * sqrt_t,
            breakeven,
        }
    }
}

// ── Messages OUT to WebSocket clients ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "analysis_completed")]
    AnalysisCompleted {
        cache_key: String,
        option_type: OptionType,
        strike: f64,
        probability_of_profit: f64,
        breakeven: f64,
        timestamp: String,
    },
}

// ── DB Commands (sent to writer task via bounded channel) ──

#[derive(Debug)]
pub enum DbCommand {
    CacheAnalysis {
        id: String,
        cache_key: String,
        request: AnalysisRequest,
        probability_of_profit: f64,
        breakeven: f64,
        result_json: String,
        created_at: String,
    },
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub analyses_run: AtomicU64,
    pub degenerate_results: AtomicU64,
    pub invalid_requests: AtomicU64,
    pub cache_writes: AtomicU64,
    pub ws_messages_sent: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            analyses_run: AtomicU64::new(0),
            degenerate_results: AtomicU64::new(0),
            invalid_requests: AtomicU64::new(0),
            cache_writes: AtomicU64::new(0),
            ws_messages_sent: AtomicU64::new(0),
        }
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

// ── Application shared state (channels, not locks) ──

pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,

    /// Stateless; shared by every request.
    pub engine: AnalysisEngine,

    // Handlers -> WS clients: completed analyses
    pub ws_tx: broadcast::Sender<WsMessage>,

    // Handlers -> DB Writer: bounded command channel
    pub db_tx: mpsc::Sender<DbCommand>,

    // Lock-free performance counters
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, db_tx: mpsc::Sender<DbCommand>) -> Arc<Self> {
        let (ws_tx, _) = broadcast::channel(1024);
        let engine = AnalysisEngine::new(config.engine_params());

        Arc::new(Self {
            config,
            db,
            engine,
            ws_tx,
            db_tx,
            counters: PerfCounters::new(),
        })
    }

    #[inline]
    pub fn broadcast(&self, msg: WsMessage) {
        self.counters.ws_messages_sent.fetch_add(1, Ordering::Relaxed);
        let _ = self.ws_tx.send(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(option_type: OptionType) -> AnalysisRequest {
        AnalysisRequest {
            option_type,
            strike: 100.0,
            premium: 5.0,
            underlying: 100.0,
            expiry_days: 30,
            iv: 0.25,
            iv_percentile: None,
        }
    }

    #[test]
    fn test_intrinsic_value() {
        assert_eq!(OptionType::Call.intrinsic(120.0, 100.0), 20.0);
        assert_eq!(OptionType::Call.intrinsic(80.0, 100.0), 0.0);
        assert_eq!(OptionType::Put.intrinsic(80.0, 100.0), 20.0);
        assert_eq!(OptionType::Put.intrinsic(120.0, 100.0), 0.0);
    }

    #[test]
    fn test_request_wire_format() {
        let json = r#"{"option_type":"put","strike":50,"premium":2,"underlying":50,"expiry_days":5,"iv":0.5}"#;
        let req: AnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.option_type, OptionType::Put);
        assert_eq!(req.expiry_days, 5);
        assert!(req.iv_percentile.is_none());

        let out = serde_json::to_value(request(OptionType::Call)).unwrap();
        assert_eq!(out["option_type"], "call");
        assert!(out.get("iv_percentile").is_none());
    }

    #[test]
    fn test_model_params_precompute() {
        let params = ModelParams::new(&request(OptionType::Call), 0.05);
        assert!((params.ttl_years - 30.0 / 365.0).abs() < 1e-12);
        assert!((params.diffusion - 0.25 * params.sqrt_t).abs() < 1e-12);
        assert!((params.breakeven - 105.0).abs() < 1e-12);

        let put = ModelParams::new(&request(OptionType::Put), 0.05);
        assert!((put.breakeven - 95.0).abs() < 1e-12);
    }
}
