use crate::errors::{EngineError, EngineResult};
use crate::state::EngineParams;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub risk_free_rate: f64,
    pub historical_vol: f64,
    pub simulations: u32,
    pub cache_results: bool,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (env in production, a map in tests).
    pub fn from_source<F>(get: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let server_port = var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        let risk_free_rate = var_or("RISK_FREE_RATE", "0.05")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("RISK_FREE_RATE: {e}")))?;

        let historical_vol = var_or("HISTORICAL_VOL", "0.20")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("HISTORICAL_VOL: {e}")))?;

        let simulations = var_or("MC_SIMULATIONS", "10000")
            .parse::<u32>()
            .map_err(|e| EngineError::Config(format!("MC_SIMULATIONS: {e}")))?;

        let cache_results = var_or("CACHE_RESULTS", "true")
            .parse::<bool>()
            .map_err(|e| EngineError::Config(format!("CACHE_RESULTS: {e}")))?;

        if !risk_free_rate.is_finite() {
            return Err(EngineError::Config("RISK_FREE_RATE must be finite".into()));
        }
        if !historical_vol.is_finite() || historical_vol < 0.0 {
            return Err(EngineError::Config("HISTORICAL_VOL must be >= 0".into()));
        }
        if simulations == 0 {
            return Err(EngineError::Config("MC_SIMULATIONS must be > 0".into()));
        }

        Ok(Self {
            server_port,
            data_dir: PathBuf::from(var_or("DATA_DIR", "data")),
            static_dir: PathBuf::from(var_or("STATIC_DIR", "frontend/dist")),
            risk_free_rate,
            historical_vol,
            simulations,
            cache_results,
        })
    }

    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            risk_free_rate: self.risk_free_rate,
            historical_vol: self.historical_vol,
            simulations: self.simulations,
        }
    }
}
