pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod insight;
pub mod models;
pub mod server;
pub mod state;

pub use engine::{analyze, AnalysisEngine};
pub use errors::{EngineError, EngineResult};
pub use state::{AnalysisRequest, AnalysisResult, Bands, EngineParams, Greeks, OptionType, PayoffPoint};
