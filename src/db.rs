use crate::errors::{EngineError, EngineResult};
use crate::state::{AnalysisRequest, DbCommand};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = include_str!("../migrations/001_init.sql");

pub fn init_db(data_dir: &Path) -> EngineResult<DbPool> {
    std::fs::create_dir_all(data_dir).map_err(|e| EngineError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("options_analyzer.db");
    let conn = Connection::open(&db_path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA cache_size=-64000;")?;
    conn.execute_batch(SCHEMA)?;

    tracing::info!("database initialized at {}", db_path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

/// Throwaway database for tests.
pub fn init_memory_db() -> EngineResult<DbPool> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Cache key for a contract on a given day, e.g. `CALL100_2026-10-19`.
pub fn cache_key(request: &AnalysisRequest, date: NaiveDate) -> String {
    format!(
        "{}{}_{}",
        request.option_type.to_string().to_uppercase(),
        request.strike,
        date.format("%Y-%m-%d")
    )
}

/// Dedicated DB writer task. Reads commands from bounded channel, executes SQL.
/// Request handlers never wait on a write.
pub async fn run_db_writer(db: DbPool, mut rx: mpsc::Receiver<DbCommand>) {
    tracing::info!("db writer task started");

    while let Some(cmd) = rx.recv().await {
        if let Err(e) = execute_command(&db, cmd) {
            tracing::error!("db write error: {e}");
        }
    }

    tracing::info!("db writer task shutting down");
}

fn execute_command(db: &DbPool, cmd: DbCommand) -> EngineResult<()> {
    let conn = db.lock().map_err(|e| EngineError::Database(format!("lock poisoned: {e}")))?;

    match cmd {
        DbCommand::CacheAnalysis {
            id, cache_key, request, probability_of_profit, breakeven, result_json, created_at,
        } => {
            conn.execute(
                "INSERT OR REPLACE INTO analyses (cache_key, id, option_type, strike, premium, underlying, expiry_days, iv, probability_of_profit, breakeven, result_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    cache_key,
                    id,
                    request.option_type.to_string(),
                    request.strike,
                    request.premium,
                    request.underlying,
                    request.expiry_days,
                    request.iv,
                    probability_of_profit,
                    breakeven,
                    result_json,
                    created_at,
                ],
            )?;
            tracing::debug!(cache_key = %cache_key, "analysis cached");
        }
    }
    Ok(())
}

// ── Query helpers (for server REST reads -- these DO lock, but only from cold path) ──

const ANALYSIS_COLUMNS: &str = "id, cache_key, option_type, strike, premium, underlying, expiry_days, iv, probability_of_profit, breakeven, result_json, created_at";

fn map_analysis_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnalysisRow> {
    let result_json: String = row.get(10)?;
    Ok(AnalysisRow {
        id: row.get(0)?,
        cache_key: row.get(1)?,
        option_type: row.get(2)?,
        strike: row.get(3)?,
        premium: row.get(4)?,
        underlying: row.get(5)?,
        expiry_days: row.get(6)?,
        iv: row.get(7)?,
        probability_of_profit: row.get(8)?,
        breakeven: row.get(9)?,
        result: serde_json::from_str(&result_json).unwrap_or(serde_json::Value::Null),
        created_at: row.get(11)?,
    })
}

pub fn get_recent_analyses(db: &DbPool, limit: usize) -> EngineResult<Vec<AnalysisRow>> {
    let conn = db.lock().map_err(|e| EngineError::Database(format!("lock: {e}")))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analyses ORDER BY created_at DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(rusqlite::params![limit as i64], map_analysis_row)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_cached_analysis(db: &DbPool, cache_key: &str) -> EngineResult<Option<AnalysisRow>> {
    let conn = db.lock().map_err(|e| EngineError::Database(format!("lock: {e}")))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE cache_key = ?1"
    ))?;
    let mut rows = stmt.query_map(rusqlite::params![cache_key], map_analysis_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

// ── Row types ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisRow {
    pub id: String,
    pub cache_key: String,
    pub option_type: String,
    pub strike: f64,
    pub premium: f64,
    pub underlying: f64,
    pub expiry_days: i64,
    pub iv: f64,
    pub probability_of_profit: f64,
    pub breakeven: f64,
    /// The full cached `AnalysisResult`
    pub result: serde_json::Value,
    pub created_at: String,
}
