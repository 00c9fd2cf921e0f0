use crate::db;
use crate::engine;
use crate::errors::{EngineError, EngineResult};
use crate::state::{AnalysisRequest, AnalysisResult, AppState, DbCommand, WsMessage};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use portable_atomic::Ordering;
use std::sync::Arc;

#[derive(serde::Deserialize)]
pub struct AnalysesQuery {
    pub limit: Option<usize>,
}

/// POST /api/analyze -- run the analysis engine on one contract
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> EngineResult<Json<AnalysisResult>> {
    let request = match engine::parse_request(&body) {
        Ok(r) => r,
        Err(e) => {
            state.counters.invalid_requests.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "rejected analysis request");
            return Err(e);
        }
    };

    tracing::info!(
        option_type = %request.option_type,
        strike = request.strike,
        premium = request.premium,
        underlying = request.underlying,
        iv = request.iv,
        days = request.expiry_days,
        "analyzing option"
    );

    // Monte Carlo is CPU-bound: keep it off the async workers
    let worker = state.clone();
    let result = tokio::task::spawn_blocking(move || worker.engine.analyze(&request))
        .await
        .map_err(|e| EngineError::Model(format!("analysis task failed: {e}")))?;

    state.counters.analyses_run.fetch_add(1, Ordering::Relaxed);
    if result.is_degenerate() {
        state.counters.degenerate_results.fetch_add(1, Ordering::Relaxed);
    }

    publish(&state, &request, &result).await;

    Ok(Json(result))
}

/// Broadcast the result to WS clients and queue it for the cache (cold path).
/// Failures here are logged, never returned to the caller.
async fn publish(state: &Arc<AppState>, request: &AnalysisRequest, result: &AnalysisResult) {
    let now = chrono::Utc::now();
    let key = db::cache_key(request, now.date_naive());
    let timestamp = now.to_rfc3339();

    state.broadcast(WsMessage::AnalysisCompleted {
        cache_key: key.clone(),
        option_type: request.option_type,
        strike: request.strike,
        probability_of_profit: result.probability_of_profit,
        breakeven: result.breakeven,
        timestamp: timestamp.clone(),
    });

    if !state.config.cache_results {
        return;
    }

    let result_json = match serde_json::to_string(result) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, cache_key = %key, "failed to serialize analysis for cache");
            return;
        }
    };

    let cmd = DbCommand::CacheAnalysis {
        id: uuid::Uuid::new_v4().to_string(),
        cache_key: key.clone(),
        request: *request,
        probability_of_profit: result.probability_of_profit,
        breakeven: result.breakeven,
        result_json,
        created_at: timestamp,
    };

    if state.db_tx.send(cmd).await.is_err() {
        tracing::warn!(cache_key = %key, "db writer closed, analysis not cached");
    } else {
        state.counters.cache_writes.fetch_add(1, Ordering::Relaxed);
    }
}

/// GET /api/health -- liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Analyze service is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /api/analyses -- recent cached analyses from DB (cold path)
pub async fn get_analyses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalysesQuery>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(20).min(200);
    match db::get_recent_analyses(&state.db, limit) {
        Ok(rows) => Json(serde_json::json!({ "analyses": rows })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// GET /api/analyses/{cache_key} -- latest cached result for one contract/day
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(cache_key): Path<String>,
) -> EngineResult<Json<db::AnalysisRow>> {
    db::get_cached_analysis(&state.db, &cache_key)?
        .map(Json)
        .ok_or(EngineError::NotFound(cache_key))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    Json(serde_json::json!({
        "analyses_run": state.counters.analyses_run.load(Relaxed),
        "degenerate_results": state.counters.degenerate_results.load(Relaxed),
        "invalid_requests": state.counters.invalid_requests.load(Relaxed),
        "cache_writes": state.counters.cache_writes.load(Relaxed),
        "ws_messages_sent": state.counters.ws_messages_sent.load(Relaxed),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::server::router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn test_state() -> (Arc<AppState>, mpsc::Receiver<DbCommand>) {
        let config = AppConfig::from_source(|key| match key {
            "MC_SIMULATIONS" => Some("2000".to_string()),
            _ => None,
        })
        .unwrap();
        let db = db::init_memory_db().unwrap();
        let (db_tx, db_rx) = mpsc::channel(16);
        (AppState::new(config, db, db_tx), db_rx)
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_analyze(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_endpoint() {
        let (state, mut db_rx) = test_state();
        let mut ws_rx = state.ws_tx.subscribe();
        let app = router(state.clone());

        let resp = app
            .oneshot(post_analyze(
                r#"{"option_type":"call","strike":100,"premium":5,"underlying":100,"expiry_days":30,"iv":0.25}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["breakeven"], 105.0);
        assert_eq!(json["payoff_curve"].as_array().unwrap().len(), 21);
        assert_eq!(json["bands"]["p80"].as_array().unwrap().len(), 21);
        assert!(json["insight"].as_str().unwrap().contains("$105.00"));
        let pop = json["probability_of_profit"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&pop));

        assert_eq!(state.counters.analyses_run.load(Ordering::Relaxed), 1);
        assert_eq!(state.counters.cache_writes.load(Ordering::Relaxed), 1);

        match db_rx.try_recv().unwrap() {
            DbCommand::CacheAnalysis { cache_key, request, .. } => {
                assert!(cache_key.starts_with("CALL100_"));
                assert_eq!(request.strike, 100.0);
            }
        }

        let WsMessage::AnalysisCompleted { cache_key, breakeven, .. } = ws_rx.try_recv().unwrap();
        assert!(cache_key.starts_with("CALL100_"));
        assert_eq!(breakeven, 105.0);
    }

    #[tokio::test]
    async fn test_malformed_request_is_400() {
        let (state, _db_rx) = test_state();
        let app = router(state.clone());

        let resp = app
            .oneshot(post_analyze(r#"{"option_type":"call","strike":100}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json = body_json(resp).await;
        assert_eq!(json["type"], "InvalidRequest");
        assert!(json["error"].as_str().unwrap().contains("missing field"));
        assert_eq!(state.counters.invalid_requests.load(Ordering::Relaxed), 1);
        assert_eq!(state.counters.analyses_run.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_numeric_edge_cases_still_succeed() {
        let (state, _db_rx) = test_state();
        let app = router(state);

        let resp = app
            .oneshot(post_analyze(
                r#"{"option_type":"put","strike":0,"premium":-3,"underlying":50,"expiry_days":-4,"iv":0}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _db_rx) = test_state();
        let resp = router(state)
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert!(json["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_cached_analysis_lookup() {
        let (state, _db_rx) = test_state();
        let missing = router(state.clone())
            .oneshot(Request::builder().uri("/api/analyses/CALL100_2026-10-19").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(missing).await["type"], "NotFound");

        let list = router(state)
            .oneshot(Request::builder().uri("/api/analyses?limit=5").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(list.status(), StatusCode::OK);
        assert_eq!(body_json(list).await["analyses"].as_array().unwrap().len(), 0);
    }
}
