use options_analyzer::state::{AppState, DbCommand};
use options_analyzer::{config, db, server};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("options analyzer starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        risk_free_rate = cfg.risk_free_rate,
        historical_vol = cfg.historical_vol,
        simulations = cfg.simulations,
        cache_results = cfg.cache_results,
        "engine parameters"
    );

    // Init database
    let db_pool = match db::init_db(&cfg.data_dir) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("database init error: {e}");
            std::process::exit(1);
        }
    };

    // Bounded channel to the cache writer
    let (db_tx, db_rx) = mpsc::channel::<DbCommand>(1024);

    let app_state = AppState::new(cfg.clone(), db_pool.clone(), db_tx);

    // DB writer task (dedicated, owns the DB connection for writes)
    tokio::spawn(async move {
        db::run_db_writer(db_pool, db_rx).await;
    });

    let app = server::router(app_state);

    let addr = format!("0.0.0.0:{}", cfg.server_port);
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!("server error: {e}");
    }
}
