//! # clearance-api: Binary Entry Point
//!
//! Starts the Axum HTTP server and the timeout sweeper. Binds to `PORT`
//! (default 8080).

use std::sync::Arc;
use std::time::Duration;

use clearance_api::state::{AppConfig, AppState};
use clearance_core::SystemClock;
use clearance_state::EngineConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(?config, "configuration loaded");

    let engine_config = EngineConfig::from_env().map_err(|e| {
        tracing::error!("engine configuration invalid: {e}");
        e
    })?;

    // Optional: absent DATABASE_URL means in-memory only.
    let db_pool = clearance_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("database initialization failed: {e}");
            e
        })?;

    let port = config.port;
    let sweep_every = config.sweep_interval_secs;
    let state = AppState::from_config(config, engine_config, Arc::new(SystemClock), db_pool)
        .map_err(|e| {
            tracing::error!("state initialization failed: {e}");
            e
        })?;

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("database hydration failed: {e}");
        e
    })?;

    if sweep_every > 0 {
        tokio::spawn(sweep_timeouts(state.clone(), Duration::from_secs(sweep_every)));
    } else {
        tracing::warn!("timeout sweeper disabled; overdue shipments abort only on access");
    }

    let app = clearance_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("clearance API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Abort shipments whose payment window closed, forever, every `period`.
async fn sweep_timeouts(state: AppState, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let aborted = state.engine.enforce_all_timeouts();
        state.persist_all(&aborted).await;
    }
}
