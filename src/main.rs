//! Entry point: logging, database, settings, HTTP server.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pos_self_order_gateway::server::{self, AppState};
use pos_self_order_gateway::{db, ReferenceResolver};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = PathBuf::from(env_or("POS_SELF_ORDER_DATA_DIR", "./data"));
    let bind = env_or("POS_SELF_ORDER_BIND", "127.0.0.1:8943");

    // Initialize structured logging (console + rolling file)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pos_self_order_gateway=debug"));

    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "self-order-gateway");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the lifetime of the process — dropping it
    // flushes logs. Leaked intentionally since we run until process exit.
    std::mem::forget(_guard);

    info!(
        "Starting pos-self-order-gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_state = db::init(&data_dir)
        .map_err(anyhow::Error::msg)
        .context("database initialization failed")?;

    let resolver = {
        let conn = db_state
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("store unavailable: {e}"))?;
        ReferenceResolver::from_settings(&conn)
    };

    let state = AppState {
        db: db_state,
        resolver,
    };

    server::run(state, &bind)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
