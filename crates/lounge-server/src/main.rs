use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use lounge_api::AppStateInner;
use lounge_db::Database;
use lounge_server::{Config, build_router, retention};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lounge=debug,lounge_server=debug,lounge_api=debug,lounge_gateway=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    if config.admin.is_none() {
        warn!("LOUNGE_ADMIN_USERNAME / _PASSWORD / _PHASEKEY not all set; admin login is disabled");
    }

    let db = Arc::new(Database::open(&config.db_path)?);
    let state = AppStateInner::build(db, config.app_options());

    let sweeper = tokio::spawn(retention::run_retention_loop(
        state.messages.clone(),
        config.retention,
        config.sweep_interval,
    ));

    let static_dir = config.static_dir.is_dir().then_some(config.static_dir.as_path());
    match static_dir {
        Some(dir) => info!("Serving static files from {}", dir.display()),
        None => warn!("Static directory {} not found; serving API only", config.static_dir.display()),
    }

    let app = build_router(state, static_dir);

    let addr = config.bind_addr()?;
    info!("Lounge listening on {}", addr);
    info!(
        "Retention: {} hours, sweep every {}s",
        config.retention.num_hours(),
        config.sweep_interval.as_secs()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            },
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
