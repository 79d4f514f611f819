use anyhow::{Context, Result};
use cpbl_schedule::config::{init_logging, Settings};
use cpbl_schedule::{build_app, web};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    init_logging(&settings);

    info!(
        url = %settings.cpbl_url,
        captured_pages = ?settings.captured_pages_dir,
        "Fetching today's schedule"
    );

    let (state, refresher) = build_app(&settings)?;

    // The first fetch completes before the server binds; a failure leaves an
    // empty schedule and the refresher retries in the background
    let first = refresher.refresh().await;
    match &first {
        Ok(games) => info!(games, "Schedule loaded"),
        Err(_) => warn!("Server will start with an empty schedule"),
    }
    tokio::spawn(refresher.run(first.is_ok()));

    let app = web::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
