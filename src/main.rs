use anyhow::{Context, Result};
use reelcrawl::{Ctx, logging, routes, settings::Settings};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    let _guard = logging::init(&settings.log).context("Failed to initialize logging")?;

    let addr = settings.server_addr();
    info!(
        "Engines: default {}, {} concurrent detail fetches, depth limit {}",
        settings.engine.default_engine,
        settings.engine.max_concurrent_requests,
        settings.engine.max_detail_depth
    );

    let ctx = Ctx::from_settings(settings).context("Failed to build application state")?;
    let pending = ctx.downloads.resume_list().pending().len();
    if pending > 0 {
        info!("{} unfinished downloads in resume list", pending);
    }

    let app = routes::router(ctx);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
