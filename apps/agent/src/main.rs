//! RLGrab agent entry point.

mod app;
mod config;
mod console;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the console output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting RLGrab agent");

    let config = config::Config::load()?;
    tracing::info!(
        strategy = %config.strategy,
        poll_interval_ms = config.poll_interval_ms,
        keep_duplicates = config.keep_duplicates,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("agent shut down cleanly");
    Ok(())
}
