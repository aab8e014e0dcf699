//! webradar feed server.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    info!("webradar v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Assets: {}", config.server.assets_dir.display());
    match &config.feed.recording {
        Some(path) => info!("  Recording: {} @ {} Hz", path.display(), config.feed.freq),
        None => info!("  Recording: none"),
    }

    server::run(config).await
}
