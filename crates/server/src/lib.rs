//! webradar feed server library.
//!
//! Serves the browser client and answers its `/ws` snapshot requests from a
//! shared feed, optionally driven by a recorded match.

pub mod config;
pub mod feed;
pub mod socket;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use feed::{FeedError, FeedState, Recording, SharedFeed};
pub use web::{AppState, router};

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Start the replay (if configured) and build the application state.
pub fn start_feed(config: &Config) -> Result<SharedFeed, FeedError> {
    let feed = FeedState::shared(config.feed.freq);

    match &config.feed.recording {
        Some(path) => {
            let recording = Recording::load(path)?;
            info!("Loaded {} snapshots from {}", recording.len(), path.display());
            tokio::spawn(feed::run_replay(
                feed.clone(),
                recording,
                config.feed.freq,
                config.feed.loop_playback,
            ));
        }
        None => warn!("No recording configured, serving an idle feed"),
    }

    Ok(feed)
}

/// Serve on an already bound listener until the server stops.
pub async fn serve(listener: TcpListener, config: &Config, feed: SharedFeed) -> anyhow::Result<()> {
    let state = AppState {
        feed,
        policy: config.compression.policy(),
        high_latency_ms: config.compression.high_latency_ms,
    };
    let app = router(state, &config.server.assets_dir);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

/// Bind the configured address and run the server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    let feed = start_feed(&config)?;

    info!("Server running on http://{}", addr);
    info!("Radar WebSocket endpoint: ws://{}{}", addr, protocol::packets::WS_PATH);

    serve(listener, &config, feed).await
}
