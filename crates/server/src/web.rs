//! HTTP surface: embedded web client, map assets and the radar socket.

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use protocol::packets::{CompressionPolicy, WS_PATH};
use rust_embed::RustEmbed;
use std::net::SocketAddr;
use std::path::Path;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{debug, warn};

use crate::feed::SharedFeed;
use crate::socket;

// Embedded static assets from client/web (index.html, main.js, pkg/ from wasm-pack)
#[derive(RustEmbed)]
#[folder = "../client/web"]
struct WebClient;

#[derive(Clone)]
pub struct AppState {
    pub feed: SharedFeed,
    pub policy: CompressionPolicy,
    pub high_latency_ms: u32,
}

/// Build the router; map assets are served from `assets_dir` under `/assets`.
pub fn router(state: AppState, assets_dir: &Path) -> Router {
    Router::new()
        // Radar snapshot endpoint
        .route(WS_PATH, get(websocket_handler))
        // Map definitions and radar images
        .nest_service("/assets", ServeDir::new(assets_dir))
        // Embedded client (index.html, JS, WASM)
        .fallback(static_handler)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    debug!("WebSocket upgrade from {}", addr);
    ws.on_upgrade(move |socket| {
        socket::handle_socket(socket, addr, state.feed, state.policy, state.high_latency_ms)
    })
}

async fn static_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    serve_embedded(if path.is_empty() { "index.html" } else { path })
}

/// Serve a static file from the embedded web client
fn serve_embedded(path: &str) -> Response {
    match WebClient::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref().to_string())], content.data.into_owned()).into_response()
        }
        None => {
            warn!("Static file not found: {}", path);
            (StatusCode::NOT_FOUND, "404 Not Found").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_embedded() {
        let response = serve_embedded("index.html");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html"
        );
    }

    #[test]
    fn test_missing_file_is_404() {
        assert_eq!(serve_embedded("nope.txt").status(), StatusCode::NOT_FOUND);
    }
}
