// WebSocket transport; the retry / pacing policy lives in `session`
pub mod session;

use protocol::packets::{ClientCommand, WS_PATH};
use wasm_bindgen::prelude::*;
use web_sys::{BinaryType, WebSocket};

/// `ws://host/ws`, or `wss://host/ws` when the page itself is served over https.
pub fn endpoint_url(page_protocol: &str, host: &str) -> String {
    let scheme = if page_protocol == "https:" { "wss" } else { "ws" };
    format!("{scheme}://{host}{WS_PATH}")
}

/// Endpoint derived from the page location.
pub fn page_endpoint() -> Result<String, JsValue> {
    let location = web_sys::window().ok_or("No window")?.location();
    Ok(endpoint_url(&location.protocol()?, &location.host()?))
}

pub struct Connection {
    ws: WebSocket,
    url: String,
}

impl Connection {
    pub fn open(url: &str) -> Result<Self, JsValue> {
        log::info!("Connecting to {url}");
        let ws = WebSocket::new(url)?;
        ws.set_binary_type(BinaryType::Arraybuffer);
        Ok(Self {
            ws,
            url: url.to_string(),
        })
    }

    pub fn websocket(&self) -> &WebSocket {
        &self.ws
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn send(&self, command: ClientCommand) -> Result<(), JsValue> {
        // OPEN state = 1
        if self.ws.ready_state() != WebSocket::OPEN {
            return Err(JsValue::from_str("WebSocket not ready"));
        }
        log::debug!("-> {command}");
        self.ws.send_with_str(&command.to_string())
    }

    /// Close the socket. Its `onclose` still fires and reaches the session.
    pub fn close(&self) {
        if let Err(e) = self.ws.close() {
            log::warn!("Closing {} failed: {e:?}", self.url);
        }
    }

    /// Drop all handlers of a socket being replaced.
    pub fn detach(&self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
    }
}
