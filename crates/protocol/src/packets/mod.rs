//! Messages exchanged over the radar socket.
//!
//! The client speaks plain text commands; the server answers with text
//! (`pong`, `error`, control JSON) or with binary snapshot frames.

pub mod client;
pub mod server;

pub use client::*;
pub use server::*;

/// Path of the WebSocket endpoint on the radar host.
pub const WS_PATH: &str = "/ws";
