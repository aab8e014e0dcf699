//! `/ws` sessions: one task per radar client answering its text commands.

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use protocol::packets::{self, ClientCommand, CompressionPolicy, ControlMessage};
use std::net::SocketAddr;
use tracing::{debug, error, info, warn};

use crate::feed::SharedFeed;

/// Reply to anything that is not a known command.
pub const ERROR_REPLY: &str = "error";
pub const PONG_REPLY: &str = "pong";
/// Frame skipping only kicks in for snapshots with more entities than this.
pub const SKIP_MIN_ENTITIES: usize = 5;

/// Per-connection latency bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ClientSession {
    ping_ms: u32,
    high_latency_ms: u32,
    requests: u64,
    skip_frames: bool,
}

/// What a command asks the socket to send back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Binary(Bytes),
    Text(String),
    /// Skipped request; the client's own timeout covers it.
    Nothing,
}

impl ClientSession {
    pub fn new(high_latency_ms: u32) -> Self {
        Self {
            high_latency_ms,
            ..Self::default()
        }
    }

    pub fn ping_ms(&self) -> u32 {
        self.ping_ms
    }

    pub fn is_high_latency(&self) -> bool {
        self.ping_ms > self.high_latency_ms
    }

    pub fn is_skipping(&self) -> bool {
        self.skip_frames
    }

    pub fn record_ping(&mut self, ms: u32) {
        self.ping_ms = ms;
    }

    /// Count a snapshot request and decide whether to answer it.
    ///
    /// Once a slow client watches a busy match, every other request goes unanswered.
    pub fn admit_request(&mut self, entity_count: usize) -> bool {
        self.requests += 1;
        if self.skip_frames && self.requests % 2 != 0 {
            return false;
        }
        if !self.skip_frames && entity_count > SKIP_MIN_ENTITIES && self.is_high_latency() {
            info!("Enabling frame skipping for high latency client ({} ms)", self.ping_ms);
            self.skip_frames = true;
        }
        true
    }

    /// Answer one text frame.
    pub async fn respond(&mut self, text: &str, feed: &SharedFeed, policy: &CompressionPolicy) -> Reply {
        match ClientCommand::parse(text) {
            Some(ClientCommand::RequestInfo) => {
                let feed = feed.read().await;
                let snapshot = feed.snapshot();
                if !self.admit_request(snapshot.entities.len()) {
                    return Reply::Nothing;
                }
                match packets::encode_snapshot(snapshot, policy, self.is_high_latency()) {
                    Ok(frame) => Reply::Binary(frame),
                    Err(e) => {
                        error!("Failed to encode snapshot: {}", e);
                        Reply::Text(ERROR_REPLY.to_string())
                    }
                }
            }
            Some(ClientCommand::Ping(ms)) => {
                self.record_ping(ms);
                Reply::Text(PONG_REPLY.to_string())
            }
            Some(ClientCommand::ToggleMoneyReveal) => {
                let enabled = feed.write().await.toggle_money_reveal();
                match packets::encode_control(ControlMessage::MoneyReveal { enabled }) {
                    Ok(control) => Reply::Text(control),
                    Err(e) => {
                        error!("Failed to encode control reply: {}", e);
                        Reply::Text(ERROR_REPLY.to_string())
                    }
                }
            }
            None => {
                warn!("Unknown command: {:?}", text);
                Reply::Text(ERROR_REPLY.to_string())
            }
        }
    }
}

/// Drive one socket until it closes.
pub async fn handle_socket(
    socket: WebSocket,
    addr: SocketAddr,
    feed: SharedFeed,
    policy: CompressionPolicy,
    high_latency_ms: u32,
) {
    info!("Radar client connected from {}", addr);
    let (mut write, mut read) = socket.split();
    let mut session = ClientSession::new(high_latency_ms);

    while let Some(msg) = read.next().await {
        let reply = match msg {
            Ok(Message::Text(text)) => session.respond(text.as_str(), &feed, &policy).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                debug!("Ignoring binary frame from {}", addr);
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket error from {}: {}", addr, e);
                break;
            }
        };

        let sent = match reply {
            Reply::Binary(frame) => write.send(Message::Binary(frame)).await,
            Reply::Text(text) => write.send(Message::Text(text.into())).await,
            Reply::Nothing => Ok(()),
        };
        if let Err(e) = sent {
            warn!("Failed to reply to {}: {}", addr, e);
            break;
        }
    }

    info!("Radar client {} disconnected", addr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedState;
    use protocol::packets::{decode_binary, decode_text, ServerMessage};
    use protocol::{EntityData, PlayerData, RadarData, Team, Vec3};

    fn busy_match(players: usize) -> RadarData {
        let mut data = RadarData::empty(64);
        data.in_match = true;
        data.map_name = Some("de_mirage".into());
        data.entities = (0..players)
            .map(|i| {
                EntityData::Player(PlayerData {
                    pos: Vec3::new(i as f32 * 10.0, 0.0, 0.0),
                    yaw: 0.0,
                    team: Team::Enemy,
                    has_bomb: false,
                    has_awp: false,
                    is_scoped: false,
                    is_dormant: false,
                    name: format!("p{i}"),
                    weapon_id: 7,
                    money: None,
                    health: Some(100),
                })
            })
            .collect();
        data
    }

    #[test]
    fn test_skipping_needs_latency_and_entities() {
        let mut session = ClientSession::new(100);
        session.record_ping(150);
        assert!(session.admit_request(SKIP_MIN_ENTITIES));
        assert!(!session.is_skipping());

        let mut session = ClientSession::new(100);
        session.record_ping(100);
        assert!(session.admit_request(10));
        assert!(!session.is_skipping());
    }

    #[test]
    fn test_skips_every_other_request() {
        let mut session = ClientSession::new(100);
        session.record_ping(250);

        // Request 1 is answered and turns skipping on
        assert!(session.admit_request(10));
        assert!(session.is_skipping());

        let answered: Vec<bool> = (0..4).map(|_| session.admit_request(10)).collect();
        assert_eq!(answered, [true, false, true, false]);
    }

    #[tokio::test]
    async fn test_request_info_returns_current_snapshot() {
        let feed = FeedState::shared(64);
        feed.write().await.set_snapshot(busy_match(2));
        let mut session = ClientSession::new(100);

        let Reply::Binary(frame) = session.respond("requestInfo", &feed, &CompressionPolicy::default()).await else {
            panic!("expected a binary snapshot");
        };
        let data = decode_binary(&frame).unwrap();
        assert_eq!(data.map(), Some("de_mirage"));
        assert_eq!(data.entities.len(), 2);
        assert_eq!(data.money_reveal_enabled, Some(false));
    }

    #[tokio::test]
    async fn test_text_commands() {
        let feed = FeedState::shared(64);
        let policy = CompressionPolicy::default();
        let mut session = ClientSession::new(100);

        assert_eq!(session.respond("ping:142", &feed, &policy).await, Reply::Text("pong".into()));
        assert_eq!(session.ping_ms(), 142);
        assert!(session.is_high_latency());

        assert_eq!(session.respond("hello", &feed, &policy).await, Reply::Text("error".into()));

        let Reply::Text(control) = session.respond("toggleMoneyReveal", &feed, &policy).await else {
            panic!("expected a control reply");
        };
        assert!(matches!(
            decode_text(&control).unwrap(),
            ServerMessage::Control(ControlMessage::MoneyReveal { enabled: true })
        ));
        assert!(feed.read().await.money_reveal());
    }
}
