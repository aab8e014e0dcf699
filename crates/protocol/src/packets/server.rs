//! Server -> Client messages: decoding on the client, encoding on the feed.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::binary::{self, CompressionLevel, FrameFlag};
use crate::{ProtocolError, RadarData};

/// A raw frame as delivered by the socket.
#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

/// A decoded server message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Reply to a liveness ping.
    Pong,
    /// Server-side fault; the pending request will not be answered.
    Error,
    /// Side-channel control message.
    Control(ControlMessage),
    /// A game-state snapshot.
    Snapshot(Box<RadarData>),
}

/// Side-channel messages, independent of the snapshot cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    MoneyReveal { enabled: bool },
}

#[derive(Debug, Serialize, Deserialize)]
struct ControlWire {
    action: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    enabled: bool,
}

const ACTION_MONEY_REVEAL: &str = "toggleMoneyReveal";

/// Decode any frame.
pub fn decode_frame(frame: Frame<'_>) -> Result<ServerMessage, ProtocolError> {
    match frame {
        Frame::Text(text) => decode_text(text),
        Frame::Binary(data) => decode_binary(data).map(|data| ServerMessage::Snapshot(Box::new(data))),
    }
}

/// Decode a text frame: `pong`, `error`, control JSON or snapshot JSON.
pub fn decode_text(text: &str) -> Result<ServerMessage, ProtocolError> {
    match text {
        "pong" => Ok(ServerMessage::Pong),
        "error" => Ok(ServerMessage::Error),
        _ => {
            let value: serde_json::Value = serde_json::from_str(text)?;
            if value.get("action").is_some() {
                let wire: ControlWire = serde_json::from_value(value)?;
                return match wire.action.as_str() {
                    ACTION_MONEY_REVEAL => Ok(ServerMessage::Control(ControlMessage::MoneyReveal {
                        enabled: wire.enabled,
                    })),
                    _ => Err(ProtocolError::UnknownAction(wire.action)),
                };
            }
            let data: RadarData = serde_json::from_value(value)?;
            Ok(ServerMessage::Snapshot(Box::new(data)))
        }
    }
}

/// Decode a binary snapshot frame (flag byte + JSON, inflated when flagged).
pub fn decode_binary(frame: &[u8]) -> Result<RadarData, ProtocolError> {
    let (flag, payload) = binary::split_frame(frame)?;
    let data = match flag {
        FrameFlag::Raw => serde_json::from_str(std::str::from_utf8(payload)?)?,
        FrameFlag::Compressed => {
            let inflated = binary::inflate(payload)?;
            serde_json::from_str(std::str::from_utf8(&inflated)?)?
        }
    };
    Ok(data)
}

/// Size thresholds choosing how hard the feed compresses a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPolicy {
    /// Payloads above this size use the default level.
    pub default_above: usize,
    /// Payloads above this size use the best level.
    pub best_above: usize,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            default_above: 5_000,
            best_above: 20_000,
        }
    }
}

impl CompressionPolicy {
    pub fn level_for(&self, json_len: usize, high_latency: bool) -> CompressionLevel {
        if json_len > self.best_above || high_latency {
            CompressionLevel::Best
        } else if json_len > self.default_above {
            CompressionLevel::Default
        } else {
            CompressionLevel::Fast
        }
    }
}

/// Encode a snapshot as a binary frame.
///
/// The compressed form is only used when it is actually smaller; if the
/// encoder fails the raw form is sent.
pub fn encode_snapshot(
    data: &RadarData,
    policy: &CompressionPolicy,
    high_latency: bool,
) -> Result<Bytes, ProtocolError> {
    let json = serde_json::to_vec(data)?;
    let level = policy.level_for(json.len(), high_latency);
    match binary::deflate(&json, level) {
        Ok(compressed) if compressed.len() < json.len() => {
            Ok(binary::build_frame(FrameFlag::Compressed, &compressed))
        }
        _ => Ok(binary::build_frame(FrameFlag::Raw, &json)),
    }
}

/// Encode a control reply as a text frame.
pub fn encode_control(message: ControlMessage) -> Result<String, ProtocolError> {
    let wire = match message {
        ControlMessage::MoneyReveal { enabled } => ControlWire {
            action: ACTION_MONEY_REVEAL.to_string(),
            status: Some("success".to_string()),
            enabled,
        },
    };
    Ok(serde_json::to_string(&wire)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::build_frame;
    use crate::{BombStatus, EntityData, PlayerData, Team, Vec3};

    fn snapshot() -> RadarData {
        RadarData {
            freq: 64,
            in_match: true,
            map_name: Some("de_dust2".into()),
            money_reveal_enabled: Some(false),
            entities: vec![EntityData::Player(PlayerData {
                pos: Vec3::new(-512.0, 1024.0, 64.0),
                yaw: 270.0,
                team: Team::Enemy,
                has_bomb: true,
                has_awp: false,
                is_scoped: false,
                is_dormant: false,
                name: "carrier".into(),
                weapon_id: 7,
                money: Some(16000),
                health: Some(100),
            })],
            bomb: BombStatus::default(),
        }
    }

    #[test]
    fn test_raw_and_compressed_frames_decode_identically() {
        let data = snapshot();
        let json = serde_json::to_vec(&data).unwrap();

        let raw = build_frame(FrameFlag::Raw, &json);
        let gz = build_frame(
            FrameFlag::Compressed,
            &binary::deflate(&json, CompressionLevel::Best).unwrap(),
        );

        let a = decode_binary(&raw).unwrap();
        let b = decode_binary(&gz).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, data);
    }

    #[test]
    fn test_unknown_flag_is_decode_error() {
        let err = decode_binary(&[0x02, b'{', b'}']).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownFlag(0x02)));
    }

    #[test]
    fn test_corrupt_compressed_payload_is_decode_error() {
        let err = decode_binary(&[0x01, 0x00, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, ProtocolError::Decompress(_)));
    }

    #[test]
    fn test_bad_json_is_decode_error() {
        let err = decode_binary(b"\x00{\"freq\": ").unwrap_err();
        assert!(matches!(err, ProtocolError::Json(_)));
    }

    #[test]
    fn test_text_routing() {
        assert_eq!(decode_text("pong").unwrap(), ServerMessage::Pong);
        assert_eq!(decode_text("error").unwrap(), ServerMessage::Error);

        let control = decode_text(r#"{"action":"toggleMoneyReveal","status":"success","enabled":true}"#).unwrap();
        assert_eq!(control, ServerMessage::Control(ControlMessage::MoneyReveal { enabled: true }));

        let snap = decode_text(r#"{"freq":32,"ingame":false,"entityData":[]}"#).unwrap();
        assert!(matches!(snap, ServerMessage::Snapshot(data) if data.freq == 32));

        assert!(matches!(
            decode_text(r#"{"action":"selfDestruct"}"#),
            Err(ProtocolError::UnknownAction(action)) if action == "selfDestruct"
        ));
    }

    #[test]
    fn test_encode_prefers_smaller_form() {
        let data = RadarData::empty(64);
        let frame = encode_snapshot(&data, &CompressionPolicy::default(), false).unwrap();
        let json_len = serde_json::to_vec(&data).unwrap().len();
        assert!(frame.len() <= json_len + 1);
        assert_eq!(decode_binary(&frame).unwrap(), data);

        let mut big = snapshot();
        big.entities = std::iter::repeat(big.entities[0].clone()).take(40).collect();
        let frame = encode_snapshot(&big, &CompressionPolicy::default(), false).unwrap();
        assert_eq!(frame[0], FrameFlag::Compressed.as_byte());
        assert_eq!(decode_binary(&frame).unwrap(), big);
    }

    #[test]
    fn test_compression_policy_levels() {
        let policy = CompressionPolicy::default();
        assert_eq!(policy.level_for(100, false), CompressionLevel::Fast);
        assert_eq!(policy.level_for(6_000, false), CompressionLevel::Default);
        assert_eq!(policy.level_for(30_000, false), CompressionLevel::Best);
        assert_eq!(policy.level_for(100, true), CompressionLevel::Best);
    }

    #[test]
    fn test_control_reply_roundtrips_through_decoder() {
        let text = encode_control(ControlMessage::MoneyReveal { enabled: false }).unwrap();
        assert_eq!(
            decode_text(&text).unwrap(),
            ServerMessage::Control(ControlMessage::MoneyReveal { enabled: false })
        );
    }
}
