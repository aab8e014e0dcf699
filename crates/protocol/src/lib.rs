//! Shared protocol crate for webradar.
//!
//! This crate contains:
//! - Snapshot types as they appear on the wire (JSON)
//! - The flagged binary frame codec (raw / compressed)
//! - Text commands exchanged over the socket

mod binary;
mod error;
pub mod packets;
pub mod snapshot;

pub use binary::{
    CompressionLevel, FrameFlag, MAX_INFLATED_SIZE, build_frame, deflate, inflate, inflate_limited,
    split_frame,
};
pub use error::ProtocolError;
pub use snapshot::{BombData, BombStatus, EntityData, EntityKind, PlayerData, RadarData, Team};

/// World-space position as the feed sends it (`{"x":..,"y":..,"z":..}`).
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Ground-plane position; height is dropped.
    #[inline]
    pub fn xy(self) -> glam::Vec2 {
        glam::Vec2::new(self.x, self.y)
    }
}

impl From<Vec3> for glam::Vec3 {
    fn from(v: Vec3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

impl From<glam::Vec3> for Vec3 {
    fn from(v: glam::Vec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}
