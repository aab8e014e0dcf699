//! Snapshot types, shaped exactly like the feed's JSON.

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Relationship of a player to the local viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Local,
    Team,
    Enemy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub pos: Vec3,
    pub yaw: f32,
    #[serde(rename = "playerType")]
    pub team: Team,
    #[serde(rename = "hasBomb", default)]
    pub has_bomb: bool,
    #[serde(rename = "hasAwp", default)]
    pub has_awp: bool,
    #[serde(rename = "isScoped", default)]
    pub is_scoped: bool,
    #[serde(rename = "isDormant", default)]
    pub is_dormant: bool,
    #[serde(rename = "playerName", default)]
    pub name: String,
    #[serde(rename = "weaponId", default)]
    pub weapon_id: i16,
    /// Absent when the feed hides money.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BombData {
    pub pos: Vec3,
    #[serde(rename = "isPlanted", default)]
    pub is_planted: bool,
}

/// One entry of `entityData`: `{"Player": {...}}` or `{"Bomb": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityData {
    Player(PlayerData),
    Bomb(BombData),
}

/// Discriminant of [`EntityData`], used to key per-slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Bomb,
}

impl EntityData {
    #[inline]
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Player(_) => EntityKind::Player,
            EntityData::Bomb(_) => EntityKind::Bomb,
        }
    }

    #[inline]
    pub fn pos(&self) -> Vec3 {
        match self {
            EntityData::Player(p) => p.pos,
            EntityData::Bomb(b) => b.pos,
        }
    }

    pub fn as_player(&self) -> Option<&PlayerData> {
        match self {
            EntityData::Player(p) => Some(p),
            EntityData::Bomb(_) => None,
        }
    }
}

/// Planted-bomb state carried at the top level of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BombStatus {
    #[serde(rename = "bombPlanted", default)]
    pub planted: bool,
    #[serde(rename = "bombExploded", default)]
    pub exploded: bool,
    /// Seconds until detonation.
    #[serde(rename = "bombDefuseTimeleft", default)]
    pub time_left: f32,
    #[serde(rename = "bombBeingDefused", default)]
    pub being_defused: bool,
    /// True when the running defuse finishes before detonation.
    #[serde(rename = "bombCanDefuse", default)]
    pub can_defuse: bool,
    /// Seconds-left value at which the running defuse completes.
    #[serde(rename = "bombDefuseEnd", default)]
    pub defuse_end: f32,
    #[serde(rename = "bombDefuseLength", default)]
    pub defuse_length: f32,
}

/// A full game-state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarData {
    /// Update frequency of the feed, in Hz.
    #[serde(default)]
    pub freq: u32,
    #[serde(rename = "ingame", default)]
    pub in_match: bool,
    #[serde(rename = "mapName", default, skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money_reveal_enabled: Option<bool>,
    #[serde(rename = "entityData", default)]
    pub entities: Vec<EntityData>,
    #[serde(flatten)]
    pub bomb: BombStatus,
}

impl RadarData {
    /// The snapshot a feed sends while no match is running.
    pub fn empty(freq: u32) -> Self {
        Self {
            freq,
            in_match: false,
            map_name: None,
            money_reveal_enabled: None,
            entities: Vec::new(),
            bomb: BombStatus::default(),
        }
    }

    /// Map name, treating an empty string as absent.
    pub fn map(&self) -> Option<&str> {
        self.map_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerData> {
        self.entities.iter().filter_map(EntityData::as_player)
    }
}
