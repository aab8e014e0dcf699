// Snapshot interpolation
//
// Each (slot, kind) keeps the last two observed values. At render time the value is
// blended from `previous` towards `latest`:
//   duration = clamp(avg_rtt * 0.8, 50, 200) ms
//   t        = min(1, elapsed / duration), eased t * (2 - t), scaled by strength
// The blend never reaches past `previous + (latest - previous) * strength`.
use std::collections::HashMap;

use protocol::{EntityData, EntityKind, Vec3};

use crate::utils;

pub const MIN_BLEND_MS: f64 = 50.0;
pub const MAX_BLEND_MS: f64 = 200.0;
const RTT_TO_BLEND: f64 = 0.8;

/// Positional identity of an entity across snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub slot: usize,
    pub kind: EntityKind,
}

impl EntityKey {
    pub fn of(slot: usize, entity: &EntityData) -> Self {
        Self { slot, kind: entity.kind() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationRecord {
    pub previous: EntityData,
    pub latest: EntityData,
    /// `performance.now()` of the snapshot that delivered `latest`.
    pub observed_at: f64,
}

/// Blend window for the current network conditions.
#[inline]
pub fn blend_duration(avg_rtt_ms: f64) -> f64 {
    (avg_rtt_ms * RTT_TO_BLEND).clamp(MIN_BLEND_MS, MAX_BLEND_MS)
}

/// Ease-out quadratic on [0, 1].
#[inline]
pub fn ease_out(t: f32) -> f32 {
    t * (2.0 - t)
}

/// Blend factor for a record observed `elapsed_ms` ago.
pub fn blend_factor(elapsed_ms: f64, avg_rtt_ms: f64, strength: f32) -> f32 {
    let t = (elapsed_ms.max(0.0) / blend_duration(avg_rtt_ms)).min(1.0) as f32;
    ease_out(t) * strength
}

#[derive(Debug)]
pub struct Interpolator {
    records: HashMap<EntityKey, InterpolationRecord>,
    strength: f32,
}

impl Interpolator {
    pub fn new(strength: f32) -> Self {
        Self {
            records: HashMap::new(),
            strength,
        }
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = utils::clamp(strength, 0.0, 1.0);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, key: EntityKey) -> Option<&InterpolationRecord> {
        self.records.get(&key)
    }

    /// Feed one snapshot's entity list. Slots that vanished, or changed kind, lose their record.
    pub fn observe_snapshot(&mut self, entities: &[EntityData], now: f64) {
        self.records.retain(|key, _| {
            entities
                .get(key.slot)
                .is_some_and(|entity| entity.kind() == key.kind)
        });
        for (slot, entity) in entities.iter().enumerate() {
            self.observe(EntityKey::of(slot, entity), entity, now);
        }
    }

    pub fn observe(&mut self, key: EntityKey, value: &EntityData, now: f64) {
        match self.records.get_mut(&key) {
            Some(record) => {
                record.previous = std::mem::replace(&mut record.latest, value.clone());
                record.observed_at = now;
            }
            None => {
                self.records.insert(
                    key,
                    InterpolationRecord {
                        previous: value.clone(),
                        latest: value.clone(),
                        observed_at: now,
                    },
                );
            }
        }
    }

    /// Blended value of `key` at `now`. Pure: records are not touched.
    pub fn sample(&self, key: EntityKey, now: f64, avg_rtt_ms: f64) -> Option<EntityData> {
        let record = self.records.get(&key)?;
        let factor = blend_factor(now - record.observed_at, avg_rtt_ms, self.strength);
        Some(blend(&record.previous, &record.latest, factor))
    }

    /// Discard every record (match session ended).
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

fn lerp_pos(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    utils::lerp_vec3(a.into(), b.into(), t).into()
}

fn blend(previous: &EntityData, latest: &EntityData, t: f32) -> EntityData {
    let mut out = latest.clone();
    match (previous, &mut out) {
        (EntityData::Player(prev), EntityData::Player(next)) => {
            next.pos = lerp_pos(prev.pos, next.pos, t);
            next.yaw = utils::lerp_angle(prev.yaw, next.yaw, t);
        }
        (EntityData::Bomb(prev), EntityData::Bomb(next)) => {
            next.pos = lerp_pos(prev.pos, next.pos, t);
        }
        // Kind mismatch cannot happen for a single key
        _ => {}
    }
    out
}
