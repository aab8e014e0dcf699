// Camera focus: which player anchors the view, and when map rotation is suppressed
//
// Suspension rule: the focused player was matched in the previous snapshot and is gone
// in this one -> rotation is suspended until the same target shows up again. Switching
// the target clears it immediately.
pub mod projection;

use protocol::{PlayerData, RadarData, Team};

/// Reserved focus name for the local player.
pub const LOCAL_FOCUS: &str = "YOU";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FocusTarget {
    #[default]
    Local,
    Named(String),
}

impl FocusTarget {
    pub fn from_name(name: &str) -> Self {
        if name.is_empty() || name == LOCAL_FOCUS {
            Self::Local
        } else {
            Self::Named(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Local => LOCAL_FOCUS,
            Self::Named(name) => name,
        }
    }

    pub fn matches(&self, player: &PlayerData) -> bool {
        match self {
            Self::Local => player.team == Team::Local,
            Self::Named(name) => player.name == *name,
        }
    }
}

/// The matched focus entity in the latest snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusMatch {
    /// Position in `entityData`, used to pull the blended pose at render time.
    pub slot: usize,
    pub pos: glam::Vec2,
    pub yaw: f32,
}

/// What the last observation changed, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    None,
    Lost,
    Regained,
}

/// Shown in the stats overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStatus {
    Active,
    ManuallyDisabled,
    DisabledDeath,
}

impl RotationStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::ManuallyDisabled => "Manually Disabled",
            Self::DisabledDeath => "Disabled (Death)",
        }
    }
}

#[derive(Debug, Default)]
pub struct FocusController {
    target: FocusTarget,
    current: Option<FocusMatch>,
    matched_previously: bool,
    suspended: bool,
    paused: bool,
    roster: Vec<String>,
}

impl FocusController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> &FocusTarget {
        &self.target
    }

    /// Switch focus. Suspension is lifted; the anchor is resolved again on the next observation.
    pub fn set_target(&mut self, target: FocusTarget) {
        if target != self.target {
            log::info!("Focus -> {}", target.name());
        }
        self.target = target;
        self.current = None;
        self.matched_previously = false;
        self.suspended = false;
    }

    /// Manual rotation pause, independent of suspension.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn current(&self) -> Option<FocusMatch> {
        self.current
    }

    /// Display names of the players in the latest snapshot; the local player is listed as `YOU`.
    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// Resolve the anchor against a new snapshot.
    pub fn observe(&mut self, data: &RadarData) -> FocusChange {
        self.roster.clear();
        let mut found = None;

        for (slot, entity) in data.entities.iter().enumerate() {
            let Some(player) = entity.as_player() else {
                continue;
            };
            let display = if player.team == Team::Local {
                LOCAL_FOCUS
            } else {
                player.name.as_str()
            };
            if !self.roster.iter().any(|name| name == display) {
                self.roster.push(display.to_string());
            }
            if found.is_none() && self.target.matches(player) {
                found = Some(FocusMatch {
                    slot,
                    pos: player.pos.xy(),
                    yaw: player.yaw,
                });
            }
        }

        let change = match (found, self.matched_previously) {
            (Some(_), _) if self.suspended => {
                self.suspended = false;
                FocusChange::Regained
            }
            (None, true) => {
                self.suspended = true;
                FocusChange::Lost
            }
            _ => FocusChange::None,
        };

        match change {
            FocusChange::Lost => log::info!("Focused player {} disappeared, rotation suspended", self.target.name()),
            FocusChange::Regained => log::info!("Focused player {} is back, rotation resumed", self.target.name()),
            FocusChange::None => {}
        }

        self.matched_previously = found.is_some();
        self.current = found;
        change
    }

    /// Drop everything tied to the current match session.
    pub fn reset_session(&mut self) {
        self.current = None;
        self.matched_previously = false;
        self.suspended = false;
        self.roster.clear();
    }

    /// Whether the map should rotate this tick, given the user's rotate option.
    pub fn rotation_active(&self, rotate: bool) -> bool {
        rotate && !self.paused && !self.suspended && self.current.is_some()
    }

    pub fn rotation_status(&self) -> RotationStatus {
        if self.paused {
            RotationStatus::ManuallyDisabled
        } else if self.suspended {
            RotationStatus::DisabledDeath
        } else {
            RotationStatus::Active
        }
    }
}
