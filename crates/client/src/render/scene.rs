// Scene description: everything one frame draws, in canvas pixels
//
// Built by `RadarClient::tick`, consumed by `Renderer::draw`. No web-sys in here.
use glam::Vec2;
use protocol::{BombStatus, PlayerData, Team};

use crate::camera::projection::Rect;
use crate::config::RenderConfig;

pub mod colors {
    pub const BACKGROUND: &str = "#0f0f0f";
    pub const LOCAL: &str = "#109856";
    pub const TEAM: &str = "#68a3e5";
    pub const ENEMY: &str = "#ec040b";
    pub const BOMB: &str = "#eda338";
    pub const TEXT: &str = "#d1d1d1";
    pub const STATS: &str = "#00FF00";
    pub const AWP: &str = "orange";
    pub const FOCUS_RING: &str = "#FFFFFF";

    pub const GOOD: &str = "#32CD32";
    pub const FAIR: &str = "#FFFF00";
    pub const LOW_HEALTH: &str = "#FF0000";
    pub const LOW_MONEY: &str = "#FF4500";
    pub const BAR_TRACK: &str = "#444444";
}

/// Seconds represented by a full bomb timer bar.
pub const BOMB_TIMER_SECONDS: f32 = 40.0;
/// Defuse time with a kit / without one.
pub const KIT_DEFUSE_SECONDS: f32 = 5.0;
pub const NO_KIT_DEFUSE_SECONDS: f32 = 10.0;

const BOMB_TIMER_INSET: f32 = 128.0;
const BOMB_TIMER_TOP: f32 = 16.0;
const BOMB_TIMER_HEIGHT: f32 = 16.0;

/// First annotation sits this far below the marker; each following one one step further.
pub const ANNOTATION_BASE: f32 = 20.0;
pub const ANNOTATION_STEP: f32 = 15.0;

pub const WEAPON_AWP: i16 = 9;

/// A full frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub state: SceneState,
    pub stats: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneState {
    /// Not in a match or no map: background plus a status message.
    NoData { message: &'static str },
    /// Map requested, assets still on their way: background only.
    Loading,
    Active(Box<ActiveScene>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveScene {
    pub map_name: String,
    /// Image region stretched over the canvas.
    pub source: Rect,
    /// Canvas rotation about the center, degrees.
    pub rotation: Option<f32>,
    pub markers: Vec<Marker>,
    pub bomb_timer: Option<BombTimerLayout>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Player(PlayerMarker),
    Bomb(BombMarker),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMarker {
    pub pos: Vec2,
    pub color: &'static str,
    pub radius: f32,
    /// Screen heading in degrees, counter-clockwise from +x.
    pub heading: f32,
    pub focused: bool,
    pub dormant: bool,
    pub has_awp: bool,
    pub scoped: bool,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BombMarker {
    pub pos: Vec2,
    pub radius: f32,
    pub planted: bool,
    /// Blink phase of the planted ring.
    pub blink: bool,
}

/// One line of text (or the health bar) stacked under a player marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// Distance below the marker center.
    pub offset_y: f32,
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationKind {
    Text { text: String, color: &'static str },
    Health { value: u32, color: &'static str },
}

/// Bomb countdown bar across the top of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct BombTimerLayout {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Time left / 40 s, clamped to [0, 1].
    pub fill_ratio: f32,
    pub fill_color: &'static str,
    /// Kit and no-kit defuse thresholds, as ratios of the bar.
    pub ticks: [f32; 2],
    /// Predicted completion of a running defuse, as a ratio of the bar.
    pub defuse_marker: Option<f32>,
    pub label: String,
}

pub fn team_color(team: Team) -> &'static str {
    match team {
        Team::Local => colors::LOCAL,
        Team::Team => colors::TEAM,
        Team::Enemy => colors::ENEMY,
    }
}

pub fn health_color(health: u32) -> &'static str {
    if health > 70 {
        colors::GOOD
    } else if health > 30 {
        colors::FAIR
    } else {
        colors::LOW_HEALTH
    }
}

pub fn money_color(money: i32) -> &'static str {
    if money >= 10_000 {
        colors::GOOD
    } else if money >= 4_500 {
        colors::FAIR
    } else {
        colors::LOW_MONEY
    }
}

/// `12345` -> `$12,345`
pub fn format_money(money: i32) -> String {
    let digits = money.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if money < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn weapon_name(weapon_id: i16) -> &'static str {
    match weapon_id {
        1 => "DEAGLE",
        2 => "DUALIES",
        3 => "FIVE-SEVEN",
        4 => "GLOCK",
        7 => "AK-47",
        8 => "AUG",
        9 => "AWP",
        10 => "FAMAS",
        11 => "G3SG1",
        13 => "GALIL",
        14 => "M249",
        16 => "M4A4",
        17 => "MAC-10",
        19 => "P90",
        23 => "MP5",
        24 => "UMP",
        25 => "XM1014",
        26 => "BIZON",
        27 => "MAG-7",
        28 => "NEGEV",
        29 => "SAWED-OFF",
        30 => "TEC-9",
        31 => "ZEUS",
        32 => "P2000",
        33 => "MP7",
        34 => "MP9",
        35 => "NOVA",
        36 => "P250",
        38 => "SCAR-20",
        39 => "SG 553",
        40 => "SCOUT",
        43 => "FLASH",
        44 => "HE",
        45 => "SMOKE",
        46 => "MOLOTOV",
        47 => "DECOY",
        48 => "INCENDIARY",
        49 => "C4",
        60 => "M4A1-S",
        61 => "USP-S",
        63 => "CZ75",
        64 => "REVOLVER",
        // 0, knife skins (>= 500) and anything unknown
        _ => "KNIFE",
    }
}

/// Stack the enabled annotations of a live player under its marker.
/// Absent values (money / health hidden by the feed) take no slot.
pub fn annotations(player: &PlayerData, config: &RenderConfig, size_scale: f32) -> Vec<Annotation> {
    let small = size_scale * 0.8;
    let mut kinds: Vec<(AnnotationKind, f32)> = Vec::with_capacity(5);

    if config.show_names {
        let mut text = if player.team == Team::Local {
            crate::camera::LOCAL_FOCUS.to_string()
        } else {
            player.name.clone()
        };
        if player.is_scoped {
            text.push_str(" [SCOPED]");
        }
        kinds.push((AnnotationKind::Text { text, color: team_color(player.team) }, size_scale));
    }
    if config.show_weapons {
        let color = if player.weapon_id == WEAPON_AWP { colors::AWP } else { colors::TEXT };
        let text = format!("[{}]", weapon_name(player.weapon_id));
        kinds.push((AnnotationKind::Text { text, color }, small));
    }
    if player.has_bomb {
        kinds.push((AnnotationKind::Text { text: "[C4]".into(), color: colors::BOMB }, small));
    }
    if config.show_money {
        if let Some(money) = player.money {
            kinds.push((AnnotationKind::Text { text: format_money(money), color: money_color(money) }, small));
        }
    }
    if config.show_health {
        if let Some(health) = player.health {
            kinds.push((AnnotationKind::Health { value: health, color: health_color(health) }, small));
        }
    }

    kinds
        .into_iter()
        .enumerate()
        .map(|(i, (kind, font_size))| Annotation {
            kind,
            offset_y: ANNOTATION_BASE + ANNOTATION_STEP * i as f32,
            font_size,
        })
        .collect()
}

/// Countdown bar for a planted, live bomb.
pub fn bomb_timer(bomb: &BombStatus, canvas_width: f32) -> Option<BombTimerLayout> {
    if !bomb.planted || bomb.exploded || bomb.time_left < 0.0 {
        return None;
    }
    let fill_color = match (bomb.being_defused, bomb.can_defuse) {
        (true, true) => colors::TEAM,
        (true, false) => colors::ENEMY,
        (false, _) => colors::BOMB,
    };
    let ratio = |seconds: f32| (seconds / BOMB_TIMER_SECONDS).clamp(0.0, 1.0);

    Some(BombTimerLayout {
        x: BOMB_TIMER_INSET,
        y: BOMB_TIMER_TOP,
        width: (canvas_width - BOMB_TIMER_INSET * 2.0).max(0.0),
        height: BOMB_TIMER_HEIGHT,
        fill_ratio: ratio(bomb.time_left),
        fill_color,
        ticks: [ratio(KIT_DEFUSE_SECONDS), ratio(NO_KIT_DEFUSE_SECONDS)],
        defuse_marker: bomb.being_defused.then(|| ratio(bomb.defuse_end)),
        label: format!("{:.1}s", bomb.time_left),
    })
}

/// Inside the canvas grown by `margin` on every side.
#[inline]
pub fn is_visible(pos: Vec2, canvas: Vec2, margin: f32) -> bool {
    pos.x >= -margin && pos.y >= -margin && pos.x <= canvas.x + margin && pos.y <= canvas.y + margin
}

/// Frames-per-second over one-second windows.
#[derive(Debug, Default)]
pub struct FrameStats {
    window_start: Option<f64>,
    frames: u32,
    fps: u32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&mut self, now: f64) {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;
        let elapsed = now - start;
        if elapsed > 1000.0 {
            self.fps = (self.frames as f64 * 1000.0 / elapsed).round() as u32;
            self.frames = 0;
            self.window_start = Some(now);
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }
}

pub fn stats_line(fps: u32, freq: u32, avg_rtt_ms: f64, rotation: &str) -> String {
    format!(
        "{fps} FPS | {freq} Hz | Ping: {}ms | Rotation: {rotation}",
        avg_rtt_ms.round() as i64
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Vec3;

    fn player() -> PlayerData {
        PlayerData {
            pos: Vec3::ZERO,
            yaw: 0.0,
            team: Team::Enemy,
            has_bomb: true,
            has_awp: false,
            is_scoped: true,
            is_dormant: false,
            name: "bob".into(),
            weapon_id: 9,
            money: Some(12_345),
            health: Some(25),
        }
    }

    #[test]
    fn test_bomb_timer_fill() {
        let bomb = BombStatus {
            planted: true,
            time_left: 35.0,
            ..BombStatus::default()
        };
        let timer = bomb_timer(&bomb, 1024.0).unwrap();
        assert_eq!(timer.fill_ratio, 0.875);
        assert_eq!(timer.width, 768.0);
        assert_eq!(timer.fill_color, colors::BOMB);
        assert_eq!(timer.ticks, [0.125, 0.25]);
        assert_eq!(timer.defuse_marker, None);
        assert_eq!(timer.label, "35.0s");
    }

    #[test]
    fn test_bomb_timer_hidden() {
        let mut bomb = BombStatus { planted: true, time_left: -0.1, ..BombStatus::default() };
        assert!(bomb_timer(&bomb, 1024.0).is_none());
        bomb.time_left = 10.0;
        bomb.exploded = true;
        assert!(bomb_timer(&bomb, 1024.0).is_none());
        assert!(bomb_timer(&BombStatus::default(), 1024.0).is_none());
    }

    #[test]
    fn test_bomb_timer_defuse() {
        let bomb = BombStatus {
            planted: true,
            time_left: 20.0,
            being_defused: true,
            can_defuse: true,
            defuse_end: 15.0,
            ..BombStatus::default()
        };
        let timer = bomb_timer(&bomb, 1024.0).unwrap();
        assert_eq!(timer.fill_color, colors::TEAM);
        assert_eq!(timer.defuse_marker, Some(0.375));

        let hopeless = BombStatus { can_defuse: false, ..bomb };
        assert_eq!(bomb_timer(&hopeless, 1024.0).unwrap().fill_color, colors::ENEMY);
    }

    #[test]
    fn test_annotation_stack() {
        let config = RenderConfig::default();
        let stack = annotations(&player(), &config, 12.0);
        let offsets: Vec<f32> = stack.iter().map(|a| a.offset_y).collect();
        assert_eq!(offsets, [20.0, 35.0, 50.0, 65.0, 80.0]);

        let texts: Vec<String> = stack
            .iter()
            .filter_map(|a| match &a.kind {
                AnnotationKind::Text { text, .. } => Some(text.clone()),
                AnnotationKind::Health { .. } => None,
            })
            .collect();
        assert_eq!(texts, ["bob [SCOPED]", "[AWP]", "[C4]", "$12,345"]);
        assert_eq!(
            stack[4].kind,
            AnnotationKind::Health { value: 25, color: colors::LOW_HEALTH }
        );
    }

    #[test]
    fn test_annotation_toggles() {
        let config = RenderConfig {
            show_names: false,
            show_weapons: false,
            ..RenderConfig::default()
        };
        let mut p = player();
        p.has_bomb = false;
        p.money = None;
        let stack = annotations(&p, &config, 12.0);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].offset_y, ANNOTATION_BASE);
        assert!(matches!(stack[0].kind, AnnotationKind::Health { .. }));
    }

    #[test]
    fn test_money_format_and_colors() {
        assert_eq!(format_money(0), "$0");
        assert_eq!(format_money(800), "$800");
        assert_eq!(format_money(4_500), "$4,500");
        assert_eq!(format_money(1_234_567), "$1,234,567");
        assert_eq!(money_color(16_000), colors::GOOD);
        assert_eq!(money_color(4_500), colors::FAIR);
        assert_eq!(money_color(4_499), colors::LOW_MONEY);
    }

    #[test]
    fn test_weapon_names() {
        assert_eq!(weapon_name(7), "AK-47");
        assert_eq!(weapon_name(0), "KNIFE");
        assert_eq!(weapon_name(515), "KNIFE");
        assert_eq!(weapon_name(61), "USP-S");
    }

    #[test]
    fn test_visibility_margin() {
        let canvas = Vec2::splat(1024.0);
        assert!(is_visible(Vec2::new(-50.0, 1074.0), canvas, 50.0));
        assert!(!is_visible(Vec2::new(-50.1, 0.0), canvas, 50.0));
    }

    #[test]
    fn test_fps_window() {
        let mut stats = FrameStats::new();
        for i in 0..=60 {
            stats.frame(i as f64 * 1000.0 / 60.0);
        }
        assert_eq!(stats.fps(), 0);
        stats.frame(1001.0);
        assert!((60..=63).contains(&stats.fps()), "got {}", stats.fps());
        assert_eq!(
            stats_line(60, 64, 41.6, "Active"),
            "60 FPS | 64 Hz | Ping: 42ms | Rotation: Active"
        );
    }
}
