//! Client configuration.
//!
//! Passed from page script as a plain JS object; any missing field takes its default.

use serde::{Deserialize, Serialize};

use crate::camera::projection::ViewportMode;

/// Interpolation strength applied when performance mode is switched on.
pub const PERFORMANCE_STRENGTH: f32 = 0.85;
/// Interpolation strength restored when performance mode is switched off.
pub const QUALITY_STRENGTH: f32 = 0.7;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RadarConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub network: NetworkSettings,
}

impl RadarConfig {
    /// Performance mode hides the per-player text annotations and leans harder on interpolation.
    /// Switching it off brings the annotations back.
    pub fn set_performance_mode(&mut self, enabled: bool) {
        let show = !enabled;
        self.render.show_names = show;
        self.render.show_weapons = show;
        self.render.show_money = show;
        self.render.show_health = show;
        self.network.interpolation_strength = if enabled {
            PERFORMANCE_STRENGTH
        } else {
            QUALITY_STRENGTH
        };
    }
}

/// What gets drawn and how the view is framed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    #[serde(default)]
    pub viewport: ViewportMode,
    /// Fraction of the image shown in centered mode.
    #[serde(default = "default_centered_zoom")]
    pub centered_zoom: f32,
    /// Rotate the map so the focused player faces up.
    #[serde(default = "default_true")]
    pub rotate: bool,
    #[serde(default = "default_true")]
    pub show_names: bool,
    #[serde(default = "default_true")]
    pub show_weapons: bool,
    #[serde(default = "default_true")]
    pub show_money: bool,
    #[serde(default = "default_true")]
    pub show_health: bool,
    /// FPS / Hz / ping / rotation line in the corner.
    #[serde(default = "default_true")]
    pub show_stats: bool,
    /// Padding around the entity bounding box, in map pixels.
    #[serde(default = "default_margin")]
    pub bbox_margin: f32,
    /// Markers this far outside the canvas (px) are still drawn.
    #[serde(default = "default_margin")]
    pub cull_margin: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportMode::default(),
            centered_zoom: default_centered_zoom(),
            rotate: true,
            show_names: true,
            show_weapons: true,
            show_money: true,
            show_health: true,
            show_stats: true,
            bbox_margin: default_margin(),
            cull_margin: default_margin(),
        }
    }
}

/// Request pacing, retry and smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettings {
    #[serde(default = "default_true")]
    pub use_interpolation: bool,
    #[serde(default = "default_strength")]
    pub interpolation_strength: f32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u32,
    /// Delay of the first liveness ping after the channel opens.
    #[serde(default = "default_ping_delay")]
    pub ping_delay_ms: u32,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            use_interpolation: true,
            interpolation_strength: default_strength(),
            request_timeout_ms: default_request_timeout(),
            max_retries: default_max_retries(),
            reconnect_delay_ms: default_reconnect_delay(),
            ping_delay_ms: default_ping_delay(),
            ping_interval_ms: default_ping_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_centered_zoom() -> f32 {
    0.5
}
fn default_margin() -> f32 {
    50.0
}
fn default_strength() -> f32 {
    0.6
}
fn default_request_timeout() -> u32 {
    5000
}
fn default_max_retries() -> u32 {
    3
}
fn default_reconnect_delay() -> u32 {
    1000
}
fn default_ping_delay() -> u32 {
    500
}
fn default_ping_interval() -> u32 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: RadarConfig =
            serde_json::from_str(r#"{"render": {"viewport": "bbox", "showMoney": false}}"#).unwrap();
        assert_eq!(config.render.viewport, ViewportMode::BoundingBox);
        assert!(!config.render.show_money);
        assert!(config.render.show_names);
        assert_eq!(config.render.centered_zoom, 0.5);
        assert_eq!(config.network, NetworkSettings::default());
    }

    #[test]
    fn test_empty_object_is_default() {
        let config: RadarConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RadarConfig::default());
        assert_eq!(config.render.viewport, ViewportMode::Centered);
        assert_eq!(config.network.request_timeout_ms, 5000);
        assert_eq!(config.network.max_retries, 3);
    }

    #[test]
    fn test_performance_mode() {
        let mut config = RadarConfig::default();
        config.set_performance_mode(true);
        assert!(!config.render.show_names && !config.render.show_weapons);
        assert!(!config.render.show_money && !config.render.show_health);
        assert_eq!(config.network.interpolation_strength, PERFORMANCE_STRENGTH);

        config.set_performance_mode(false);
        assert!(config.render.show_names && config.render.show_health);
        assert_eq!(config.network.interpolation_strength, QUALITY_STRENGTH);
    }
}
