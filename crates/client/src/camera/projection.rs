// World -> map -> screen projection
//
//   map:    mx = (x - pos_x) / scale,  my = (y - pos_y) / -scale
//   crop:   one source rectangle of the radar image per tick (full / centered / bbox)
//   screen: (m - crop.min) * canvas / crop.size, then optional rotation about the canvas center
use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::utils;

/// Base text size at 1:1 image-to-crop ratio.
pub const BASE_TEXT_SIZE: f32 = 12.0;
pub const MIN_SIZE_SCALE: f32 = 6.0;
pub const MAX_SIZE_SCALE: f32 = 36.0;

/// Calibration of a radar image against world coordinates (`assets/json/{map}.json`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    pub pos_x: f32,
    pub pos_y: f32,
    /// World units per image pixel.
    pub scale: f32,
}

impl MapDefinition {
    /// A usable calibration has a finite origin and a positive, finite scale.
    pub fn is_valid(&self) -> bool {
        self.pos_x.is_finite() && self.pos_y.is_finite() && is_positive(self.scale)
    }

    #[inline]
    pub fn world_to_map(&self, world: Vec2) -> Vec2 {
        Vec2::new(
            (world.x - self.pos_x) / self.scale,
            (world.y - self.pos_y) / -self.scale,
        )
    }
}

/// Which part of the radar image fills the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportMode {
    /// Whole image scaled to the canvas.
    Full,
    /// Crop around the camera anchor.
    #[default]
    Centered,
    /// Auto-zoom onto the rectangle containing every visible entity.
    #[serde(rename = "bbox", alias = "boundingbox")]
    BoundingBox,
}

impl FromStr for ViewportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "centered" => Ok(Self::Centered),
            "bbox" | "boundingbox" => Ok(Self::BoundingBox),
            other => Err(format!("unknown viewport mode: {other}")),
        }
    }
}

impl fmt::Display for ViewportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Centered => "centered",
            Self::BoundingBox => "bbox",
        })
    }
}

/// Axis-aligned rectangle in map pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    /// Smallest rectangle containing all points, `None` when there are none.
    pub fn enclosing(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self::new(min, max - min))
    }

    pub fn padded(self, margin: f32) -> Self {
        Self::new(self.min - Vec2::splat(margin), self.size + Vec2::splat(margin * 2.0))
    }

    /// Grow the shorter side (about the center) until `width / height == aspect`.
    pub fn fit_aspect(self, aspect: f32) -> Self {
        let center = self.min + self.size * 0.5;
        let mut size = self.size.max(Vec2::ONE);
        if size.x / size.y < aspect {
            size.x = size.y * aspect;
        } else {
            size.y = size.x / aspect;
        }
        Self::new(center - size * 0.5, size)
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Camera anchor in world space: the focused entity's blended position and yaw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub pos: Vec2,
    pub yaw: f32,
}

/// Everything a projection depends on for one tick.
#[derive(Debug, Clone, Copy)]
pub struct ViewParams {
    pub map: MapDefinition,
    pub image_size: Vec2,
    pub canvas_size: Vec2,
    pub mode: ViewportMode,
    pub centered_zoom: f32,
    pub bbox_margin: f32,
    pub anchor: Option<Anchor>,
    /// Rotation requested and not suspended or paused.
    pub rotate: bool,
}

/// A frozen world-to-screen transform. Built once per tick, shared by every drawable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    map: MapDefinition,
    mode: ViewportMode,
    source: Rect,
    canvas_size: Vec2,
    rotation: Option<f32>,
    anchor_yaw: f32,
    size_scale: f32,
}

impl Projection {
    /// Resolve the viewport for this tick.
    ///
    /// `entities` are the world positions considered for the bounding-box mode.
    /// Centered without an anchor or with a non-positive zoom, and bounding box without
    /// entities, fall back to full.
    pub fn new(params: &ViewParams, entities: impl IntoIterator<Item = Vec2>) -> Self {
        let ViewParams { map, image_size, canvas_size, .. } = *params;
        let full = (ViewportMode::Full, Rect::new(Vec2::ZERO, image_size));

        let (mode, source) = match params.mode {
            ViewportMode::Full => full,
            ViewportMode::Centered => match params.anchor {
                Some(anchor) if is_positive(params.centered_zoom) => {
                    let view = image_size * params.centered_zoom;
                    let center = map.world_to_map(anchor.pos);
                    (ViewportMode::Centered, Rect::new(center - view * 0.5, view))
                }
                _ => full,
            },
            ViewportMode::BoundingBox => {
                match Rect::enclosing(entities.into_iter().map(|p| map.world_to_map(p))) {
                    Some(rect) => {
                        let aspect = canvas_size.x / canvas_size.y.max(1.0);
                        let rect = rect.padded(params.bbox_margin).fit_aspect(aspect);
                        (ViewportMode::BoundingBox, rect)
                    }
                    None => full,
                }
            }
        };

        let rotation = match params.anchor {
            Some(anchor) if params.rotate => Some(anchor.yaw + 270.0),
            _ => None,
        };

        let size_scale = if source.size.x > 0.0 {
            utils::clamp(
                BASE_TEXT_SIZE * image_size.x / source.size.x,
                MIN_SIZE_SCALE,
                MAX_SIZE_SCALE,
            )
        } else {
            BASE_TEXT_SIZE
        };

        Self {
            map,
            mode,
            source,
            canvas_size,
            rotation,
            anchor_yaw: params.anchor.map_or(0.0, |a| a.yaw),
            size_scale,
        }
    }

    /// Viewport actually used this tick, after fallbacks.
    #[inline]
    pub fn mode(&self) -> ViewportMode {
        self.mode
    }

    /// Image region drawn onto the whole canvas.
    #[inline]
    pub fn source_rect(&self) -> Rect {
        self.source
    }

    /// Map rotation in degrees (canvas convention), if rotating.
    #[inline]
    pub fn rotation(&self) -> Option<f32> {
        self.rotation
    }

    #[inline]
    pub fn size_scale(&self) -> f32 {
        self.size_scale
    }

    #[inline]
    pub fn canvas_center(&self) -> Vec2 {
        self.canvas_size * 0.5
    }

    #[inline]
    pub fn world_to_map(&self, world: Vec2) -> Vec2 {
        self.map.world_to_map(world)
    }

    /// World position -> canvas pixel.
    pub fn project(&self, world: Vec2) -> Vec2 {
        let m = self.map.world_to_map(world);
        let screen = (m - self.source.min) * self.canvas_size / self.source.size;
        match self.rotation {
            Some(angle) => utils::rotate_about(screen, self.canvas_center(), angle),
            None => screen,
        }
    }

    /// Marker heading on screen (degrees, counter-clockwise from +x, y up).
    /// Same rule for every player: the anchor itself ends up pointing up.
    pub fn heading(&self, yaw: f32) -> f32 {
        match self.rotation {
            Some(_) => yaw - self.anchor_yaw + 90.0,
            None => yaw,
        }
    }
}
