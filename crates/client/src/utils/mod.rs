// Geometry helpers: lerp, angle lerp with wraparound, rotation about a point
use glam::{Vec2, Vec3};

/// Linear interpolation between two values
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Per-axis linear interpolation (z included, the projection ignores it)
#[inline]
pub fn lerp_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a.lerp(b, t)
}

/// Wrap an angle in degrees into [0, 360)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Shortest-path angle interpolation in degrees.
///
/// Both ends are wrapped into [0, 360) and the difference into [-180, 180].
/// The result is NOT wrapped again: 350 -> 10 at t = 0.5 gives 360.
/// Wrap before using it for anything but trigonometry.
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    let a = normalize_degrees(a);
    let b = normalize_degrees(b);
    let mut diff = b - a;
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff < -180.0 {
        diff += 360.0;
    }
    a + diff * t
}

#[inline]
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees.to_radians()
}

#[inline]
pub fn rad_to_deg(radians: f32) -> f32 {
    radians.to_degrees()
}

/// Rotate `point` about `center` by `degrees` in screen space (y down, clockwise positive),
/// matching the canvas `rotate()` convention.
pub fn rotate_about(point: Vec2, center: Vec2, degrees: f32) -> Vec2 {
    let (sin, cos) = deg_to_rad(degrees).sin_cos();
    let n = point - center;
    Vec2::new(n.x * cos - n.y * sin, n.x * sin + n.y * cos) + center
}

/// Clamp a value between min and max
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Get the current high-precision timestamp in milliseconds.
/// Browser only: the pipeline itself takes `now` as an argument.
pub fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
