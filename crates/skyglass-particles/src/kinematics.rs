//! Per-tick motion integration and derived physical quantities
//!
//! Drag is a per-tick multiplier, not scaled by `dt`. Frames arrive from the
//! host at a near-constant rate, and the tuned drag constants assume that.

use crate::curves::lerp_f32;
use glam::Vec3;

/// Multiply velocity by a per-tick drag coefficient
pub fn apply_drag(velocity: &mut Vec3, drag: f32) {
    *velocity *= drag;
}

/// Per-axis drag, for emitters whose axes settle at different rates
pub fn apply_axis_drag(velocity: &mut Vec3, drag: Vec3) {
    *velocity *= drag;
}

/// Explicit Euler position step
pub fn integrate(position: &mut Vec3, velocity: Vec3, dt: f32) {
    *position += velocity * dt;
}

/// Accumulate a constant wind force into velocity
pub fn apply_wind(velocity: &mut Vec3, direction: Vec3, speed: f32, dt: f32) {
    *velocity += direction * (speed * dt);
}

/// Slowly varying ground offset so vapor rolls over an uneven surface
pub fn ground_variation(time: f32, x: f32, z: f32) -> f32 {
    (time * 0.5 + x).sin() * 0.5 + (time * 0.3 + z).cos() * 0.3
}

/// Ease a height toward `target` at `rate * dt` of the remaining distance
pub fn hug_ground(y: f32, target: f32, rate: f32, dt: f32) -> f32 {
    lerp_f32(y, target, (rate * dt).clamp(0.0, 1.0))
}

/// Normalized altitude of `y` below `ceiling` (1.0 at the ceiling)
pub fn altitude(y: f32, ceiling: f32) -> f32 {
    if ceiling <= 0.0 {
        0.0
    } else {
        y / ceiling
    }
}

/// Atmospheric heating: brightness grows faster the lower the meteor is,
/// capped at 2.0
pub fn heat_intensity(intensity: f32, altitude: f32, dt: f32) -> f32 {
    (intensity * (1.0 + (1.0 - altitude) * dt)).min(2.0)
}

/// Trail length a meteor enters the sky with
pub fn spawn_trail_length(base: f32, altitude: f32) -> f32 {
    base * (0.5 + altitude * 1.5)
}

/// Visible trail length shrinks as the meteor descends
pub fn trail_length_at(base: f32, altitude: f32) -> f32 {
    base * (0.3 + altitude * 1.2)
}

/// Depth-based size scaling for billboards placed at different distances
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveScale {
    pub near_plane: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Largest allowed diameter as a fraction of the viewport height
    pub max_height_ratio: f32,
    /// Visible world height at the billboard plane
    pub viewport_height: f32,
    /// Diameter an instance has at scale 1.0
    pub base_diameter: f32,
}

impl Default for PerspectiveScale {
    fn default() -> Self {
        Self {
            near_plane: 0.5,
            min_scale: 0.3,
            max_scale: 3.0,
            max_height_ratio: 0.33,
            viewport_height: 10.0,
            base_diameter: 1.5,
        }
    }
}

impl PerspectiveScale {
    /// `near / (near + depth)`, clamped to `[min_scale, max_scale]` and then
    /// to the viewport fraction limit
    pub fn scale_for_depth(&self, depth: f32) -> f32 {
        let depth = depth.abs();
        let raw = self.near_plane / (self.near_plane + depth);
        let clamped = raw.clamp(self.min_scale, self.max_scale);
        if self.base_diameter <= 0.0 {
            return clamped;
        }
        let viewport_cap = self.viewport_height * self.max_height_ratio / self.base_diameter;
        clamped.min(viewport_cap)
    }

    pub fn diameter_for_depth(&self, depth: f32) -> f32 {
        self.base_diameter * self.scale_for_depth(depth)
    }
}
