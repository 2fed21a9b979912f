//! Screen-to-world mapping for the 2D backdrop image
//!
//! The scene is layered over a fixed background photograph. Particles that
//! must line up with the horizon or the ground drawn in that image place
//! themselves through a [`CoordinateMapper`].

use glam::{Vec2, Vec3};

/// Pure mapping between backdrop pixel coordinates and world space
pub trait CoordinateMapper {
    /// Maps a backdrop pixel to a world-space point
    fn screen_to_world(&self, x: f32, y: f32) -> Vec3;

    /// Inverse of [`screen_to_world`](Self::screen_to_world) for the x/y plane
    fn world_to_screen(&self, world: Vec3) -> Vec2;

    /// World-space height of the ground plane
    fn ground_level(&self) -> f32;

    /// Backdrop pixel row where the ground begins
    fn ground_screen_y(&self) -> f32;

    /// Backdrop width in pixels
    fn screen_width(&self) -> f32;
}

/// Linear perspective mapping derived from the backdrop's horizon and ground lines
#[derive(Clone, Debug, PartialEq)]
pub struct BackdropMapping {
    pub screen_width: f32,
    pub screen_height: f32,
    /// Skyline row in pixels from the top
    pub horizon_y: f32,
    /// Ground start row in pixels from the top
    pub ground_y: f32,
    pub world_width: f32,
    pub world_height: f32,
    pub ground_level: f32,
    pub sky_ceiling: f32,
    /// World height spanned between the horizon and ground rows
    pub height_scale: f32,
    /// Depth at the horizon row
    pub depth_far: f32,
    /// Depth gained per unit of normalized height
    pub depth_span: f32,
}

impl Default for BackdropMapping {
    fn default() -> Self {
        Self {
            screen_width: 1920.0,
            screen_height: 1088.0,
            horizon_y: 725.0,
            ground_y: 625.0,
            world_width: 40.0,
            world_height: 30.0,
            ground_level: 0.0,
            sky_ceiling: 25.0,
            height_scale: 10.0,
            depth_far: -20.0,
            depth_span: 20.0,
        }
    }
}

impl BackdropMapping {
    fn band(&self) -> f32 {
        let band = self.horizon_y - self.ground_y;
        if band.abs() < f32::EPSILON {
            1.0
        } else {
            band
        }
    }
}

impl CoordinateMapper for BackdropMapping {
    fn screen_to_world(&self, x: f32, y: f32) -> Vec3 {
        let nx = x / self.screen_width - 0.5;
        let ny = ((self.horizon_y - y) / self.band()).max(0.0);
        Vec3::new(
            nx * self.world_width,
            ny * self.height_scale,
            self.depth_far + ny * self.depth_span,
        )
    }

    fn world_to_screen(&self, world: Vec3) -> Vec2 {
        Vec2::new(
            (world.x / self.world_width + 0.5) * self.screen_width,
            self.horizon_y - (world.y / self.height_scale) * self.band(),
        )
    }

    fn ground_level(&self) -> f32 {
        self.ground_level
    }

    fn ground_screen_y(&self) -> f32 {
        self.ground_y
    }

    fn screen_width(&self) -> f32 {
        self.screen_width
    }
}
