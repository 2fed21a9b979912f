//! Skyglass Core - Foundational types for the skyglass scene
//!
//! This crate provides the types that the particle and host crates share:
//! - `Rgb`, `Palette` - Colors sampled by emitters
//! - `FrameClock`, `FrameTime` - The per-frame delta/elapsed clock contract
//! - `CoordinateMapper`, `BackdropMapping` - Screen to world mapping for the backdrop image
//! - Error types and Result alias

mod clock;
mod coords;
mod error;
mod types;

pub use clock::{FpsCounter, FrameClock, FrameTime};
pub use coords::{BackdropMapping, CoordinateMapper};
pub use error::{Result, SkyglassError};
pub use types::{Palette, Rgb};

pub use glam::{Vec2, Vec3};
