//! Skyglass Particles - Pooled particle emitters for the skyglass scene
//!
//! Provides fixed-capacity particle simulation with:
//! - Stable-slot pools where a spawn against a full pool is silently dropped
//! - Interval and stochastic spawn scheduling with staggered bursts
//! - Per-tick kinematics (drag, wind, ground hugging, perspective scaling)
//! - Age-driven lifecycle phases with smoothed or eased growth and a linear fade
//! - Slot-indexed instance and trail buffers ready for a single GPU upload
//! - Vapor, meteor, shooting star and bubble emitters built on the above

pub mod buffers;
pub mod config;
pub mod curves;
pub mod emitter;
pub mod kinematics;
pub mod lifecycle;
pub mod particle;
pub mod rand;
pub mod scene;
pub mod spawn;

pub use buffers::{InstanceBuffer, InstanceRecord, TrailBuffer, TrailVertex};
pub use config::SceneConfig;
pub use curves::Easing;
pub use emitter::{
    BubbleConfig, BubbleEmitter, DrawBatch, DrawData, Emitter, EmitterStats, MeteorConfig,
    MeteorEmitter, ParticleBlendMode, Primitive, ShootingStarConfig, ShootingStarEmitter,
    Uniforms, VaporConfig, VaporEmitter,
};
pub use particle::{Particle, ParticlePool, Phase, TrailHistory};
pub use crate::rand::ParticleRng;
pub use scene::{ParticleScene, RenderSink};
pub use spawn::{SpawnConfig, SpawnMode, SpawnPolicy};
