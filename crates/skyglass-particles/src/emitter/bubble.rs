//! Vaporwave bubbles: translucent discs that grow in place and drift near the ground

use super::{DrawBatch, DrawData, Emitter, EmitterCore, EmitterStats, ParticleBlendMode, Primitive, Uniforms};
use crate::buffers::InstanceRecord;
use crate::config::{
    read_bool, read_easing, read_f32, read_lifecycle, read_palette, read_spawn, read_usize,
    read_vec3, validate_capacity, validate_lifecycle, validate_span, validate_spawn,
};
use crate::kinematics::{apply_axis_drag, PerspectiveScale};
use crate::lifecycle::{step_growth, GrowthCurve, LifecycleProfile};
use crate::rand::ParticleRng;
use crate::spawn::{SpawnConfig, SpawnMode};
use glam::Vec3;
use skyglass_core::{FrameTime, Palette, Result, Rgb, SkyglassError};

pub const BUBBLE_PALETTE: [u32; 5] = [0xff00ff, 0x00ffff, 0x0080ff, 0xff0080, 0x8000ff];

#[derive(Debug, Clone, PartialEq)]
pub struct BubbleConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub spawn: SpawnConfig,
    pub lifetime_min: f32,
    pub lifetime_max: f32,
    pub alpha_min: f32,
    pub alpha_max: f32,
    pub palette: Palette,
    /// Full width of the spawn band along x
    pub spawn_width: f32,
    pub ground_y: f32,
    /// Random extra height above `ground_y`
    pub ground_band: f32,
    pub z_min: f32,
    pub z_max: f32,
    /// Full width of the initial x velocity jitter
    pub velocity_x: f32,
    pub rise_min: f32,
    pub rise_max: f32,
    /// Full width of the initial z velocity jitter
    pub velocity_z: f32,
    /// Per-axis multipliers applied when integrating position
    pub drift: Vec3,
    /// Per-axis per-tick velocity multipliers
    pub drag: Vec3,
    /// Retire once this far above the spawn height
    pub rise_limit: f32,
    /// Retire once this far below the spawn height
    pub sink_limit: f32,
    /// Retire beyond this horizontal distance from center
    pub x_limit: f32,
    pub pulse_speed: f32,
    pub growth: GrowthCurve,
    pub perspective: PerspectiveScale,
    pub lifecycle: LifecycleProfile,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 20,
            spawn: SpawnConfig {
                mode: SpawnMode::Stochastic,
                rate: 6.0,
                ..Default::default()
            },
            lifetime_min: 3.0,
            lifetime_max: 6.0,
            alpha_min: 0.6,
            alpha_max: 0.9,
            palette: Palette::from_hex(&BUBBLE_PALETTE),
            spawn_width: 20.0,
            ground_y: -3.5,
            ground_band: 0.5,
            z_min: -5.5,
            z_max: -0.5,
            velocity_x: 1.6,
            rise_min: 0.05,
            rise_max: 0.15,
            velocity_z: 0.6,
            drift: Vec3::new(8.0, 3.0, 5.0),
            drag: Vec3::new(0.995, 0.98, 1.0),
            rise_limit: 2.0,
            sink_limit: 1.0,
            x_limit: 15.0,
            pulse_speed: 2.0,
            growth: GrowthCurve::default(),
            perspective: PerspectiveScale::default(),
            lifecycle: LifecycleProfile::default(),
        }
    }
}

impl BubbleConfig {
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        read_bool(table, "enabled", &mut config.enabled);
        read_usize(table, "capacity", &mut config.capacity);
        read_spawn(table, &mut config.spawn);
        read_f32(table, "lifetime_min", &mut config.lifetime_min);
        read_f32(table, "lifetime_max", &mut config.lifetime_max);
        read_f32(table, "alpha_min", &mut config.alpha_min);
        read_f32(table, "alpha_max", &mut config.alpha_max);
        read_palette(table, "colors", &mut config.palette);
        read_f32(table, "spawn_width", &mut config.spawn_width);
        read_f32(table, "ground_y", &mut config.ground_y);
        read_f32(table, "ground_band", &mut config.ground_band);
        read_f32(table, "z_min", &mut config.z_min);
        read_f32(table, "z_max", &mut config.z_max);
        read_f32(table, "velocity_x", &mut config.velocity_x);
        read_f32(table, "rise_min", &mut config.rise_min);
        read_f32(table, "rise_max", &mut config.rise_max);
        read_f32(table, "velocity_z", &mut config.velocity_z);
        read_vec3(table, "drift", &mut config.drift);
        read_vec3(table, "drag", &mut config.drag);
        read_f32(table, "rise_limit", &mut config.rise_limit);
        read_f32(table, "sink_limit", &mut config.sink_limit);
        read_f32(table, "x_limit", &mut config.x_limit);
        read_f32(table, "pulse_speed", &mut config.pulse_speed);
        read_f32(table, "min_diameter", &mut config.growth.min_size);
        read_f32(table, "growth_duration", &mut config.growth.duration);
        read_easing(table, "growth_easing", &mut config.growth.easing);
        read_f32(table, "opacity_lag", &mut config.growth.opacity_lag);
        read_f32(table, "base_diameter", &mut config.perspective.base_diameter);
        read_f32(table, "near_plane", &mut config.perspective.near_plane);
        read_f32(table, "min_scale", &mut config.perspective.min_scale);
        read_f32(table, "max_scale", &mut config.perspective.max_scale);
        read_f32(table, "max_height_ratio", &mut config.perspective.max_height_ratio);
        read_f32(table, "viewport_height", &mut config.perspective.viewport_height);
        read_lifecycle(table, &mut config.lifecycle);
        config
    }

    pub fn validate(&self) -> Result<()> {
        validate_capacity("bubbles", self.capacity)?;
        validate_spawn("bubbles", &self.spawn)?;
        validate_lifecycle("bubbles", &self.lifecycle)?;
        validate_span("bubbles.lifetime", self.lifetime_min, self.lifetime_max)?;
        validate_span("bubbles.alpha", self.alpha_min, self.alpha_max)?;
        validate_span("bubbles.z", self.z_min, self.z_max)?;
        validate_span("bubbles.rise", self.rise_min, self.rise_max)?;
        validate_span("bubbles.scale", self.perspective.min_scale, self.perspective.max_scale)?;
        SkyglassError::check_range("bubbles.lifetime_min", self.lifetime_min as f64, 0.01, 1.0e4)?;
        SkyglassError::check_range("bubbles.near_plane", self.perspective.near_plane as f64, 1.0e-3, 1.0e3)?;
        SkyglassError::check_range("bubbles.growth_duration", self.growth.duration as f64, 0.0, 1.0e3)?;
        for (axis, drag) in ["x", "y", "z"].iter().zip(self.drag.to_array()) {
            SkyglassError::check_range(&format!("bubbles.drag.{axis}"), drag as f64, 0.0, 1.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleUniforms {
    pub time: f32,
    /// Glow pulse in [0.6, 1.0]
    pub pulse: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BubbleParams {
    pub initial_y: f32,
}

pub struct BubbleEmitter {
    config: BubbleConfig,
    core: EmitterCore<BubbleParams>,
    uniforms: BubbleUniforms,
}

impl BubbleEmitter {
    pub fn new(config: BubbleConfig, rng: ParticleRng) -> Self {
        Self {
            core: EmitterCore::new(config.capacity, 0, config.spawn.clone(), rng),
            config,
            uniforms: BubbleUniforms {
                time: 0.0,
                pulse: 1.0,
            },
        }
    }

    pub fn config(&self) -> &BubbleConfig {
        &self.config
    }

    pub fn instances(&self) -> &[InstanceRecord] {
        self.core.instance_records()
    }

    fn spawn_bubble(&mut self) {
        let config = &self.config;
        self.core.spawn_with(|p, rng| {
            let y = config.ground_y + rng.range(0.0, config.ground_band);
            p.position = Vec3::new(
                rng.signed(config.spawn_width),
                y,
                rng.range(config.z_min, config.z_max),
            );
            p.velocity = Vec3::new(
                rng.signed(config.velocity_x),
                rng.range(config.rise_min, config.rise_max),
                rng.signed(config.velocity_z),
            );
            p.lifetime = rng.range(config.lifetime_min, config.lifetime_max);
            p.scale = config.growth.min_size;
            p.target_scale = config.perspective.diameter_for_depth(p.position.z);
            p.target_opacity = rng.range(config.alpha_min, config.alpha_max);
            p.color = rng.pick(config.palette.colors()).copied().unwrap_or(Rgb::WHITE);
            p.params.initial_y = y;
        });
    }
}

/// Bubbles stay in a shallow band around their spawn height
fn out_of_bounds(config: &BubbleConfig, position: Vec3, initial_y: f32) -> bool {
    position.y > initial_y + config.rise_limit
        || position.y < initial_y - config.sink_limit
        || position.x.abs() > config.x_limit
}

impl Emitter for BubbleEmitter {
    fn name(&self) -> &str {
        "bubbles"
    }

    fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        self.core.allocate();
        log::info!("[bubbles] ready with {} slots", self.config.capacity);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.core.is_allocated()
    }

    fn update(&mut self, time: FrameTime) {
        if !self.core.is_allocated() {
            log::trace!("[bubbles] update skipped, buffers not allocated");
            return;
        }
        let dt = time.delta;
        let t = time.elapsed as f32;
        self.uniforms = BubbleUniforms {
            time: t,
            pulse: 0.8 + 0.2 * (t * self.config.pulse_speed).sin(),
        };

        for _ in 0..self.core.poll_spawns(time) {
            self.spawn_bubble();
        }

        for index in 0..self.core.pool.capacity() {
            let Some(p) = self.core.pool.get_mut(index) else {
                continue;
            };
            if !p.active {
                continue;
            }

            p.age += dt;
            p.position += p.velocity * self.config.drift * dt;
            apply_axis_drag(&mut p.velocity, self.config.drag);
            p.target_scale = self.config.perspective.diameter_for_depth(p.position.z);

            if out_of_bounds(&self.config, p.position, p.params.initial_y) || p.is_expired() {
                self.core.retire(index);
                continue;
            }

            step_growth(p, &self.config.lifecycle, &self.config.growth);
        }

        if let Some(buffer) = self.core.instances.as_mut() {
            buffer.sync_from(&self.core.pool, |p| {
                InstanceRecord::from_particle(p, p.scale, p.color, 1.0)
            });
        }
        self.core.report_status("bubbles", time.elapsed);
    }

    fn active_count(&self) -> usize {
        self.core.pool.active_count()
    }

    fn capacity(&self) -> usize {
        self.core.pool.capacity()
    }

    fn stats(&self) -> EmitterStats {
        self.core.stats()
    }

    fn draw_batches(&self) -> Vec<DrawBatch<'_>> {
        if !self.is_initialized() {
            return Vec::new();
        }
        vec![DrawBatch {
            emitter: self.name(),
            layer: "discs",
            blend_mode: ParticleBlendMode::Additive,
            primitive: Primitive::Sprites,
            data: DrawData::Instances(self.core.instance_records()),
            uniforms: Uniforms::Bubble(self.uniforms),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Phase;

    fn run(emitter: &mut BubbleEmitter, frames: usize, mut check: impl FnMut(&BubbleEmitter)) {
        let dt = 1.0 / 60.0;
        for frame in 1..=frames {
            emitter.update(FrameTime::new(dt, frame as f64 * dt as f64));
            check(emitter);
        }
    }

    #[test]
    fn bubbles_stay_in_their_band_and_under_capacity() {
        let mut emitter = BubbleEmitter::new(BubbleConfig::default(), ParticleRng::new(31));
        emitter.initialize().unwrap();
        run(&mut emitter, 1800, |e| {
            assert!(e.active_count() <= 20);
            assert_eq!(e.active_count(), e.core.pool.count_active_slots());
            for (_, p) in e.core.pool.iter_active() {
                assert!(p.position.y <= p.params.initial_y + 2.0);
                assert!(p.position.y >= p.params.initial_y - 1.0);
                assert!(p.position.x.abs() <= 15.0);
            }
        });
        let stats = emitter.stats();
        assert!(stats.spawned > 50, "spawned {}", stats.spawned);
        assert!(stats.retired > 0);
    }

    #[test]
    fn growth_reaches_perspective_target_on_schedule() {
        let config = BubbleConfig {
            capacity: 1,
            spawn: SpawnConfig {
                mode: SpawnMode::Interval,
                rate: 100.0,
                ..Default::default()
            },
            lifetime_min: 5.0,
            lifetime_max: 5.0,
            velocity_x: 0.0,
            velocity_z: 0.0,
            rise_min: 0.0,
            rise_max: 0.0,
            ..Default::default()
        };
        let mut emitter = BubbleEmitter::new(config, ParticleRng::new(4));
        emitter.initialize().unwrap();

        let mut opacity_at_growth_end = None;
        run(&mut emitter, 90, |e| {
            let p = &e.core.pool.slots()[0];
            if p.active && (p.age - 1.0).abs() < 0.009 {
                opacity_at_growth_end = Some((p.opacity, p.target_opacity));
            }
        });

        let p = &emitter.core.pool.slots()[0];
        assert!(p.active);
        assert_eq!(p.phase, Phase::Stable);
        let expected = emitter.config().perspective.diameter_for_depth(p.position.z);
        assert!((p.scale - expected).abs() < 1e-4);
        // Opacity ramps over 1.5x the growth duration
        let (opacity, target) = opacity_at_growth_end.unwrap();
        assert!((opacity - target / 1.5).abs() < 0.02);
    }

    #[test]
    fn nearer_bubbles_are_larger_but_capped() {
        let config = BubbleConfig::default();
        let near = config.perspective.diameter_for_depth(-0.5);
        let far = config.perspective.diameter_for_depth(-5.5);
        assert!(near > far);
        let cap = config.perspective.viewport_height * config.perspective.max_height_ratio;
        assert!(near <= cap + 1e-5);
    }

    #[test]
    fn pulse_uniform_oscillates() {
        let mut emitter = BubbleEmitter::new(BubbleConfig::default(), ParticleRng::new(4));
        emitter.initialize().unwrap();
        emitter.update(FrameTime::new(0.016, std::f64::consts::FRAC_PI_4));
        match emitter.draw_batches()[0].uniforms {
            Uniforms::Bubble(u) => assert!((u.pulse - 1.0).abs() < 1e-4),
            other => panic!("unexpected uniforms {other:?}"),
        }
    }

    #[test]
    fn z_range_must_be_ordered() {
        let config = BubbleConfig {
            z_min: 1.0,
            z_max: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
