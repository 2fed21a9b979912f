//! Shooting stars streaking from a sky box toward a vanishing point
//!
//! Stars do not use the age-driven fade. Each tick their `life` decays by a
//! constant factor and the drawn alpha is that life scaled by distance from
//! the origin.

use super::{DrawBatch, DrawData, Emitter, EmitterCore, EmitterStats, ParticleBlendMode, Primitive, Uniforms};
use crate::buffers::{InstanceRecord, TrailBuffer};
use crate::config::{
    read_bool, read_color, read_f32, read_spawn, read_usize, read_vec3, validate_capacity,
    validate_span, validate_spawn,
};
use crate::kinematics::integrate;
use crate::particle::Phase;
use crate::rand::ParticleRng;
use crate::spawn::SpawnConfig;
use glam::Vec3;
use skyglass_core::{FrameTime, Result, Rgb, SkyglassError};

/// Points per star trail: previous and current position
const STAR_TRAIL_POINTS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ShootingStarConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub spawn: SpawnConfig,
    pub spawn_width: f32,
    pub spawn_height: f32,
    pub spawn_min_y: f32,
    /// Stars start between `-z_range` and 0
    pub z_range: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    /// Per-tick life multiplier
    pub fade_rate: f32,
    /// Distance from the origin at which alpha reaches zero
    pub max_distance: f32,
    pub vanishing_point: Vec3,
    /// Stars retire once this far past the vanishing plane
    pub retire_margin: f32,
    pub min_alpha: f32,
    /// Hard age cap in seconds
    pub max_lifetime: f32,
    /// Life below which a star counts as fading
    pub fade_life: f32,
    pub size: f32,
    pub color: Rgb,
}

impl Default for ShootingStarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 100,
            spawn: SpawnConfig {
                rate: 30.0,
                ..Default::default()
            },
            spawn_width: 100.0,
            spawn_height: 20.0,
            spawn_min_y: 10.0,
            z_range: 50.0,
            speed_min: 30.0,
            speed_max: 90.0,
            fade_rate: 0.98,
            max_distance: 100.0,
            vanishing_point: Vec3::new(0.0, 15.0, 20.0),
            retire_margin: 5.0,
            min_alpha: 0.01,
            max_lifetime: 10.0,
            fade_life: 0.5,
            size: 2.0,
            color: Rgb::WHITE,
        }
    }
}

impl ShootingStarConfig {
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        read_bool(table, "enabled", &mut config.enabled);
        read_usize(table, "capacity", &mut config.capacity);
        read_spawn(table, &mut config.spawn);
        read_f32(table, "spawn_width", &mut config.spawn_width);
        read_f32(table, "spawn_height", &mut config.spawn_height);
        read_f32(table, "spawn_min_y", &mut config.spawn_min_y);
        read_f32(table, "z_range", &mut config.z_range);
        read_f32(table, "speed_min", &mut config.speed_min);
        read_f32(table, "speed_max", &mut config.speed_max);
        read_f32(table, "fade_rate", &mut config.fade_rate);
        read_f32(table, "max_distance", &mut config.max_distance);
        read_vec3(table, "vanishing_point", &mut config.vanishing_point);
        read_f32(table, "retire_margin", &mut config.retire_margin);
        read_f32(table, "min_alpha", &mut config.min_alpha);
        read_f32(table, "max_lifetime", &mut config.max_lifetime);
        read_f32(table, "fade_life", &mut config.fade_life);
        read_f32(table, "size", &mut config.size);
        read_color(table, "color", &mut config.color);
        config
    }

    pub fn validate(&self) -> Result<()> {
        validate_capacity("shooting_stars", self.capacity)?;
        validate_spawn("shooting_stars", &self.spawn)?;
        validate_span("shooting_stars.speed", self.speed_min, self.speed_max)?;
        SkyglassError::check_range("shooting_stars.fade_rate", self.fade_rate as f64, 0.0, 1.0)?;
        SkyglassError::check_range("shooting_stars.max_distance", self.max_distance as f64, 0.01, 1.0e6)?;
        SkyglassError::check_range("shooting_stars.max_lifetime", self.max_lifetime as f64, 0.01, 1.0e4)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShootingStarUniforms {
    pub time: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StarParams {
    pub life: f32,
}

/// Alpha of a star at `position` with the given remaining life
pub fn star_alpha(life: f32, position: Vec3, max_distance: f32) -> f32 {
    life * (1.0 - position.length() / max_distance).max(0.0)
}

pub struct ShootingStarEmitter {
    config: ShootingStarConfig,
    core: EmitterCore<StarParams>,
    trails: Option<TrailBuffer>,
    uniforms: ShootingStarUniforms,
}

impl ShootingStarEmitter {
    pub fn new(config: ShootingStarConfig, rng: ParticleRng) -> Self {
        Self {
            core: EmitterCore::new(config.capacity, STAR_TRAIL_POINTS, config.spawn.clone(), rng),
            config,
            trails: None,
            uniforms: ShootingStarUniforms { time: 0.0 },
        }
    }

    pub fn config(&self) -> &ShootingStarConfig {
        &self.config
    }

    pub fn instances(&self) -> &[InstanceRecord] {
        self.core.instance_records()
    }

    pub fn trails(&self) -> Option<&TrailBuffer> {
        self.trails.as_ref()
    }

    fn spawn_star(&mut self) {
        let config = &self.config;
        self.core.spawn_with(|p, rng| {
            let start = Vec3::new(
                rng.signed(config.spawn_width),
                config.spawn_min_y + rng.next_f32() * config.spawn_height,
                -rng.next_f32() * config.z_range,
            );
            let direction = (config.vanishing_point - start).normalize_or_zero();
            p.position = start;
            p.velocity = direction * rng.range(config.speed_min, config.speed_max);
            p.lifetime = config.max_lifetime;
            p.scale = config.size;
            p.target_scale = config.size;
            p.color = config.color;
            p.params.life = 1.0;
            p.opacity = star_alpha(1.0, start, config.max_distance);
            p.target_opacity = p.opacity;
            p.trail.record(start, 0.0);
        });
    }
}

impl Emitter for ShootingStarEmitter {
    fn name(&self) -> &str {
        "shooting_stars"
    }

    fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        self.core.allocate();
        if self.trails.is_none() {
            self.trails = Some(TrailBuffer::new(self.config.capacity, STAR_TRAIL_POINTS));
        }
        log::info!("[shooting_stars] ready with {} slots", self.config.capacity);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.core.is_allocated() && self.trails.is_some()
    }

    fn update(&mut self, time: FrameTime) {
        if !self.is_initialized() {
            log::trace!("[shooting_stars] update skipped, buffers not allocated");
            return;
        }
        let dt = time.delta;
        self.uniforms.time = time.elapsed as f32;

        for _ in 0..self.core.poll_spawns(time) {
            self.spawn_star();
        }

        let config = &self.config;
        for index in 0..self.core.pool.capacity() {
            let Some(p) = self.core.pool.get_mut(index) else {
                continue;
            };
            if !p.active {
                continue;
            }

            p.age += dt;
            integrate(&mut p.position, p.velocity, dt);
            p.params.life *= config.fade_rate;
            p.opacity = star_alpha(p.params.life, p.position, config.max_distance);

            let past_vanishing = p.position.z > config.vanishing_point.z + config.retire_margin;
            if past_vanishing || p.opacity < config.min_alpha || p.is_expired() {
                self.core.retire(index);
                continue;
            }

            p.trail.record(p.position, p.age);
            p.enter(if p.params.life < config.fade_life {
                Phase::Fading
            } else {
                Phase::Stable
            });
        }

        if let Some(buffer) = self.core.instances.as_mut() {
            buffer.sync_from(&self.core.pool, |p| {
                InstanceRecord::from_particle(p, p.scale, p.color, p.params.life)
            });
        }
        if let Some(trails) = self.trails.as_mut() {
            for (index, p) in self.core.pool.slots().iter().enumerate() {
                if p.active {
                    trails.write_trail(index, &p.trail, p.color, p.opacity);
                } else {
                    trails.clear_trail(index);
                }
            }
        }
        self.core.report_status("shooting_stars", time.elapsed);
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
        let Some(trails) = self.trails.as_ref().filter(|_| self.core.is_allocated()) else {
            return Vec::new();
        };
        let uniforms = Uniforms::ShootingStar(self.uniforms);
        vec![
            DrawBatch {
                emitter: self.name(),
                layer: "streaks",
                blend_mode: ParticleBlendMode::Additive,
                primitive: Primitive::LineSegments,
                data: DrawData::Lines(trails.vertices()),
                uniforms,
            },
            DrawBatch {
                emitter: self.name(),
                layer: "heads",
                blend_mode: ParticleBlendMode::Additive,
                primitive: Primitive::Points,
                data: DrawData::Instances(self.core.instance_records()),
                uniforms,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(emitter: &mut ShootingStarEmitter, frames: usize, mut check: impl FnMut(&ShootingStarEmitter)) {
        let dt = 1.0 / 60.0;
        for frame in 1..=frames {
            emitter.update(FrameTime::new(dt, frame as f64 * dt as f64));
            check(emitter);
        }
    }

    #[test]
    fn alpha_falls_off_with_distance() {
        assert!((star_alpha(1.0, Vec3::ZERO, 100.0) - 1.0).abs() < 1e-6);
        assert!((star_alpha(0.5, Vec3::new(0.0, 50.0, 0.0), 100.0) - 0.25).abs() < 1e-6);
        assert_eq!(star_alpha(1.0, Vec3::new(0.0, 0.0, 150.0), 100.0), 0.0);
    }

    #[test]
    fn stars_head_for_the_vanishing_point_and_retire() {
        let mut emitter = ShootingStarEmitter::new(ShootingStarConfig::default(), ParticleRng::new(17));
        emitter.initialize().unwrap();
        let vp = emitter.config().vanishing_point;

        run(&mut emitter, 600, |e| {
            assert_eq!(e.active_count(), e.core.pool.count_active_slots());
            for (_, p) in e.core.pool.iter_active() {
                assert!(p.position.z <= vp.z + 5.0);
                assert!(p.opacity >= 0.01);
                assert!(p.trail.len() <= 2);
                if p.age < 0.02 {
                    // Fresh stars are still far from the vanishing point
                    let to_vp = (vp - p.position).normalize();
                    assert!(p.velocity.normalize().dot(to_vp) > 0.999);
                }
            }
        });

        let stats = emitter.stats();
        assert!(stats.retired > 0);
        assert!(emitter.active_count() > 10);
    }

    #[test]
    fn life_decays_once_per_tick() {
        let config = ShootingStarConfig {
            capacity: 1,
            spawn: SpawnConfig {
                rate: 100.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut emitter = ShootingStarEmitter::new(config, ParticleRng::new(2));
        emitter.initialize().unwrap();
        let mut ticks = 0;
        run(&mut emitter, 3, |e| {
            if let Some(p) = e.core.pool.get(0).filter(|p| p.active) {
                ticks += 1;
                assert!((p.params.life - 0.98f32.powi(ticks)).abs() < 1e-5);
            }
        });
        assert!(ticks > 0);
    }

    #[test]
    fn streak_runs_from_previous_to_current_position() {
        let config = ShootingStarConfig {
            capacity: 1,
            spawn: SpawnConfig {
                rate: 100.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut emitter = ShootingStarEmitter::new(config, ParticleRng::new(9));
        emitter.initialize().unwrap();
        run(&mut emitter, 2, |_| {});

        let p = &emitter.core.pool.slots()[0];
        assert!(p.active);
        let vertices = emitter.trails().unwrap().slot_vertices(0);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].position, p.position.to_array());
        // Tail is dimmer than the head
        assert!((vertices[1].alpha - vertices[0].alpha * 0.5).abs() < 1e-5);
    }

    #[test]
    fn fade_rate_above_one_is_rejected() {
        let config = ShootingStarConfig {
            fade_rate: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
