//! Meteors: fast streaks that heat up as they fall and burn up above the skyline

use super::flash::{FlashConfig, FlashPool};
use super::{DrawBatch, DrawData, Emitter, EmitterCore, EmitterStats, ParticleBlendMode, Primitive, Uniforms};
use crate::buffers::{InstanceRecord, TrailBuffer};
use crate::config::{
    read_bool, read_color, read_f32, read_lifecycle, read_palette, read_spawn, read_usize,
    validate_capacity, validate_lifecycle, validate_span, validate_spawn,
};
use crate::kinematics::{
    altitude, apply_drag, heat_intensity, integrate, spawn_trail_length, trail_length_at,
};
use crate::lifecycle::{step_smoothed, LifecycleProfile};
use crate::particle::Particle;
use crate::rand::ParticleRng;
use crate::spawn::SpawnConfig;
use glam::Vec3;
use skyglass_core::{FrameTime, Palette, Result, Rgb, SkyglassError};

pub const METEOR_PALETTE: [u32; 6] = [0xffffff, 0xffee88, 0xff8844, 0xff4422, 0x8844ff, 0x44ff88];

#[derive(Debug, Clone, PartialEq)]
pub struct MeteorConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub spawn: SpawnConfig,
    /// Entry angle in degrees; negative is downward
    pub entry_angle: f32,
    /// Full width of the entry angle jitter, in degrees
    pub angle_variation: f32,
    pub speed: f32,
    /// Full width of the speed jitter
    pub speed_variation: f32,
    /// Spawn height and the altitude reference for heating
    pub sky_height: f32,
    /// Extra random height added on top of `sky_height`
    pub sky_height_jitter: f32,
    pub spawn_radius: f32,
    /// Full width of the sideways velocity jitter
    pub lateral_drift: f32,
    /// Meteors burn up at or below this height
    pub disintegration_height: f32,
    pub size: f32,
    pub size_factor_min: f32,
    pub size_factor_max: f32,
    pub intensity_min: f32,
    pub intensity_max: f32,
    pub lifetime_min: f32,
    pub lifetime_max: f32,
    pub drag_min: f32,
    pub drag_max: f32,
    /// Points kept in each trail history
    pub trail_points: usize,
    /// Base trail length; the visible share shrinks with altitude
    pub trail_length: f32,
    pub palette: Palette,
    pub hot_color: Rgb,
    /// How strongly intensity pulls the color toward `hot_color`
    pub heat_blend: f32,
    pub lifecycle: LifecycleProfile,
    pub flash: FlashConfig,
}

impl Default for MeteorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 25,
            spawn: SpawnConfig {
                rate: 2.0,
                burst_chance: 0.1,
                burst_min: 2,
                burst_max: 5,
                burst_stagger: 0.1,
                ..Default::default()
            },
            entry_angle: -20.0,
            angle_variation: 6.0,
            speed: 25.0,
            speed_variation: 10.0,
            sky_height: 25.0,
            sky_height_jitter: 5.0,
            spawn_radius: 25.0,
            lateral_drift: 2.0,
            disintegration_height: 8.0,
            size: 0.15,
            size_factor_min: 0.5,
            size_factor_max: 2.0,
            intensity_min: 0.8,
            intensity_max: 1.2,
            lifetime_min: 3.0,
            lifetime_max: 5.0,
            drag_min: 0.995,
            drag_max: 0.999,
            trail_points: 15,
            trail_length: 120.0,
            palette: Palette::from_hex(&METEOR_PALETTE),
            hot_color: Rgb::WHITE,
            heat_blend: 0.4,
            lifecycle: LifecycleProfile::default(),
            flash: FlashConfig::default(),
        }
    }
}

impl MeteorConfig {
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        read_bool(table, "enabled", &mut config.enabled);
        read_usize(table, "capacity", &mut config.capacity);
        read_spawn(table, &mut config.spawn);
        read_f32(table, "entry_angle", &mut config.entry_angle);
        read_f32(table, "angle_variation", &mut config.angle_variation);
        read_f32(table, "speed", &mut config.speed);
        read_f32(table, "speed_variation", &mut config.speed_variation);
        read_f32(table, "sky_height", &mut config.sky_height);
        read_f32(table, "sky_height_jitter", &mut config.sky_height_jitter);
        read_f32(table, "spawn_radius", &mut config.spawn_radius);
        read_f32(table, "lateral_drift", &mut config.lateral_drift);
        read_f32(table, "disintegration_height", &mut config.disintegration_height);
        read_f32(table, "size", &mut config.size);
        read_f32(table, "size_factor_min", &mut config.size_factor_min);
        read_f32(table, "size_factor_max", &mut config.size_factor_max);
        read_f32(table, "intensity_min", &mut config.intensity_min);
        read_f32(table, "intensity_max", &mut config.intensity_max);
        read_f32(table, "lifetime_min", &mut config.lifetime_min);
        read_f32(table, "lifetime_max", &mut config.lifetime_max);
        read_f32(table, "drag_min", &mut config.drag_min);
        read_f32(table, "drag_max", &mut config.drag_max);
        read_usize(table, "trail_points", &mut config.trail_points);
        read_f32(table, "trail_length", &mut config.trail_length);
        read_palette(table, "colors", &mut config.palette);
        read_color(table, "hot_color", &mut config.hot_color);
        read_f32(table, "heat_blend", &mut config.heat_blend);
        read_lifecycle(table, &mut config.lifecycle);
        config.flash = FlashConfig::from_toml(table);
        config
    }

    pub fn validate(&self) -> Result<()> {
        validate_capacity("meteors", self.capacity)?;
        validate_spawn("meteors", &self.spawn)?;
        validate_lifecycle("meteors", &self.lifecycle)?;
        validate_span("meteors.lifetime", self.lifetime_min, self.lifetime_max)?;
        validate_span("meteors.intensity", self.intensity_min, self.intensity_max)?;
        validate_span("meteors.size_factor", self.size_factor_min, self.size_factor_max)?;
        validate_span("meteors.drag", self.drag_min, self.drag_max)?;
        SkyglassError::check_range("meteors.lifetime_min", self.lifetime_min as f64, 0.01, 1.0e4)?;
        SkyglassError::check_range("meteors.drag_min", self.drag_min as f64, 0.0, 1.0)?;
        SkyglassError::check_range("meteors.drag_max", self.drag_max as f64, 0.0, 1.0)?;
        SkyglassError::check_range("meteors.trail_points", self.trail_points as f64, 2.0, 256.0)?;
        if self.sky_height <= self.disintegration_height {
            return Err(SkyglassError::invalid(
                "meteors.disintegration_height",
                "must be below sky_height",
            ));
        }
        self.flash.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeteorUniforms {
    pub time: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeteorParams {
    pub drag: f32,
    pub intensity: f32,
    pub heating_factor: f32,
    pub trail_length: f32,
}

pub struct MeteorEmitter {
    config: MeteorConfig,
    core: EmitterCore<MeteorParams>,
    trails: Option<TrailBuffer>,
    flashes: FlashPool,
    uniforms: MeteorUniforms,
    disintegrated: u64,
}

impl MeteorEmitter {
    pub fn new(config: MeteorConfig, rng: ParticleRng) -> Self {
        Self {
            core: EmitterCore::new(config.capacity, config.trail_points, config.spawn.clone(), rng),
            flashes: FlashPool::new(config.flash.clone()),
            config,
            trails: None,
            uniforms: MeteorUniforms { time: 0.0 },
            disintegrated: 0,
        }
    }

    pub fn config(&self) -> &MeteorConfig {
        &self.config
    }

    pub fn instances(&self) -> &[InstanceRecord] {
        self.core.instance_records()
    }

    pub fn trails(&self) -> Option<&TrailBuffer> {
        self.trails.as_ref()
    }

    pub fn flashes(&self) -> &FlashPool {
        &self.flashes
    }

    /// Meteors that burned up at the disintegration height
    pub fn disintegrated(&self) -> u64 {
        self.disintegrated
    }

    fn spawn_meteor(&mut self) {
        let config = &self.config;
        let spawned = self.core.spawn_with(|p, rng| {
            let angle = rng.angle();
            p.position = Vec3::new(
                angle.cos() * config.spawn_radius,
                config.sky_height + rng.next_f32() * config.sky_height_jitter,
                angle.sin() * config.spawn_radius,
            );

            let entry = (config.entry_angle + rng.signed(config.angle_variation)).to_radians();
            let speed = config.speed + rng.signed(config.speed_variation);
            p.velocity = Vec3::new(
                rng.signed(config.lateral_drift),
                entry.sin() * speed,
                entry.cos() * speed,
            );

            p.lifetime = rng.range(config.lifetime_min, config.lifetime_max);
            p.target_scale = config.size * rng.range(config.size_factor_min, config.size_factor_max);
            p.target_opacity = 1.0;
            p.color = rng.pick(config.palette.colors()).copied().unwrap_or(Rgb::WHITE);

            let alt = altitude(p.position.y, config.sky_height);
            p.params = MeteorParams {
                drag: rng.range(config.drag_min, config.drag_max),
                intensity: rng.range(config.intensity_min, config.intensity_max),
                heating_factor: 1.0 + alt * 0.5,
                trail_length: spawn_trail_length(config.trail_length, alt),
            };
            p.trail.record(p.position, 0.0);
        });
        if let Some(index) = spawned {
            log::debug!("[meteors] spawned meteor in slot {index}");
        }
    }

    /// Palette color pulled toward the hot color as the meteor heats up
    fn heated_color(&self, p: &Particle<MeteorParams>) -> Rgb {
        let t = (p.params.intensity * p.params.heating_factor * self.config.heat_blend).min(1.0);
        p.color.lerp(self.config.hot_color, t)
    }

    /// Number of trail points drawn at the current trail length
    fn visible_trail_points(&self, trail_length: f32) -> usize {
        let n = self.config.trail_points;
        let full = self.config.trail_length * 1.5;
        if full <= 0.0 {
            return n;
        }
        let share = (trail_length / full).clamp(0.0, 1.0);
        ((share * n as f32).ceil() as usize).clamp(2, n)
    }
}

impl Emitter for MeteorEmitter {
    fn name(&self) -> &str {
        "meteors"
    }

    fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        self.core.allocate();
        if self.trails.is_none() {
            self.trails = Some(TrailBuffer::new(self.config.capacity, self.config.trail_points));
        }
        log::info!(
            "[meteors] ready with {} slots x {} trail points",
            self.config.capacity,
            self.config.trail_points
        );
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.core.is_allocated() && self.trails.is_some()
    }

    fn update(&mut self, time: FrameTime) {
        if !self.is_initialized() {
            log::trace!("[meteors] update skipped, buffers not allocated");
            return;
        }
        let dt = time.delta;
        self.uniforms.time = time.elapsed as f32;

        for _ in 0..self.core.poll_spawns(time) {
            self.spawn_meteor();
        }

        for index in 0..self.core.pool.capacity() {
            let Some(p) = self.core.pool.get_mut(index) else {
                continue;
            };
            if !p.active {
                continue;
            }

            p.age += dt;
            apply_drag(&mut p.velocity, p.params.drag);
            integrate(&mut p.position, p.velocity, dt);
            let alt = altitude(p.position.y, self.config.sky_height);
            p.params.intensity = heat_intensity(p.params.intensity, alt, dt);
            p.params.trail_length = trail_length_at(self.config.trail_length, alt);

            if p.position.y <= self.config.disintegration_height {
                let at = p.position;
                self.flashes.trigger(at);
                self.core.retire(index);
                self.disintegrated += 1;
                log::debug!("[meteors] slot {index} disintegrated at y={:.2}", at.y);
                continue;
            }
            if p.is_expired() {
                self.core.retire(index);
                continue;
            }

            p.trail.record(p.position, p.age);
            step_smoothed(p, &self.config.lifecycle, dt);
        }

        self.flashes.update(dt);

        if let Some(mut buffer) = self.core.instances.take() {
            buffer.sync_from(&self.core.pool, |p| {
                InstanceRecord::from_particle(p, p.scale, self.heated_color(p), p.params.intensity)
            });
            self.core.instances = Some(buffer);
        }
        if let Some(mut trails) = self.trails.take() {
            for (index, p) in self.core.pool.slots().iter().enumerate() {
                if p.active {
                    let visible = self.visible_trail_points(p.params.trail_length);
                    trails.write_trail_limited(index, &p.trail, visible, p.color, p.params.intensity * 0.8);
                } else {
                    trails.clear_trail(index);
                }
            }
            self.trails = Some(trails);
        }
        self.core.report_status("meteors", time.elapsed);
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
        let uniforms = Uniforms::Meteor(self.uniforms);
        vec![
            DrawBatch {
                emitter: self.name(),
                layer: "trails",
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
            DrawBatch {
                emitter: self.name(),
                layer: "flash",
                blend_mode: ParticleBlendMode::Additive,
                primitive: Primitive::Sprites,
                data: DrawData::Instances(self.flashes.records()),
                uniforms,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Phase;

    fn ready(config: MeteorConfig, seed: u64) -> MeteorEmitter {
        let mut emitter = MeteorEmitter::new(config, ParticleRng::new(seed));
        emitter.initialize().unwrap();
        emitter
    }

    fn step(emitter: &mut MeteorEmitter, frame: usize) {
        let dt = 1.0 / 60.0;
        emitter.update(FrameTime::new(dt, frame as f64 * dt as f64));
    }

    #[test]
    fn spawned_meteor_starts_with_full_trail_length() {
        let config = MeteorConfig::default();
        let mut emitter = ready(config.clone(), 5);
        emitter.spawn_meteor();

        let (_, p) = emitter.core.pool.iter_active().next().unwrap();
        let alt = altitude(p.position.y, config.sky_height);
        let expected = spawn_trail_length(config.trail_length, alt);
        assert!((p.params.trail_length - expected).abs() < 1e-4);
        assert!(p.params.trail_length > trail_length_at(config.trail_length, alt));
    }

    #[test]
    fn meteors_never_stay_active_below_disintegration_height() {
        let mut emitter = ready(MeteorConfig::default(), 21);
        for frame in 1..=1200 {
            step(&mut emitter, frame);
            for (_, p) in emitter.core.pool.iter_active() {
                assert!(p.position.y > 8.0, "meteor active at y = {}", p.position.y);
            }
            assert_eq!(emitter.active_count(), emitter.core.pool.count_active_slots());
        }
        assert!(emitter.disintegrated() > 0);
        assert!(emitter.flashes().triggered() > 0);
    }

    #[test]
    fn single_meteor_burns_up_before_expiring() {
        let config = MeteorConfig {
            capacity: 1,
            spawn: SpawnConfig {
                rate: 0.5,
                ..Default::default()
            },
            angle_variation: 0.0,
            speed_variation: 0.0,
            lateral_drift: 0.0,
            sky_height_jitter: 0.0,
            lifetime_min: 10.0,
            lifetime_max: 10.0,
            ..Default::default()
        };
        let mut emitter = ready(config, 5);

        let mut lowest = f32::MAX;
        let mut frame = 1;
        while emitter.disintegrated() == 0 && frame < 600 {
            step(&mut emitter, frame);
            if let Some(p) = emitter.core.pool.get(0).filter(|p| p.active) {
                assert!(p.position.y <= 25.0 + 1e-3);
                lowest = lowest.min(p.position.y);
            }
            frame += 1;
        }
        assert_eq!(emitter.disintegrated(), 1);
        assert!(lowest > 8.0);
        // Retired slot is zeroed and its trail cleared
        let slot = &emitter.core.pool.slots()[0];
        assert!(!slot.active);
        assert_eq!(slot.phase, Phase::Retired);
        assert!(slot.trail.is_empty());
        assert_eq!(emitter.instances()[0], InstanceRecord::HIDDEN);
        let trails = emitter.trails().unwrap();
        assert!(trails.slot_vertices(0).iter().all(|v| v.alpha == 0.0));
        // Flash is visible in the same frame
        assert_eq!(emitter.flashes().active_count(), 1);
    }

    #[test]
    fn heating_brightens_as_meteors_descend() {
        let config = MeteorConfig {
            capacity: 1,
            intensity_min: 1.0,
            intensity_max: 1.0,
            sky_height_jitter: 0.0,
            lifetime_min: 10.0,
            lifetime_max: 10.0,
            ..Default::default()
        };
        let mut emitter = ready(config, 8);
        let mut previous = 0.0;
        for frame in 1..=120 {
            step(&mut emitter, frame);
            if let Some(p) = emitter.core.pool.get(0).filter(|p| p.active) {
                assert!(p.params.intensity >= previous);
                assert!(p.params.intensity <= 2.0);
                previous = p.params.intensity;
            }
        }
        assert!(previous > 1.0);
    }

    #[test]
    fn trail_history_is_bounded() {
        let config = MeteorConfig {
            trail_points: 5,
            lifetime_min: 10.0,
            lifetime_max: 10.0,
            ..Default::default()
        };
        let mut emitter = ready(config, 13);
        for frame in 1..=600 {
            step(&mut emitter, frame);
            for (_, p) in emitter.core.pool.iter_active() {
                assert!(p.trail.len() <= 5);
            }
        }
        let trails = emitter.trails().unwrap();
        assert_eq!(trails.vertices().len(), 25 * 4 * 2);
    }

    #[test]
    fn visible_trail_shrinks_with_altitude() {
        let emitter = ready(MeteorConfig::default(), 1);
        let high = emitter.visible_trail_points(trail_length_at(120.0, 1.0));
        let low = emitter.visible_trail_points(trail_length_at(120.0, 0.32));
        assert_eq!(high, 15);
        assert!(low < high);
        assert!(low >= 2);
    }

    #[test]
    fn batches_in_draw_order() {
        let mut emitter = MeteorEmitter::new(MeteorConfig::default(), ParticleRng::new(1));
        assert!(emitter.draw_batches().is_empty());
        emitter.initialize().unwrap();
        let layers: Vec<_> = emitter.draw_batches().iter().map(|b| b.layer).collect();
        assert_eq!(layers, ["trails", "heads", "flash"]);
    }

    #[test]
    fn disintegration_height_must_be_below_sky() {
        let config = MeteorConfig {
            disintegration_height: 30.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
