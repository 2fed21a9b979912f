//! Ground vapor: neon puffs that roll along the backdrop's ground plane

use super::{DrawBatch, DrawData, Emitter, EmitterCore, EmitterStats, ParticleBlendMode, Primitive, Uniforms};
use crate::buffers::InstanceRecord;
use crate::config::{
    read_bool, read_f32, read_lifecycle, read_palette, read_spawn, read_usize, read_vec3,
    validate_capacity, validate_lifecycle, validate_span, validate_spawn,
};
use crate::kinematics::{apply_drag, apply_wind, ground_variation, hug_ground, integrate};
use crate::lifecycle::{apply_mitosis, step_smoothed, LifecycleProfile, MitosisConfig, MitosisTimer};
use crate::particle::Phase;
use crate::rand::ParticleRng;
use crate::spawn::SpawnConfig;
use glam::Vec3;
use skyglass_core::{BackdropMapping, CoordinateMapper, FrameTime, Palette, Result, Rgb, SkyglassError};

pub const VAPOR_PALETTE: [u32; 6] = [0x00ff88, 0xff0088, 0x0088ff, 0x88ff00, 0xff8800, 0x8800ff];

#[derive(Debug, Clone, PartialEq)]
pub struct VaporConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub spawn: SpawnConfig,
    pub lifetime: f32,
    /// Full width of the lifetime jitter
    pub lifetime_variation: f32,
    pub size: f32,
    pub size_variation: f32,
    pub start_scale: f32,
    pub opacity_min: f32,
    pub opacity_max: f32,
    /// Full width of the initial horizontal velocity jitter
    pub drift: f32,
    pub palette: Palette,
    pub wind_direction: Vec3,
    pub wind_speed: f32,
    pub ground_hugging: f32,
    /// Height above ground the puffs settle at
    pub ground_offset: f32,
    /// Per-tick velocity multiplier
    pub drag: f32,
    /// Spawn disc radius on the backdrop, in pixels
    pub spawn_radius_px: f32,
    /// Depth of the spawn band below the ground line, in pixels
    pub spawn_band_px: f32,
    pub rotation_speed: f32,
    pub noise_scale: f32,
    pub morphing_speed: f32,
    pub lifecycle: LifecycleProfile,
    pub mitosis: MitosisConfig,
}

impl Default for VaporConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 15,
            spawn: SpawnConfig {
                rate: 1.0,
                ..Default::default()
            },
            lifetime: 15.0,
            lifetime_variation: 5.0,
            size: 2.0,
            size_variation: 1.0,
            start_scale: 0.1,
            opacity_min: 0.8,
            opacity_max: 1.5,
            drift: 0.1,
            palette: Palette::from_hex(&VAPOR_PALETTE),
            wind_direction: Vec3::new(0.3, 0.0, 0.15),
            wind_speed: 2.0,
            ground_hugging: 0.8,
            ground_offset: 0.2,
            drag: 0.95,
            spawn_radius_px: 800.0,
            spawn_band_px: 50.0,
            rotation_speed: 0.02,
            noise_scale: 0.02,
            morphing_speed: 2.0,
            lifecycle: LifecycleProfile::default(),
            mitosis: MitosisConfig::default(),
        }
    }
}

impl VaporConfig {
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        read_bool(table, "enabled", &mut config.enabled);
        read_usize(table, "capacity", &mut config.capacity);
        read_spawn(table, &mut config.spawn);
        read_f32(table, "lifetime", &mut config.lifetime);
        read_f32(table, "lifetime_variation", &mut config.lifetime_variation);
        read_f32(table, "size", &mut config.size);
        read_f32(table, "size_variation", &mut config.size_variation);
        read_f32(table, "start_scale", &mut config.start_scale);
        read_f32(table, "opacity_min", &mut config.opacity_min);
        read_f32(table, "opacity_max", &mut config.opacity_max);
        read_f32(table, "drift", &mut config.drift);
        read_palette(table, "colors", &mut config.palette);
        read_vec3(table, "wind_direction", &mut config.wind_direction);
        read_f32(table, "wind_speed", &mut config.wind_speed);
        read_f32(table, "ground_hugging", &mut config.ground_hugging);
        read_f32(table, "ground_offset", &mut config.ground_offset);
        read_f32(table, "drag", &mut config.drag);
        read_f32(table, "spawn_radius_px", &mut config.spawn_radius_px);
        read_f32(table, "spawn_band_px", &mut config.spawn_band_px);
        read_f32(table, "rotation_speed", &mut config.rotation_speed);
        read_f32(table, "noise_scale", &mut config.noise_scale);
        read_f32(table, "morphing_speed", &mut config.morphing_speed);
        read_lifecycle(table, &mut config.lifecycle);
        read_f32(table, "mitosis_chance", &mut config.mitosis.chance_per_second);
        read_f32(table, "mitosis_shrink", &mut config.mitosis.shrink);
        config
    }

    pub fn validate(&self) -> Result<()> {
        validate_capacity("vapor", self.capacity)?;
        validate_spawn("vapor", &self.spawn)?;
        validate_lifecycle("vapor", &self.lifecycle)?;
        SkyglassError::check_range("vapor.lifetime", self.lifetime as f64, 0.01, 1.0e4)?;
        SkyglassError::check_range("vapor.lifetime_variation", self.lifetime_variation as f64, 0.0, 1.0e4)?;
        if self.lifetime - self.lifetime_variation / 2.0 <= 0.0 {
            return Err(SkyglassError::invalid(
                "vapor.lifetime",
                "lifetime minus half its variation must stay positive",
            ));
        }
        validate_span("vapor.opacity", self.opacity_min, self.opacity_max)?;
        SkyglassError::check_range("vapor.drag", self.drag as f64, 0.0, 1.0)?;
        SkyglassError::check_range("vapor.wind_speed", self.wind_speed as f64, 0.0, 1.0e3)?;
        SkyglassError::check_range("vapor.ground_hugging", self.ground_hugging as f64, 0.0, 1.0e3)?;
        SkyglassError::check_range("vapor.mitosis_chance", self.mitosis.chance_per_second as f64, 0.0, 1.0e3)?;
        SkyglassError::check_range("vapor.mitosis_shrink", self.mitosis.shrink as f64, 0.0, 1.0)?;
        Ok(())
    }
}

/// Uniforms for the vapor shader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VaporUniforms {
    pub time: f32,
    pub wind_direction: Vec3,
    pub ground_level: f32,
    pub noise_scale: f32,
    pub morphing_speed: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VaporParams {
    pub mitosis: MitosisTimer,
}

pub struct VaporEmitter<M: CoordinateMapper = BackdropMapping> {
    config: VaporConfig,
    mapper: M,
    core: EmitterCore<VaporParams>,
    uniforms: VaporUniforms,
}

impl<M: CoordinateMapper> VaporEmitter<M> {
    pub fn new(config: VaporConfig, mapper: M, rng: ParticleRng) -> Self {
        let uniforms = VaporUniforms {
            time: 0.0,
            wind_direction: config.wind_direction,
            ground_level: mapper.ground_level(),
            noise_scale: config.noise_scale,
            morphing_speed: config.morphing_speed,
        };
        Self {
            core: EmitterCore::new(config.capacity, 0, config.spawn.clone(), rng),
            config,
            mapper,
            uniforms,
        }
    }

    pub fn config(&self) -> &VaporConfig {
        &self.config
    }

    pub fn uniforms(&self) -> &VaporUniforms {
        &self.uniforms
    }

    pub fn instances(&self) -> &[InstanceRecord] {
        self.core.instance_records()
    }

    fn spawn_vapor(&mut self) {
        let config = &self.config;
        let mapper = &self.mapper;
        let spawned = self.core.spawn_with(|p, rng| {
            let angle = rng.angle();
            let radius = rng.range(0.0, config.spawn_radius_px);
            let sx = mapper.screen_width() / 2.0 + angle.cos() * radius;
            let sy = mapper.ground_screen_y() + rng.next_f32() * config.spawn_band_px;
            let world = mapper.screen_to_world(sx, sy);

            p.position = Vec3::new(world.x, world.y.max(mapper.ground_level()), world.z);
            p.velocity = Vec3::new(rng.signed(config.drift), 0.0, rng.signed(config.drift));
            p.lifetime = config.lifetime + rng.signed(config.lifetime_variation);
            p.scale = config.start_scale;
            p.target_scale = config.size + rng.signed(config.size_variation);
            p.opacity = 0.0;
            p.target_opacity = rng.range(config.opacity_min, config.opacity_max);
            p.rotation = rng.angle();
            p.rotation_speed = rng.signed(config.rotation_speed);
            p.color = rng.pick(config.palette.colors()).copied().unwrap_or(Rgb::WHITE);
            p.params.mitosis = MitosisTimer::armed(&config.mitosis, rng);
        });
        if let Some(index) = spawned {
            log::debug!("[vapor] spawned puff in slot {index}");
        }
    }
}

impl<M: CoordinateMapper> Emitter for VaporEmitter<M> {
    fn name(&self) -> &str {
        "vapor"
    }

    fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        self.core.allocate();
        log::info!("[vapor] ready with {} slots", self.config.capacity);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.core.is_allocated()
    }

    fn update(&mut self, time: FrameTime) {
        if !self.core.is_allocated() {
            log::trace!("[vapor] update skipped, buffers not allocated");
            return;
        }
        let dt = time.delta;
        let t = time.elapsed as f32;
        self.uniforms.time = t;

        for _ in 0..self.core.poll_spawns(time) {
            self.spawn_vapor();
        }

        let ground = self.mapper.ground_level();
        for index in 0..self.core.pool.capacity() {
            let Some(p) = self.core.pool.get_mut(index) else {
                continue;
            };
            if !p.active {
                continue;
            }

            p.age += dt;
            apply_wind(&mut p.velocity, self.config.wind_direction, self.config.wind_speed, dt);
            integrate(&mut p.position, p.velocity, dt);
            let target = ground
                + self.config.ground_offset
                + ground_variation(t, p.position.x, p.position.z);
            p.position.y = hug_ground(p.position.y, target, self.config.ground_hugging, dt);
            apply_drag(&mut p.velocity, self.config.drag);
            p.rotation += p.rotation_speed * dt;

            if p.is_expired() {
                self.core.retire(index);
                continue;
            }

            let phase = step_smoothed(p, &self.config.lifecycle, dt);
            if matches!(phase, Phase::Growing | Phase::Stable)
                && p.params.mitosis.tick(&self.config.mitosis, &mut self.core.rng, dt)
            {
                apply_mitosis(p, &self.config.mitosis, &mut self.core.rng);
                log::debug!("[vapor] mitosis in slot {index}");
            }
        }

        if let Some(buffer) = self.core.instances.as_mut() {
            buffer.sync_from(&self.core.pool, |p| {
                InstanceRecord::from_particle(p, p.scale, p.color, 1.0)
            });
        }
        self.core.report_status("vapor", time.elapsed);
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
            layer: "puffs",
            blend_mode: ParticleBlendMode::Additive,
            primitive: Primitive::Sprites,
            data: DrawData::Instances(self.core.instance_records()),
            uniforms: Uniforms::Vapor(self.uniforms),
        }]
    }
}
