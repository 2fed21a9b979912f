//! Short-lived flashes left where a meteor burns up

use crate::buffers::{InstanceBuffer, InstanceRecord};
use crate::config::{read_color, read_f32, read_usize};
use crate::particle::{ParticlePool, Phase};
use glam::Vec3;
use skyglass_core::{Result, Rgb, SkyglassError};

#[derive(Debug, Clone, PartialEq)]
pub struct FlashConfig {
    pub capacity: usize,
    pub lifetime: f32,
    pub size: f32,
    /// Scale reached at the end of life is `1 + growth`
    pub growth: f32,
    pub color: Rgb,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            capacity: 25,
            lifetime: 0.2,
            size: 0.5,
            growth: 3.0,
            color: Rgb::WHITE,
        }
    }
}

impl FlashConfig {
    /// Reads `flash_*` keys from the meteor table
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();
        read_usize(table, "flash_capacity", &mut config.capacity);
        read_f32(table, "flash_lifetime", &mut config.lifetime);
        read_f32(table, "flash_size", &mut config.size);
        read_f32(table, "flash_growth", &mut config.growth);
        read_color(table, "flash_color", &mut config.color);
        config
    }

    pub fn validate(&self) -> Result<()> {
        crate::config::validate_capacity("meteors.flash", self.capacity)?;
        SkyglassError::check_range("meteors.flash_lifetime", self.lifetime as f64, 0.01, 10.0)?;
        Ok(())
    }
}

/// Pool of disintegration flashes. Each grows `1 + growth * p` and fades `1 - p`.
pub struct FlashPool {
    config: FlashConfig,
    pool: ParticlePool<()>,
    buffer: InstanceBuffer,
    triggered: u64,
}

impl FlashPool {
    pub fn new(config: FlashConfig) -> Self {
        Self {
            pool: ParticlePool::new(config.capacity, 0),
            buffer: InstanceBuffer::new(config.capacity),
            config,
            triggered: 0,
        }
    }

    /// Start a flash at `position`; false when every flash slot is busy
    pub fn trigger(&mut self, position: Vec3) -> bool {
        let config = &self.config;
        let started = self.pool.try_spawn(|p| {
            p.position = position;
            p.lifetime = config.lifetime;
            p.scale = config.size;
            p.opacity = 1.0;
            p.color = config.color;
        });
        if started {
            self.triggered += 1;
        }
        started
    }

    pub fn update(&mut self, dt: f32) {
        let config = &self.config;
        for index in 0..self.pool.capacity() {
            let Some(p) = self.pool.get_mut(index) else {
                continue;
            };
            if !p.active {
                continue;
            }
            p.age += dt;
            if p.is_expired() {
                self.pool.retire(index);
                continue;
            }
            // A flash's whole visible life is its fade
            p.enter(Phase::Fading);
            let progress = p.age_ratio();
            p.scale = config.size * (1.0 + config.growth * progress);
            p.opacity = 1.0 - progress;
        }

        self.buffer.sync_from(&self.pool, |p| {
            InstanceRecord::from_particle(p, p.scale, p.color, 1.0)
        });
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn triggered(&self) -> u64 {
        self.triggered
    }

    pub fn records(&self) -> &[InstanceRecord] {
        self.buffer.records()
    }
}
