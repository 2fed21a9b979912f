//! Emitter types and the shared machinery every emitter runs on

pub mod bubble;
pub mod flash;
pub mod meteor;
pub mod shooting_star;
pub mod vapor;

use crate::buffers::{InstanceBuffer, InstanceRecord, TrailVertex};
use crate::particle::{Particle, ParticlePool};
use crate::rand::ParticleRng;
use crate::spawn::{SpawnConfig, SpawnPolicy};
use skyglass_core::{FrameTime, Result};

pub use bubble::{BubbleConfig, BubbleEmitter, BubbleUniforms};
pub use flash::{FlashConfig, FlashPool};
pub use meteor::{MeteorConfig, MeteorEmitter, MeteorUniforms};
pub use shooting_star::{ShootingStarConfig, ShootingStarEmitter, ShootingStarUniforms};
pub use vapor::{VaporConfig, VaporEmitter, VaporUniforms};

/// Seconds between periodic status lines
const STATUS_INTERVAL: f64 = 5.0;

/// Blend mode for particle rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleBlendMode {
    Alpha,
    Additive,
}

/// How the renderer should interpret a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Camera-facing quads, one per instance
    Sprites,
    /// Point sprites, one per instance
    Points,
    /// Vertex pairs forming independent line segments
    LineSegments,
}

/// Buffer contents of one draw batch
#[derive(Debug, Clone, Copy)]
pub enum DrawData<'a> {
    Instances(&'a [InstanceRecord]),
    Lines(&'a [TrailVertex]),
}

impl DrawData<'_> {
    /// Number of records (instances or vertices)
    pub fn len(&self) -> usize {
        match self {
            DrawData::Instances(records) => records.len(),
            DrawData::Lines(vertices) => vertices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            DrawData::Instances(records) => bytemuck::cast_slice(records),
            DrawData::Lines(vertices) => bytemuck::cast_slice(vertices),
        }
    }
}

/// Per-frame shader uniforms, one fixed shape per emitter type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniforms {
    Vapor(VaporUniforms),
    Meteor(MeteorUniforms),
    ShootingStar(ShootingStarUniforms),
    Bubble(BubbleUniforms),
}

impl Uniforms {
    pub fn time(&self) -> f32 {
        match self {
            Uniforms::Vapor(u) => u.time,
            Uniforms::Meteor(u) => u.time,
            Uniforms::ShootingStar(u) => u.time,
            Uniforms::Bubble(u) => u.time,
        }
    }
}

/// Draw data for one layer of one emitter, consumed by a [`RenderSink`](crate::scene::RenderSink)
#[derive(Debug, Clone, Copy)]
pub struct DrawBatch<'a> {
    pub emitter: &'a str,
    /// Layer within the emitter ("heads", "trails", "flash"...)
    pub layer: &'static str,
    pub blend_mode: ParticleBlendMode,
    pub primitive: Primitive,
    pub data: DrawData<'a>,
    pub uniforms: Uniforms,
}

/// Running counters for one emitter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    pub spawned: u64,
    /// Spawn attempts that found the pool full
    pub dropped: u64,
    pub retired: u64,
    pub peak_active: usize,
}

/// A pooled particle emitter driven once per frame by the host
pub trait Emitter {
    fn name(&self) -> &str;

    /// Validate configuration and allocate attribute buffers
    fn initialize(&mut self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Spawn, advance and retire particles, then refresh attribute buffers.
    /// Does nothing until [`initialize`](Self::initialize) has succeeded.
    fn update(&mut self, time: FrameTime);

    fn active_count(&self) -> usize;

    fn capacity(&self) -> usize;

    fn stats(&self) -> EmitterStats;

    /// Batches to submit this frame, in draw order
    fn draw_batches(&self) -> Vec<DrawBatch<'_>>;
}

/// Pool, spawn policy, random stream and instance buffer shared by every emitter
pub(crate) struct EmitterCore<P> {
    pub pool: ParticlePool<P>,
    pub spawner: SpawnPolicy,
    pub rng: ParticleRng,
    pub instances: Option<InstanceBuffer>,
    stats: EmitterStats,
    next_status: f64,
}

impl<P: Default> EmitterCore<P> {
    pub fn new(capacity: usize, trail_len: usize, spawn: SpawnConfig, rng: ParticleRng) -> Self {
        Self {
            pool: ParticlePool::new(capacity, trail_len),
            spawner: SpawnPolicy::new(spawn),
            rng,
            instances: None,
            stats: EmitterStats::default(),
            next_status: STATUS_INTERVAL,
        }
    }

    /// Activate a free slot and hand it to `init`. Counts a drop when full.
    pub fn spawn_with(
        &mut self,
        init: impl FnOnce(&mut Particle<P>, &mut ParticleRng),
    ) -> Option<usize> {
        match self.pool.spawn() {
            Some((index, p)) => {
                init(p, &mut self.rng);
                self.stats.spawned += 1;
                self.stats.peak_active = self.stats.peak_active.max(self.pool.active_count());
                Some(index)
            }
            None => {
                self.stats.dropped += 1;
                None
            }
        }
    }

    pub fn retire(&mut self, index: usize) {
        if self.pool.retire(index) {
            self.stats.retired += 1;
            log::debug!("retired slot {index}");
        }
    }
}

impl<P> EmitterCore<P> {
    pub fn allocate(&mut self) {
        if self.instances.is_none() {
            self.instances = Some(InstanceBuffer::new(self.pool.capacity()));
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.instances.is_some()
    }

    /// Spawn attempts due for this frame
    pub fn poll_spawns(&mut self, time: FrameTime) -> u32 {
        let has_capacity = !self.pool.is_full();
        self.spawner
            .poll(time.elapsed, time.delta, has_capacity, &mut self.rng)
    }

    pub fn stats(&self) -> EmitterStats {
        EmitterStats {
            dropped: self.stats.dropped + self.spawner.skipped(),
            ..self.stats
        }
    }

    /// Log an `active/capacity` line every few simulated seconds
    pub fn report_status(&mut self, name: &str, elapsed: f64) {
        if elapsed < self.next_status {
            return;
        }
        self.next_status = elapsed + STATUS_INTERVAL;
        log::debug!(
            "[{name}] {}/{} active at t={elapsed:.1}s",
            self.pool.active_count(),
            self.pool.capacity()
        );
    }

    pub fn instance_records(&self) -> &[InstanceRecord] {
        self.instances
            .as_ref()
            .map(InstanceBuffer::records)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_with_counts_drops() {
        let mut core: EmitterCore<()> =
            EmitterCore::new(2, 0, SpawnConfig::default(), ParticleRng::new(3));
        assert!(core.spawn_with(|p, _| p.lifetime = 1.0).is_some());
        assert!(core.spawn_with(|p, _| p.lifetime = 1.0).is_some());
        assert!(core.spawn_with(|p, _| p.lifetime = 1.0).is_none());

        core.retire(0);
        core.retire(0);
        let stats = core.stats();
        assert_eq!(stats.spawned, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.retired, 1);
        assert_eq!(stats.peak_active, 2);
    }

    #[test]
    fn allocation_is_explicit() {
        let mut core: EmitterCore<()> =
            EmitterCore::new(4, 0, SpawnConfig::default(), ParticleRng::new(3));
        assert!(!core.is_allocated());
        assert!(core.instance_records().is_empty());
        core.allocate();
        assert_eq!(core.instance_records().len(), 4);
    }

    #[test]
    fn draw_data_byte_views() {
        let records = [InstanceRecord::HIDDEN; 2];
        let data = DrawData::Instances(&records);
        assert_eq!(data.len(), 2);
        assert_eq!(data.as_bytes().len(), 96);
        let vertices = [TrailVertex::HIDDEN; 4];
        assert_eq!(DrawData::Lines(&vertices).as_bytes().len(), 112);
    }
}
