//! Particle slots and the fixed-capacity pool that owns them

use glam::Vec3;
use skyglass_core::Rgb;
use std::collections::VecDeque;

/// Lifecycle phase of a particle slot.
///
/// Phases are ordered; a particle only ever moves forward through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Spawning,
    Growing,
    Stable,
    Fading,
    Retired,
}

impl Phase {
    /// Numeric state code written into instance buffers (0 = inactive)
    pub fn code(self) -> f32 {
        match self {
            Phase::Retired => 0.0,
            Phase::Spawning => 1.0,
            Phase::Growing => 2.0,
            Phase::Stable => 3.0,
            Phase::Fading => 4.0,
        }
    }
}

/// One recorded position in a motion trail
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub position: Vec3,
    pub age: f32,
}

/// Bounded newest-first position log
#[derive(Debug, Clone)]
pub struct TrailHistory {
    points: VecDeque<TrailPoint>,
    max_len: usize,
}

impl TrailHistory {
    pub fn new(max_len: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(max_len),
            max_len,
        }
    }

    /// Push the newest point, dropping the oldest beyond `max_len`
    pub fn record(&mut self, position: Vec3, age: f32) {
        if self.max_len == 0 {
            return;
        }
        self.points.push_front(TrailPoint { position, age });
        self.points.truncate(self.max_len);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Points from newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter()
    }

    pub fn get(&self, i: usize) -> Option<&TrailPoint> {
        self.points.get(i)
    }
}

/// One reusable particle record.
///
/// `P` carries the emitter-specific parameters (drag, intensity, timers...)
/// set at spawn and reset to `P::default()` whenever the slot is reused.
#[derive(Debug, Clone)]
pub struct Particle<P> {
    pub active: bool,
    pub phase: Phase,
    pub age: f32,
    pub lifetime: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub scale: f32,
    pub target_scale: f32,
    pub opacity: f32,
    pub target_opacity: f32,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub color: Rgb,
    pub trail: TrailHistory,
    /// Scale and opacity captured when the particle entered `Fading`
    pub fade_from: (f32, f32),
    pub params: P,
}

impl<P: Default> Particle<P> {
    pub fn dormant(trail_len: usize) -> Self {
        Self {
            active: false,
            phase: Phase::Retired,
            age: 0.0,
            lifetime: 0.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            scale: 0.0,
            target_scale: 0.0,
            opacity: 0.0,
            target_opacity: 0.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            color: Rgb::WHITE,
            trail: TrailHistory::new(trail_len),
            fade_from: (0.0, 0.0),
            params: P::default(),
        }
    }

    fn reset_for_spawn(&mut self) {
        self.active = true;
        self.phase = Phase::Spawning;
        self.age = 0.0;
        self.lifetime = 1.0;
        self.position = Vec3::ZERO;
        self.velocity = Vec3::ZERO;
        self.scale = 0.0;
        self.target_scale = 0.0;
        self.opacity = 0.0;
        self.target_opacity = 0.0;
        self.rotation = 0.0;
        self.rotation_speed = 0.0;
        self.color = Rgb::WHITE;
        self.trail.clear();
        self.fade_from = (0.0, 0.0);
        self.params = P::default();
    }

    fn reset_for_retire(&mut self) {
        self.active = false;
        self.phase = Phase::Retired;
        self.scale = 0.0;
        self.target_scale = 0.0;
        self.opacity = 0.0;
        self.target_opacity = 0.0;
        self.velocity = Vec3::ZERO;
        self.trail.clear();
    }
}

impl<P> Particle<P> {
    /// Normalized age in [0, 1]
    pub fn age_ratio(&self) -> f32 {
        if self.lifetime <= 0.0 {
            1.0
        } else {
            (self.age / self.lifetime).min(1.0)
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.lifetime
    }

    /// Move to `phase` if it lies ahead of the current one
    pub fn enter(&mut self, phase: Phase) {
        if phase > self.phase {
            if phase == Phase::Fading {
                self.fade_from = (self.scale, self.opacity);
            }
            self.phase = phase;
        }
    }
}

/// Fixed-capacity slot array with stable indices.
///
/// Slots never move; a retired slot is simply marked inactive and becomes the
/// next candidate for a spawn. A spawn against a full pool is dropped.
pub struct ParticlePool<P> {
    slots: Vec<Particle<P>>,
    active_count: usize,
}

impl<P: Default> ParticlePool<P> {
    pub fn new(capacity: usize, trail_len: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(Particle::dormant(trail_len));
        }
        Self {
            slots,
            active_count: 0,
        }
    }

    /// Activate the first free slot with all fields reset.
    /// Returns None if the pool is full.
    pub fn spawn(&mut self) -> Option<(usize, &mut Particle<P>)> {
        if self.active_count >= self.slots.len() {
            return None;
        }
        let idx = self.slots.iter().position(|p| !p.active)?;
        self.active_count += 1;
        let slot = &mut self.slots[idx];
        slot.reset_for_spawn();
        Some((idx, slot))
    }

    /// Spawn and initialize a particle; false when no slot is free
    pub fn try_spawn(&mut self, init: impl FnOnce(&mut Particle<P>)) -> bool {
        match self.spawn() {
            Some((_, p)) => {
                init(p);
                true
            }
            None => false,
        }
    }

    /// Deactivate the slot at `index`, zeroing its visual state.
    /// Returns false if the slot was not active.
    pub fn retire(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(p) if p.active => {
                p.reset_for_retire();
                self.active_count -= 1;
                true
            }
            _ => false,
        }
    }
}

impl<P> ParticlePool<P> {
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn is_full(&self) -> bool {
        self.active_count >= self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&Particle<P>> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Particle<P>> {
        self.slots.get_mut(index)
    }

    /// All slots, active or not, in index order
    pub fn slots(&self) -> &[Particle<P>] {
        &self.slots
    }

    pub fn for_each_active(&mut self, mut f: impl FnMut(usize, &mut Particle<P>)) {
        for (i, p) in self.slots.iter_mut().enumerate() {
            if p.active {
                f(i, p);
            }
        }
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &Particle<P>)> {
        self.slots.iter().enumerate().filter(|(_, p)| p.active)
    }

    /// Recount active slots from scratch; equals `active_count()` at all times
    pub fn count_active_slots(&self) -> usize {
        self.slots.iter().filter(|p| p.active).count()
    }
}
