//! Slot-indexed GPU attribute buffers mirrored from pool state

use crate::particle::{Particle, ParticlePool, TrailHistory};
use bytemuck::{Pod, Zeroable};
use skyglass_core::Rgb;

/// Where inactive slots are parked: far below the visible volume
pub const HIDDEN_POSITION: [f32; 3] = [0.0, -100.0, 0.0];

/// Per-instance record, laid out to match the shader-side instance attributes.
/// 48 bytes, 3 rows of vec4.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    /// xyz = position, w = size
    pub pos_size: [f32; 4],
    /// rgb = color, a = opacity
    pub color: [f32; 4],
    /// x = rotation, y = age ratio, z = intensity, w = phase code
    pub params: [f32; 4],
}

impl InstanceRecord {
    pub const HIDDEN: Self = Self {
        pos_size: [HIDDEN_POSITION[0], HIDDEN_POSITION[1], HIDDEN_POSITION[2], 0.0],
        color: [1.0, 1.0, 1.0, 0.0],
        params: [0.0; 4],
    };

    /// Record for a live particle with the given rendered size, color and intensity
    pub fn from_particle<P>(p: &Particle<P>, size: f32, color: Rgb, intensity: f32) -> Self {
        Self {
            pos_size: [p.position.x, p.position.y, p.position.z, size],
            color: [color.r, color.g, color.b, p.opacity],
            params: [p.rotation, p.age_ratio(), intensity, p.phase.code()],
        }
    }

    pub fn position(&self) -> [f32; 3] {
        [self.pos_size[0], self.pos_size[1], self.pos_size[2]]
    }

    pub fn size(&self) -> f32 {
        self.pos_size[3]
    }

    pub fn opacity(&self) -> f32 {
        self.color[3]
    }

    pub fn is_visible(&self) -> bool {
        self.size() > 0.0 && self.opacity() > 0.0
    }
}

impl Default for InstanceRecord {
    fn default() -> Self {
        Self::HIDDEN
    }
}

/// One end of a trail line segment. 28 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TrailVertex {
    pub position: [f32; 3],
    pub alpha: f32,
    pub color: [f32; 3],
}

impl TrailVertex {
    pub const HIDDEN: Self = Self {
        position: HIDDEN_POSITION,
        alpha: 0.0,
        color: [0.0; 3],
    };
}

/// Pre-allocated instance buffer with one record per pool slot
pub struct InstanceBuffer {
    records: Vec<InstanceRecord>,
}

impl InstanceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: vec![InstanceRecord::HIDDEN; capacity],
        }
    }

    /// Rewrite every slot from the pool; inactive slots get the hidden sentinel
    pub fn sync_from<P>(
        &mut self,
        pool: &ParticlePool<P>,
        mut pack: impl FnMut(&Particle<P>) -> InstanceRecord,
    ) {
        for (record, p) in self.records.iter_mut().zip(pool.slots()) {
            *record = if p.active {
                pack(p)
            } else {
                InstanceRecord::HIDDEN
            };
        }
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw bytes for a single GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    /// Flat float view, 12 floats per slot
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.records)
    }

    pub fn visible_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_visible()).count()
    }
}

/// Line-segment trail buffer: `points_per_trail - 1` segments per slot, two
/// vertices per segment, with a front-to-back alpha gradient.
pub struct TrailBuffer {
    points_per_trail: usize,
    vertices: Vec<TrailVertex>,
}

impl TrailBuffer {
    pub fn new(capacity: usize, points_per_trail: usize) -> Self {
        let segments = points_per_trail.saturating_sub(1);
        Self {
            points_per_trail,
            vertices: vec![TrailVertex::HIDDEN; capacity * segments * 2],
        }
    }

    pub fn segments_per_trail(&self) -> usize {
        self.points_per_trail.saturating_sub(1)
    }

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        let stride = self.segments_per_trail() * 2;
        let start = (slot * stride).min(self.vertices.len());
        start..(start + stride).min(self.vertices.len())
    }

    /// Write the segments for `slot` from its trail history.
    ///
    /// Point `i` (0 = newest) gets `alpha = max(0, 1 - i/N) * intensity` and its
    /// color dimmed by the same gradient. Segments past the recorded history
    /// are zeroed.
    pub fn write_trail(&mut self, slot: usize, trail: &TrailHistory, color: Rgb, intensity: f32) {
        self.write_trail_limited(slot, trail, usize::MAX, color, intensity);
    }

    /// Like [`write_trail`](Self::write_trail) but only the newest `visible`
    /// points produce segments
    pub fn write_trail_limited(
        &mut self,
        slot: usize,
        trail: &TrailHistory,
        visible: usize,
        color: Rgb,
        intensity: f32,
    ) {
        let n = self.points_per_trail as f32;
        let range = self.slot_range(slot);
        let segments = &mut self.vertices[range];

        for (i, pair) in segments.chunks_exact_mut(2).enumerate() {
            let in_view = i + 1 < visible;
            match (trail.get(i), trail.get(i + 1)) {
                (Some(head), Some(tail)) if in_view => {
                    let fade_head = (1.0 - i as f32 / n).max(0.0);
                    let fade_tail = (1.0 - (i + 1) as f32 / n).max(0.0);
                    pair[0] = TrailVertex {
                        position: head.position.to_array(),
                        alpha: fade_head * intensity,
                        color: color.scaled(fade_head).to_array(),
                    };
                    pair[1] = TrailVertex {
                        position: tail.position.to_array(),
                        alpha: fade_tail * intensity,
                        color: color.scaled(fade_tail).to_array(),
                    };
                }
                _ => {
                    pair[0] = TrailVertex::HIDDEN;
                    pair[1] = TrailVertex::HIDDEN;
                }
            }
        }
    }

    pub fn clear_trail(&mut self, slot: usize) {
        let range = self.slot_range(slot);
        self.vertices[range].fill(TrailVertex::HIDDEN);
    }

    pub fn vertices(&self) -> &[TrailVertex] {
        &self.vertices
    }

    /// Vertices belonging to one slot
    pub fn slot_vertices(&self, slot: usize) -> &[TrailVertex] {
        &self.vertices[self.slot_range(slot)]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Number of segments with a visible head vertex
    pub fn visible_segments(&self) -> usize {
        self.vertices
            .chunks_exact(2)
            .filter(|pair| pair[0].alpha > 0.0)
            .count()
    }
}
