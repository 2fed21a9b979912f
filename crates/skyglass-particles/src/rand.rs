//! Seeded PRNG wrapper used for spawn sampling

use ::rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Deterministic random source owned by one emitter.
///
/// Every emitter derives its own stream from the scene seed so that adding or
/// removing an emitter does not perturb the others.
pub struct ParticleRng {
    inner: Pcg32,
}

impl ParticleRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg32::seed_from_u64(seed),
        }
    }

    /// Derive an independent stream for `stream` from a shared scene seed
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        Self::new(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Returns a float in [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// Returns a float in [min, max). Returns `min` when the range is empty.
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        min + self.next_f32() * (max - min)
    }

    /// Returns a float in [-spread/2, spread/2)
    pub fn signed(&mut self, spread: f32) -> f32 {
        (self.next_f32() - 0.5) * spread
    }

    /// Returns true with probability `p` (clamped to [0, 1])
    pub fn chance(&mut self, p: f32) -> bool {
        if p <= 0.0 {
            return false;
        }
        self.next_f32() < p.min(1.0)
    }

    /// Returns an integer in [min, max] inclusive
    pub fn range_u32(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..=max)
    }

    /// Returns a uniformly random angle in [0, 2pi)
    pub fn angle(&mut self) -> f32 {
        self.range(0.0, std::f32::consts::TAU)
    }

    /// Picks one element uniformly, `None` for an empty slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.inner.gen_range(0..items.len());
        items.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_range_bounds() {
        let mut rng = ParticleRng::new(42);
        for _ in 0..1000 {
            let v = rng.range(0.0, 10.0);
            assert!((0.0..10.0).contains(&v));
        }
    }

    #[test]
    fn rng_empty_range_returns_min() {
        let mut rng = ParticleRng::new(1);
        assert_eq!(rng.range(3.0, 3.0), 3.0);
        assert_eq!(rng.range_u32(5, 2), 5);
    }

    #[test]
    fn rng_signed_is_centered() {
        let mut rng = ParticleRng::new(7);
        for _ in 0..1000 {
            let v = rng.signed(2.0);
            assert!((-1.0..1.0).contains(&v));
        }
    }

    #[test]
    fn rng_same_seed_same_sequence() {
        let mut a = ParticleRng::new(99);
        let mut b = ParticleRng::new(99);
        for _ in 0..16 {
            assert_eq!(a.next_f32(), b.next_f32());
        }
    }

    #[test]
    fn rng_streams_differ() {
        let mut a = ParticleRng::for_stream(99, 1);
        let mut b = ParticleRng::for_stream(99, 2);
        let same = (0..16).filter(|_| a.next_f32() == b.next_f32()).count();
        assert!(same < 16);
    }

    #[test]
    fn chance_extremes() {
        let mut rng = ParticleRng::new(3);
        assert!(!(0..100).any(|_| rng.chance(0.0)));
        assert!((0..100).all(|_| rng.chance(1.0)));
    }

    #[test]
    fn pick_covers_items() {
        let mut rng = ParticleRng::new(11);
        let items = [1, 2, 3];
        let mut seen = [false; 3];
        for _ in 0..200 {
            let v = *rng.pick(&items).unwrap();
            seen[v - 1] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert!(rng.pick::<u8>(&[]).is_none());
    }
}
