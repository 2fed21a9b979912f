//! Spawn scheduling: when an emitter should try to activate slots

use crate::rand::ParticleRng;
use std::collections::VecDeque;

/// How spawn attempts are distributed over time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    /// One attempt whenever more than `1 / rate` seconds have passed since the
    /// last one
    Interval,
    /// One Bernoulli trial per tick with probability `rate * dt`
    Stochastic,
}

impl SpawnMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "interval" => Some(SpawnMode::Interval),
            "stochastic" | "poisson" => Some(SpawnMode::Stochastic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnConfig {
    pub mode: SpawnMode,
    /// Average spawns per second
    pub rate: f32,
    /// Probability that a regular spawn also triggers a burst
    pub burst_chance: f32,
    pub burst_min: u32,
    pub burst_max: u32,
    /// Delay between consecutive burst spawns, in seconds
    pub burst_stagger: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            mode: SpawnMode::Interval,
            rate: 1.0,
            burst_chance: 0.0,
            burst_min: 2,
            burst_max: 5,
            burst_stagger: 0.1,
        }
    }
}

/// Decides how many spawn attempts an emitter makes each tick
#[derive(Debug)]
pub struct SpawnPolicy {
    config: SpawnConfig,
    last_spawn_time: f64,
    /// Due times of queued burst spawns, earliest first
    pending: VecDeque<f64>,
    /// Regular spawns that fell due while the pool was saturated
    skipped: u64,
}

impl SpawnPolicy {
    pub fn new(config: SpawnConfig) -> Self {
        Self {
            config,
            last_spawn_time: 0.0,
            pending: VecDeque::new(),
            skipped: 0,
        }
    }

    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    pub fn last_spawn_time(&self) -> f64 {
        self.last_spawn_time
    }

    pub fn pending_bursts(&self) -> usize {
        self.pending.len()
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Number of spawn attempts due this tick.
    ///
    /// `has_capacity` reports whether the pool has a free slot right now. A
    /// regular spawn that fires against a saturated pool is skipped along with
    /// its burst roll, but the spawn clock still advances.
    pub fn poll(
        &mut self,
        elapsed: f64,
        dt: f32,
        has_capacity: bool,
        rng: &mut ParticleRng,
    ) -> u32 {
        let mut attempts = 0;

        if self.regular_due(elapsed, dt, rng) {
            self.last_spawn_time = elapsed;
            if has_capacity {
                attempts += 1;
                if rng.chance(self.config.burst_chance) {
                    let count = rng.range_u32(self.config.burst_min, self.config.burst_max);
                    log::debug!("burst of {count} queued at t={elapsed:.2}");
                    for i in 0..count {
                        let due = elapsed + (i + 1) as f64 * self.config.burst_stagger as f64;
                        self.pending.push_back(due);
                    }
                }
            } else {
                self.skipped += 1;
            }
        }

        while self.pending.front().is_some_and(|&due| due <= elapsed) {
            self.pending.pop_front();
            attempts += 1;
        }

        attempts
    }

    fn regular_due(&self, elapsed: f64, dt: f32, rng: &mut ParticleRng) -> bool {
        if self.config.rate <= 0.0 {
            return false;
        }
        match self.config.mode {
            SpawnMode::Interval => {
                elapsed - self.last_spawn_time > 1.0 / self.config.rate as f64
            }
            SpawnMode::Stochastic => rng.chance(self.config.rate * dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(policy: &mut SpawnPolicy, seconds: f64, dt: f32) -> u32 {
        let mut rng = ParticleRng::new(42);
        let mut elapsed = 0.0;
        let mut total = 0;
        let frames = (seconds / dt as f64).round() as usize;
        for _ in 0..frames {
            elapsed += dt as f64;
            total += policy.poll(elapsed, dt, true, &mut rng);
        }
        total
    }

    #[test]
    fn interval_rate_converges() {
        let mut policy = SpawnPolicy::new(SpawnConfig {
            rate: 2.0,
            ..Default::default()
        });
        let total = run(&mut policy, 100.0, 1.0 / 60.0) as f32;
        // Frame quantization makes each interval slightly longer than 1/rate
        assert!((total - 200.0).abs() / 200.0 < 0.05, "got {total}");
    }

    #[test]
    fn stochastic_rate_converges() {
        let mut policy = SpawnPolicy::new(SpawnConfig {
            mode: SpawnMode::Stochastic,
            rate: 6.0,
            ..Default::default()
        });
        let total = run(&mut policy, 200.0, 1.0 / 60.0) as f32;
        assert!((total - 1200.0).abs() / 1200.0 < 0.08, "got {total}");
    }

    #[test]
    fn zero_rate_never_spawns() {
        let mut policy = SpawnPolicy::new(SpawnConfig {
            rate: 0.0,
            ..Default::default()
        });
        assert_eq!(run(&mut policy, 10.0, 1.0 / 60.0), 0);
    }

    #[test]
    fn saturated_pool_skips_but_advances_clock() {
        let mut policy = SpawnPolicy::new(SpawnConfig {
            rate: 1.0,
            burst_chance: 1.0,
            ..Default::default()
        });
        let mut rng = ParticleRng::new(1);
        assert_eq!(policy.poll(1.5, 0.016, false, &mut rng), 0);
        assert_eq!(policy.last_spawn_time(), 1.5);
        assert_eq!(policy.pending_bursts(), 0);
        assert_eq!(policy.skipped(), 1);
        // Capacity back, but the interval restarted at 1.5
        assert_eq!(policy.poll(2.0, 0.016, true, &mut rng), 0);
    }

    #[test]
    fn bursts_are_staggered() {
        let mut policy = SpawnPolicy::new(SpawnConfig {
            rate: 1.0,
            burst_chance: 1.0,
            burst_min: 3,
            burst_max: 3,
            burst_stagger: 0.1,
            ..Default::default()
        });
        let mut rng = ParticleRng::new(5);
        assert_eq!(policy.poll(1.01, 0.01, true, &mut rng), 1);
        assert_eq!(policy.pending_bursts(), 3);
        assert_eq!(policy.poll(1.05, 0.04, true, &mut rng), 0);
        assert_eq!(policy.poll(1.12, 0.07, true, &mut rng), 1);
        assert_eq!(policy.poll(1.40, 0.28, true, &mut rng), 2);
        assert_eq!(policy.pending_bursts(), 0);
    }
}
