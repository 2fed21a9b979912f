//! Age-driven lifecycle phases and scale/opacity interpolation
//!
//! Phase is a function of `age / lifetime` only. Two interpolation styles are
//! supported: exponential smoothing toward the targets (vapor, meteors) and a
//! closed-form eased growth curve with a deterministic end time (bubbles).
//! Both share the same linear fade to zero over the last part of the life.

use crate::curves::{smooth_toward, Easing};
use crate::particle::{Particle, Phase};
use crate::rand::ParticleRng;

/// Thresholds and smoothing rates for one emitter type
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleProfile {
    /// Age ratio below which the particle is `Spawning`
    pub spawn_threshold: f32,
    /// Age ratio at which fading starts
    pub fade_threshold: f32,
    pub spawn_scale_rate: f32,
    pub spawn_opacity_rate: f32,
    pub settle_scale_rate: f32,
    pub settle_opacity_rate: f32,
    /// Relative distance to `target_scale` under which a growing particle counts as stable
    pub stable_tolerance: f32,
}

impl Default for LifecycleProfile {
    fn default() -> Self {
        Self {
            spawn_threshold: 0.1,
            fade_threshold: 0.8,
            spawn_scale_rate: 5.0,
            spawn_opacity_rate: 3.0,
            settle_scale_rate: 2.0,
            settle_opacity_rate: 3.0,
            stable_tolerance: 0.05,
        }
    }
}

impl LifecycleProfile {
    /// Linear fade progress in [0, 1]; zero before the fade threshold
    pub fn fade_progress(&self, ratio: f32) -> f32 {
        if ratio < self.fade_threshold {
            return 0.0;
        }
        let span = (1.0 - self.fade_threshold).max(f32::EPSILON);
        ((ratio - self.fade_threshold) / span).clamp(0.0, 1.0)
    }

    pub fn is_fading(&self, ratio: f32) -> bool {
        ratio >= self.fade_threshold
    }
}

/// Closed-form growth from `min_size` to the particle's `target_scale`
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthCurve {
    pub min_size: f32,
    /// Seconds to reach full size
    pub duration: f32,
    pub easing: Easing,
    /// Opacity ramps over `duration * opacity_lag`
    pub opacity_lag: f32,
}

impl Default for GrowthCurve {
    fn default() -> Self {
        Self {
            min_size: 0.05,
            duration: 1.0,
            easing: Easing::EaseOutCubic,
            opacity_lag: 1.5,
        }
    }
}

impl GrowthCurve {
    pub fn progress(&self, age: f32) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (age / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn size_at(&self, age: f32, target: f32) -> f32 {
        self.min_size + (target - self.min_size) * self.easing.apply(self.progress(age))
    }

    pub fn opacity_at(&self, age: f32, target: f32) -> f32 {
        let span = self.duration * self.opacity_lag;
        if span <= 0.0 {
            target
        } else {
            target * (age / span).clamp(0.0, 1.0)
        }
    }
}

/// Advance a smoothing-style particle by one tick and return its phase
pub fn step_smoothed<P>(p: &mut Particle<P>, profile: &LifecycleProfile, dt: f32) -> Phase {
    let ratio = p.age_ratio();

    if profile.is_fading(ratio) {
        p.enter(Phase::Fading);
        apply_fade(p, profile, ratio);
    } else if ratio < profile.spawn_threshold {
        p.scale = smooth_toward(p.scale, p.target_scale, dt, profile.spawn_scale_rate);
        p.opacity = smooth_toward(p.opacity, p.target_opacity, dt, profile.spawn_opacity_rate);
    } else {
        p.scale = smooth_toward(p.scale, p.target_scale, dt, profile.settle_scale_rate);
        p.opacity = smooth_toward(p.opacity, p.target_opacity, dt, profile.settle_opacity_rate);
        let settled = (p.target_scale - p.scale).abs()
            <= p.target_scale.abs() * profile.stable_tolerance;
        p.enter(if settled { Phase::Stable } else { Phase::Growing });
    }

    p.phase
}

/// Advance a growth-curve particle by one tick and return its phase
pub fn step_growth<P>(
    p: &mut Particle<P>,
    profile: &LifecycleProfile,
    curve: &GrowthCurve,
) -> Phase {
    let ratio = p.age_ratio();

    if profile.is_fading(ratio) {
        p.enter(Phase::Fading);
        apply_fade(p, profile, ratio);
        return p.phase;
    }

    p.scale = curve.size_at(p.age, p.target_scale);
    p.opacity = curve.opacity_at(p.age, p.target_opacity);
    if ratio >= profile.spawn_threshold {
        let grown = curve.progress(p.age) >= 1.0;
        p.enter(if grown { Phase::Stable } else { Phase::Growing });
    }

    p.phase
}

/// Scale the values captured at fade start down to zero at ratio 1
fn apply_fade<P>(p: &mut Particle<P>, profile: &LifecycleProfile, ratio: f32) {
    let remaining = 1.0 - profile.fade_progress(ratio);
    let (scale, opacity) = p.fade_from;
    p.scale = scale * remaining;
    p.opacity = opacity * remaining;
}

/// Settings for the vapor "mitosis" flourish.
///
/// Despite the name no particle is created: the existing puff shrinks its
/// target scale and picks up a small rotation kick.
#[derive(Debug, Clone, PartialEq)]
pub struct MitosisConfig {
    /// Chance per second once the timer has elapsed
    pub chance_per_second: f32,
    pub shrink: f32,
    pub rotation_jitter: f32,
    pub rearm_min: f32,
    pub rearm_max: f32,
    /// Initial timer is drawn from [0, initial_max)
    pub initial_max: f32,
}

impl Default for MitosisConfig {
    fn default() -> Self {
        Self {
            chance_per_second: 0.02,
            shrink: 0.8,
            rotation_jitter: 0.01,
            rearm_min: 3.0,
            rearm_max: 8.0,
            initial_max: 5.0,
        }
    }
}

/// Countdown gating the mitosis roll
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MitosisTimer {
    remaining: f32,
}

impl MitosisTimer {
    pub fn armed(config: &MitosisConfig, rng: &mut ParticleRng) -> Self {
        Self {
            remaining: rng.range(0.0, config.initial_max),
        }
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Count down and roll; true when the flourish fires (timer re-armed)
    pub fn tick(&mut self, config: &MitosisConfig, rng: &mut ParticleRng, dt: f32) -> bool {
        self.remaining -= dt;
        if self.remaining <= 0.0 && rng.chance(config.chance_per_second * dt) {
            self.remaining = rng.range(config.rearm_min, config.rearm_max);
            return true;
        }
        false
    }
}

/// Apply the mitosis perturbation to a particle. Phase is unchanged.
pub fn apply_mitosis<P>(p: &mut Particle<P>, config: &MitosisConfig, rng: &mut ParticleRng) {
    p.rotation_speed += rng.signed(config.rotation_jitter);
    p.target_scale *= config.shrink;
}
