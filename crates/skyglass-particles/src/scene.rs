//! Host-facing scene: owns the emitters and drives them once per frame

use crate::config::SceneConfig;
use crate::emitter::{
    BubbleEmitter, DrawBatch, Emitter, MeteorEmitter, ShootingStarEmitter, VaporEmitter,
};
use crate::rand::ParticleRng;
use skyglass_core::{FrameTime, Result};

/// Rendering collaborator. Receives every batch of a frame, then one `render` call.
pub trait RenderSink {
    fn submit(&mut self, batch: &DrawBatch<'_>) -> Result<()>;

    fn render(&mut self) -> Result<()>;
}

/// Random stream ids, one per emitter type
const VAPOR_STREAM: u64 = 1;
const METEOR_STREAM: u64 = 2;
const STAR_STREAM: u64 = 3;
const BUBBLE_STREAM: u64 = 4;

/// A set of independent emitters sharing one frame clock
#[derive(Default)]
pub struct ParticleScene {
    emitters: Vec<Box<dyn Emitter>>,
}

impl ParticleScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every enabled emitter from a scene config. Emitters still need
    /// [`initialize`](Self::initialize) before they animate.
    pub fn from_config(config: &SceneConfig) -> Self {
        let mut scene = Self::new();
        let seed = config.seed;
        if config.vapor.enabled {
            scene.push(VaporEmitter::new(
                config.vapor.clone(),
                config.backdrop.clone(),
                ParticleRng::for_stream(seed, VAPOR_STREAM),
            ));
        }
        if config.meteors.enabled {
            scene.push(MeteorEmitter::new(
                config.meteors.clone(),
                ParticleRng::for_stream(seed, METEOR_STREAM),
            ));
        }
        if config.shooting_stars.enabled {
            scene.push(ShootingStarEmitter::new(
                config.shooting_stars.clone(),
                ParticleRng::for_stream(seed, STAR_STREAM),
            ));
        }
        if config.bubbles.enabled {
            scene.push(BubbleEmitter::new(
                config.bubbles.clone(),
                ParticleRng::for_stream(seed, BUBBLE_STREAM),
            ));
        }
        scene
    }

    pub fn push(&mut self, emitter: impl Emitter + 'static) {
        self.emitters.push(Box::new(emitter));
    }

    /// Initialize every emitter. A failing emitter is logged and left
    /// uninitialized; the rest of the scene still runs. Returns the number
    /// of emitters that are ready.
    pub fn initialize(&mut self) -> usize {
        let mut ready = 0;
        for emitter in &mut self.emitters {
            match emitter.initialize() {
                Ok(()) => ready += 1,
                Err(e) => log::warn!("[{}] disabled: {e}", emitter.name()),
            }
        }
        log::info!("Particle scene ready: {ready}/{} emitters", self.emitters.len());
        ready
    }

    /// Advance every emitter by one frame
    pub fn update(&mut self, time: FrameTime) {
        for emitter in &mut self.emitters {
            emitter.update(time);
        }
    }

    /// Submit all batches then render once. Sink errors are logged and the
    /// frame is skipped; the returned count is the number of accepted batches.
    pub fn render(&self, sink: &mut dyn RenderSink) -> usize {
        let mut submitted = 0;
        for emitter in &self.emitters {
            for batch in emitter.draw_batches() {
                match sink.submit(&batch) {
                    Ok(()) => submitted += 1,
                    Err(e) => log::warn!("[{}] {} batch rejected: {e}", batch.emitter, batch.layer),
                }
            }
        }
        if let Err(e) = sink.render() {
            log::warn!("Frame render failed: {e}");
        }
        submitted
    }

    pub fn emitters(&self) -> &[Box<dyn Emitter>] {
        &self.emitters
    }

    pub fn emitter(&self, name: &str) -> Option<&dyn Emitter> {
        self.emitters
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.as_ref())
    }

    pub fn total_active(&self) -> usize {
        self.emitters.iter().map(|e| e.active_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{DrawData, VaporConfig};
    use crate::lifecycle::LifecycleProfile;
    use crate::particle::{ParticlePool, Phase};
    use crate::spawn::SpawnConfig;
    use skyglass_core::{BackdropMapping, SkyglassError};

    #[derive(Default)]
    struct CountingSink {
        batches: usize,
        bytes: usize,
        frames: usize,
        reject: bool,
    }

    impl RenderSink for CountingSink {
        fn submit(&mut self, batch: &DrawBatch<'_>) -> Result<()> {
            if self.reject {
                return Err(SkyglassError::RenderError("sink closed".into()));
            }
            self.batches += 1;
            self.bytes += batch.data.as_bytes().len();
            Ok(())
        }

        fn render(&mut self) -> Result<()> {
            self.frames += 1;
            Ok(())
        }
    }

    fn tick(frame: usize) -> FrameTime {
        let dt = 1.0 / 60.0;
        FrameTime::new(dt, frame as f64 * dt as f64)
    }

    #[test]
    fn default_scene_runs_all_four_emitters() {
        let mut scene = ParticleScene::from_config(&SceneConfig::default());
        assert_eq!(scene.emitters().len(), 4);
        assert_eq!(scene.initialize(), 4);

        let mut sink = CountingSink::default();
        for frame in 1..=600 {
            scene.update(tick(frame));
            for emitter in scene.emitters() {
                assert!(emitter.active_count() <= emitter.capacity());
            }
            scene.render(&mut sink);
        }
        assert_eq!(sink.frames, 600);
        // vapor 1 + meteors 3 + stars 2 + bubbles 1
        assert_eq!(sink.batches, 600 * 7);
        assert!(sink.bytes > 0);
        assert!(scene.total_active() > 0);
        for name in ["vapor", "meteors", "shooting_stars", "bubbles"] {
            assert!(scene.emitter(name).unwrap().stats().spawned > 0, "{name} never spawned");
        }
    }

    #[test]
    fn disabled_emitters_are_not_built() {
        let mut config = SceneConfig::default();
        config.meteors.enabled = false;
        config.bubbles.enabled = false;
        let scene = ParticleScene::from_config(&config);
        let names: Vec<_> = scene.emitters().iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, ["vapor", "shooting_stars"]);
    }

    #[test]
    fn failed_emitter_is_skipped_not_fatal() {
        let mut config = SceneConfig::default();
        config.vapor.drag = -1.0;
        let mut scene = ParticleScene::from_config(&config);
        assert_eq!(scene.initialize(), 3);
        for frame in 1..=120 {
            scene.update(tick(frame));
        }
        let vapor = scene.emitter("vapor").unwrap();
        assert!(!vapor.is_initialized());
        assert_eq!(vapor.active_count(), 0);
        assert!(vapor.draw_batches().is_empty());
    }

    #[test]
    fn rejected_batches_do_not_stop_the_frame() {
        let mut scene = ParticleScene::from_config(&SceneConfig::default());
        scene.initialize();
        scene.update(tick(1));
        let mut sink = CountingSink {
            reject: true,
            ..Default::default()
        };
        assert_eq!(scene.render(&mut sink), 0);
        assert_eq!(sink.frames, 1);
    }

    #[test]
    fn same_seed_same_scene() {
        let run = || {
            let mut scene = ParticleScene::from_config(&SceneConfig::default());
            scene.initialize();
            for frame in 1..=300 {
                scene.update(tick(frame));
            }
            scene
                .emitters()
                .iter()
                .map(|e| (e.active_count(), e.stats()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn five_second_particle_retires_with_zeroed_visuals() {
        let mut pool: ParticlePool<()> = ParticlePool::new(1, 4);
        let profile = LifecycleProfile::default();
        {
            let (_, p) = pool.spawn().unwrap();
            p.lifetime = 5.0;
            p.target_scale = 1.0;
            p.target_opacity = 1.0;
            p.trail.record(glam::Vec3::ONE, 0.0);
        }

        let dt = 1.0 / 60.0;
        let mut retired_at = None;
        for frame in 1..=400 {
            let Some(p) = pool.get_mut(0).filter(|p| p.active) else {
                break;
            };
            p.age += dt;
            assert!(p.age <= 5.0 + dt + 1e-4);
            if p.is_expired() {
                pool.retire(0);
                retired_at = Some(frame);
                continue;
            }
            crate::lifecycle::step_smoothed(p, &profile, dt);
        }

        let frame = retired_at.unwrap();
        assert!((299..=301).contains(&frame), "retired at frame {frame}");
        let p = pool.get(0).unwrap();
        assert!(!p.active);
        assert_eq!(p.phase, Phase::Retired);
        assert_eq!((p.scale, p.opacity), (0.0, 0.0));
        assert_eq!((p.target_scale, p.target_opacity), (0.0, 0.0));
        assert!(p.trail.is_empty());
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn capacity_three_pool_under_ten_per_second() {
        let config = SceneConfig {
            vapor: VaporConfig {
                capacity: 3,
                spawn: SpawnConfig {
                    rate: 10.0,
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        let mut emitter = VaporEmitter::new(config.vapor, BackdropMapping::default(), ParticleRng::new(0));
        emitter.initialize().unwrap();
        for frame in 1..=60 {
            emitter.update(tick(frame));
            assert!(emitter.active_count() <= 3);
        }
        assert_eq!(emitter.active_count(), 3);
        let batches = emitter.draw_batches();
        match batches[0].data {
            DrawData::Instances(records) => {
                assert_eq!(records.len(), 3);
                assert!(records.iter().all(|r| r.params[3] > 0.0));
            }
            DrawData::Lines(_) => panic!("vapor draws instances"),
        }
    }
}
