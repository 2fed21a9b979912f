//! Frame clock supplying the delta/elapsed time contract to emitters

use std::time::Instant;

/// Longest frame delta handed to emitters, in seconds
const MAX_DELTA: f64 = 0.25;

/// The read-only time values every emitter receives once per frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame
    pub delta: f32,
    /// Seconds since the clock started
    pub elapsed: f64,
}

impl FrameTime {
    pub fn new(delta: f32, elapsed: f64) -> Self {
        Self { delta, elapsed }
    }
}

/// Tracks frame timing for the host frame-driver.
///
/// The clock can be driven from the wall clock with [`FrameClock::tick`] or
/// stepped by a fixed amount with [`FrameClock::advance`] for headless runs.
/// Frame counting and FPS averaging live here, on the host side; emitters only
/// ever see the [`FrameTime`] snapshot.
pub struct FrameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds
    pub delta_time: f64,
    /// Frames advanced so far
    pub frame_count: u64,
    fps: FpsCounter,
    last_instant: Instant,
    first_tick: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            frame_count: 0,
            fps: FpsCounter::default(),
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance from the wall clock. Call once per frame.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();

        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            return self.advance(0.0);
        }

        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed)
    }

    /// Advance by an explicit delta. Negative deltas are treated as zero and
    /// long stalls are clamped so a single frame never jumps more than 250ms.
    pub fn advance(&mut self, delta: f64) -> FrameTime {
        self.delta_time = delta.clamp(0.0, MAX_DELTA);
        self.total_time += self.delta_time;
        self.frame_count += 1;
        self.fps.record(self.delta_time);
        self.frame_time()
    }

    pub fn frame_time(&self) -> FrameTime {
        FrameTime::new(self.delta_time as f32, self.total_time)
    }

    /// Frames per second averaged over the last full one-second window
    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }
}

/// Averages frame rate over one-second windows
#[derive(Debug, Default)]
pub struct FpsCounter {
    window_time: f64,
    window_frames: u32,
    fps: f64,
}

impl FpsCounter {
    pub fn record(&mut self, delta: f64) {
        self.window_time += delta;
        self.window_frames += 1;
        if self.window_time >= 1.0 {
            self.fps = self.window_frames as f64 / self.window_time;
            self.window_time = 0.0;
            self.window_frames = 0;
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_defaults() {
        let clock = FrameClock::new();
        assert_eq!(clock.total_time, 0.0);
        assert_eq!(clock.delta_time, 0.0);
        assert_eq!(clock.frame_count, 0);
    }

    #[test]
    fn test_first_tick_zero_delta() {
        let mut clock = FrameClock::new();
        let t = clock.tick();
        assert_eq!(t.delta, 0.0);
        assert_eq!(clock.frame_count, 1);
    }

    #[test]
    fn test_advance_accumulates_elapsed() {
        let mut clock = FrameClock::new();
        for _ in 0..60 {
            clock.advance(1.0 / 60.0);
        }
        assert!((clock.total_time - 1.0).abs() < 1e-9);
        assert_eq!(clock.frame_count, 60);
    }

    #[test]
    fn test_advance_clamps_delta() {
        let mut clock = FrameClock::new();
        let t = clock.advance(3.0);
        assert!((t.delta - 0.25).abs() < 1e-6);
        let t = clock.advance(-1.0);
        assert_eq!(t.delta, 0.0);
        assert!((t.elapsed - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_fps_average() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.fps(), 0.0);
        for _ in 0..61 {
            clock.advance(1.0 / 60.0);
        }
        assert!((clock.fps() - 60.0).abs() < 1.5);
    }
}
