//! Interpolation and easing helpers

/// Linear interpolation between two floats
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Exponential smoothing step: moves `current` toward `target` by
/// `dt * rate` of the remaining distance, never overshooting.
pub fn smooth_toward(current: f32, target: f32, dt: f32, rate: f32) -> f32 {
    lerp_f32(current, target, (dt * rate).clamp(0.0, 1.0))
}

/// Monotonic easing curves mapping linear progress [0, 1] to eased progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    #[default]
    EaseOutCubic,
    EaseInOutCubic,
}

impl Easing {
    /// Evaluate the curve; input is clamped to [0, 1]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => t * (2.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::EaseOutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    (t - 1.0) * u * u + 1.0
                }
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Easing::Linear),
            "ease_in_quad" | "easeInQuad" => Some(Easing::EaseInQuad),
            "ease_out_quad" | "easeOutQuad" => Some(Easing::EaseOutQuad),
            "ease_in_out_quad" | "easeInOutQuad" => Some(Easing::EaseInOutQuad),
            "ease_out_cubic" | "easeOutCubic" => Some(Easing::EaseOutCubic),
            "ease_in_out_cubic" | "easeInOutCubic" => Some(Easing::EaseInOutCubic),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 6] = [
        Easing::Linear,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
    ];

    #[test]
    fn lerp_f32_endpoints() {
        assert!((lerp_f32(0.0, 10.0, 0.0) - 0.0).abs() < 1e-6);
        assert!((lerp_f32(0.0, 10.0, 1.0) - 10.0).abs() < 1e-6);
        assert!((lerp_f32(0.0, 10.0, 0.5) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn smooth_toward_never_overshoots() {
        assert_eq!(smooth_toward(0.0, 1.0, 1.0, 50.0), 1.0);
        let v = smooth_toward(0.0, 1.0, 1.0 / 60.0, 5.0);
        assert!(v > 0.0 && v < 1.0);
    }

    #[test]
    fn easing_endpoints_fixed() {
        for e in ALL {
            assert!(e.apply(0.0).abs() < 1e-6, "{e:?} at 0");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-6, "{e:?} at 1");
        }
    }

    #[test]
    fn easing_is_monotonic() {
        for e in ALL {
            let mut prev = 0.0;
            for i in 1..=100 {
                let v = e.apply(i as f32 / 100.0);
                assert!(v + 1e-6 >= prev, "{e:?} decreased at step {i}");
                prev = v;
            }
        }
    }

    #[test]
    fn easing_clamps_input() {
        assert_eq!(Easing::EaseOutCubic.apply(2.0), 1.0);
        assert_eq!(Easing::EaseInQuad.apply(-1.0), 0.0);
    }

    #[test]
    fn easing_names() {
        assert_eq!(Easing::from_name("ease_out_cubic"), Some(Easing::EaseOutCubic));
        assert_eq!(Easing::from_name("easeInOutQuad"), Some(Easing::EaseInOutQuad));
        assert_eq!(Easing::from_name("bounce"), None);
    }
}
