/// Playback-coupled animation time, decoupled from wall-clock time.
///
/// `anim` drives all visualizer animation and only advances while audio is
/// playing or an export is running; it freezes instantly on pause. `bg` is a
/// second accumulator for background playback, advanced by the same delta
/// scaled by the beat-responsive background speed.
#[derive(Debug, Default)]
pub struct VisualClock {
    anim: f64,
    bg: f64,
}

impl VisualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance both accumulators. `delta` is seconds of elapsed time (wall
    /// delta in live playback, the fixed frame interval during export).
    /// No-op unless playing or exporting.
    pub fn advance(&mut self, delta: f64, bg_speed: f64, active: bool) {
        if !active || !delta.is_finite() || delta <= 0.0 {
            return;
        }
        self.anim += delta;
        self.bg += delta * bg_speed;
    }

    pub fn anim_time(&self) -> f64 {
        self.anim
    }

    pub fn bg_time(&self) -> f64 {
        self.bg
    }

    /// Reset on background track change; never called otherwise.
    pub fn reset(&mut self) {
        self.anim = 0.0;
        self.bg = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_while_inactive() {
        let mut clock = VisualClock::new();
        clock.advance(0.5, 1.0, true);
        let before = clock.anim_time();
        for _ in 0..10 {
            clock.advance(0.033, 1.0, false);
        }
        assert_eq!(clock.anim_time(), before);
        assert_eq!(clock.bg_time(), 0.5);
    }

    #[test]
    fn monotonic_while_active() {
        let mut clock = VisualClock::new();
        let mut last = 0.0;
        for _ in 0..100 {
            clock.advance(1.0 / 30.0, 1.0, true);
            assert!(clock.anim_time() >= last);
            last = clock.anim_time();
        }
        assert!((clock.anim_time() - 100.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn bg_speed_scales_background_only() {
        let mut clock = VisualClock::new();
        clock.advance(1.0, 2.5, true);
        assert!((clock.anim_time() - 1.0).abs() < 1e-9);
        assert!((clock.bg_time() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn ignores_non_finite_delta() {
        let mut clock = VisualClock::new();
        clock.advance(f64::NAN, 1.0, true);
        clock.advance(f64::INFINITY, 1.0, true);
        assert_eq!(clock.anim_time(), 0.0);
    }
}
