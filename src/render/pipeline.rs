use image::RgbaImage;

use crate::audio::analyzer::{BandCut, GainState, SpectralAnalyzer};
use crate::audio::decode::AudioTrack;
use crate::clock::VisualClock;
use crate::config::{FadeKind, VisualConfig};
use crate::render::background::Background;
use crate::render::canvas::{Canvas, Color, Paint};
use crate::render::fade;
use crate::render::postprocess::{self, PostFx};
use crate::render::text::TextOverlay;
use crate::render::viz::{self, DrawCtx, VizEntry, VizState};

/// Beat response multiplier folded into the background clock rate.
const BEAT_RATE_SCALE: f32 = 3.0;
/// The effective background rate never freezes playback or runs away, no
/// matter what speed and beat response the config combines.
const BG_RATE_MIN: f32 = 0.1;
const BG_RATE_MAX: f32 = 4.0;

/// One frame's worth of render state: clock, spectral snapshot, background
/// compositor, active algorithm and its persistent buffers.
pub struct RenderSession {
    cfg: VisualConfig,
    width: u32,
    height: u32,
    clock: VisualClock,
    analyzer: SpectralAnalyzer,
    background: Background,
    text: TextOverlay,
    gain: GainState,
    post: PostFx,
    entry: &'static VizEntry,
    state: VizState,
    playhead: f64,
}

impl RenderSession {
    pub fn new(cfg: VisualConfig, track: AudioTrack, background: Background, safe_mode: bool) -> Self {
        let (width, height) = cfg.resolution.dims();
        Self::with_dims(cfg, track, background, safe_mode, width, height)
    }

    fn with_dims(
        cfg: VisualConfig,
        track: AudioTrack,
        background: Background,
        safe_mode: bool,
        width: u32,
        height: u32,
    ) -> Self {
        let entry = viz::resolve(&cfg.viz_type);
        let text = TextOverlay::new(cfg.font.as_deref());
        let gain = GainState::new(cfg.gain_window, cfg.gain_target);
        let post = PostFx::from_config(&cfg, safe_mode);
        Self {
            cfg,
            width,
            height,
            clock: VisualClock::new(),
            analyzer: SpectralAnalyzer::new(track),
            background,
            text,
            gain,
            post,
            entry,
            state: VizState::default(),
            playhead: 0.0,
        }
    }

    pub fn duration(&self) -> f64 {
        self.analyzer.duration()
    }

    pub fn visualizer(&self) -> &'static str {
        self.entry.id
    }

    /// Switch the active algorithm. Persistent particle buffers belong to
    /// the outgoing algorithm and are dropped with it.
    pub fn set_visualizer(&mut self, id: &str) {
        self.entry = viz::resolve(id);
        self.state = VizState::default();
    }

    pub fn background_processing(&self) -> bool {
        self.background.processing()
    }

    pub fn wait_for_background(&mut self) {
        self.background.wait_for_cache();
    }

    /// Advance clocks and recompute the spectral snapshot. `active` is false
    /// while paused: everything freezes in place.
    pub fn tick(&mut self, delta: f64, playhead: f64, active: bool) {
        self.playhead = playhead;
        let volume = self.analyzer.snapshot().volume;
        let bg_rate = (self.cfg.bg_speed + volume * self.cfg.bg_beat_response * BEAT_RATE_SCALE)
            .clamp(BG_RATE_MIN, BG_RATE_MAX);
        self.clock.advance(delta, bg_rate as f64, active);

        let cut = BandCut {
            low_pct: self.cfg.low_cut,
            high_pct: self.cfg.high_cut,
            smart: self.cfg.smart_cut,
        };
        let snap = self.analyzer.update(playhead, self.entry.domain, cut, active);
        if active && self.cfg.smart_sensitivity {
            self.gain.push(snap.volume);
        }
    }

    /// Composite the full frame for the current tick.
    pub fn render_frame(&mut self, active: bool) -> RgbaImage {
        let mut c = Canvas::new(self.width, self.height);
        let t = self.clock.anim_time() as f32;

        self.background.draw(&mut c, &self.cfg, self.clock.bg_time());
        self.draw_viz(&mut c, t, active);
        self.text
            .draw(&mut c, &self.cfg, self.analyzer.snapshot().volume, t);

        let mut frame = c.into_image();
        postprocess::apply(&mut frame, &self.post, self.analyzer.snapshot().volume);
        self.apply_fades(&mut frame);
        frame
    }

    fn draw_viz(&mut self, c: &mut Canvas, t: f32, active: bool) {
        let cfg = &self.cfg;
        let snap = self.analyzer.snapshot();
        let font = self.text.font();
        let draw = self.entry.draw;
        let state = &mut self.state;
        let (w, h) = (self.width as f32, self.height as f32);
        let min_dim = w.min(h);
        let rs = min_dim / 1000.0;

        let sens = cfg.sensitivity
            * if cfg.smart_sensitivity {
                self.gain.correction()
            } else {
                1.0
            };

        let place = viz::default_placement(self.entry.id);
        let x = cfg.viz_offset_x.unwrap_or(place.x);
        let y = cfg.viz_offset_y.unwrap_or(place.y);
        let scale = cfg.viz_scale.unwrap_or(place.scale);

        let mut start = Color::from_hex(&cfg.color_start);
        let mut end = if cfg.use_gradient {
            Color::from_hex(&cfg.color_end)
        } else {
            start
        };
        if cfg.gradient_motion {
            let phase = (t.sin() + 1.0) / 2.0;
            let (s0, e0) = (start, end);
            start = s0.lerp(e0, phase);
            end = e0.lerp(s0, phase);
        }
        let paint = if cfg.use_gradient {
            Paint::GradientY { start, end, span: h }
        } else {
            Paint::Solid(start)
        };

        c.save();
        c.set_alpha(cfg.viz_opacity);
        c.translate(w * x / 100.0, h * y / 100.0);
        let mut rotation = cfg.viz_rotation.to_radians();
        if cfg.auto_rotate {
            rotation += t * 0.5;
        }
        if rotation != 0.0 {
            c.rotate(rotation);
        }
        if scale != 1.0 {
            c.scale(scale, scale);
        }
        c.line_width = (cfg.viz_thickness * rs).max(0.1);

        let ctx = |advancing: bool| DrawCtx {
            bins: &snap.bins,
            bass: snap.bass,
            volume: snap.volume,
            sens,
            t,
            w,
            h,
            min_dim,
            rs,
            advancing,
            paint,
            color_start: start,
            color_end: end,
            opacity: cfg.viz_opacity,
            font,
        };

        draw(c, &ctx(active), state);

        // Mirror copies re-run the same frame; state stepping already
        // happened on the primary dispatch.
        let mut mirror = |c: &mut Canvas, sx: f32, sy: f32, state: &mut VizState| {
            c.save();
            c.scale(sx, sy);
            draw(c, &ctx(false), state);
            c.restore();
        };
        if cfg.mirror_x {
            mirror(c, -1.0, 1.0, state);
        }
        if cfg.mirror_y {
            mirror(c, 1.0, -1.0, state);
        }
        if cfg.mirror_x && cfg.mirror_y {
            mirror(c, -1.0, -1.0, state);
        }

        c.restore();
    }

    fn apply_fades(&self, frame: &mut RgbaImage) {
        let cfg = &self.cfg;
        let fi = if cfg.fade_in_type == FadeKind::None {
            0.0
        } else {
            cfg.fade_in_duration as f64
        };
        let fo = if cfg.fade_out_type == FadeKind::None {
            0.0
        } else {
            cfg.fade_out_duration as f64
        };
        if fi <= 0.0 && fo <= 0.0 {
            return;
        }
        let a = fade::alpha(self.playhead, self.duration(), fi, fo);
        if a < 1.0 {
            let kind = if self.playhead < fi {
                cfg.fade_in_type
            } else {
                cfg.fade_out_type
            };
            fade::apply(frame, kind, a as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(cfg: VisualConfig) -> RenderSession {
        let sr = 44_100u32;
        let samples = (0..sr as usize)
            .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sr as f32).sin())
            .collect();
        let track = AudioTrack { samples, sample_rate: sr };
        RenderSession::with_dims(cfg, track, Background::none(), false, 192, 108)
    }

    #[test]
    fn switching_visualizers_drops_particle_state() {
        let mut s = session(VisualConfig::default());
        s.set_visualizer("star_burst");
        s.tick(1.0 / 30.0, 0.5, true);
        s.render_frame(true);
        assert!(matches!(s.state, VizState::Sparks(_)));
        s.set_visualizer("spectrum");
        assert!(matches!(s.state, VizState::Empty));
        assert_eq!(s.visualizer(), "spectrum");
    }

    #[test]
    fn paused_ticks_freeze_clock_and_snapshot() {
        let mut s = session(VisualConfig::default());
        s.tick(1.0 / 30.0, 0.1, true);
        let t = s.clock.anim_time();
        let vol = s.analyzer.snapshot().volume;
        for _ in 0..5 {
            s.tick(1.0 / 30.0, 0.1, false);
        }
        assert_eq!(s.clock.anim_time(), t);
        assert_eq!(s.analyzer.snapshot().volume, vol);
    }

    #[test]
    fn background_rate_stays_in_the_sane_range() {
        let mut cfg = VisualConfig::default();
        cfg.bg_speed = 20.0;
        let mut s = session(cfg);
        s.tick(1.0, 0.5, true);
        assert!((s.clock.bg_time() - BG_RATE_MAX as f64).abs() < 1e-6);

        // Zero speed still creeps forward instead of freezing the clip.
        let mut cfg = VisualConfig::default();
        cfg.bg_speed = 0.0;
        cfg.bg_beat_response = 0.0;
        let mut s = session(cfg);
        s.tick(1.0, 0.5, true);
        assert!((s.clock.bg_time() - BG_RATE_MIN as f64).abs() < 1e-6);
    }

    #[test]
    fn renders_a_frame_of_every_layer() {
        let mut cfg = VisualConfig::default();
        cfg.viz_type = "ring".into();
        cfg.use_gradient = true;
        cfg.mirror_x = true;
        let mut s = session(cfg);
        for i in 0..3 {
            s.tick(1.0 / 30.0, i as f64 / 30.0, true);
        }
        let frame = s.render_frame(true);
        assert_eq!((frame.width(), frame.height()), (192, 108));
        // Something was drawn over the black background.
        assert!(frame.pixels().any(|p| p.0[0] > 8));
    }

    #[test]
    fn fade_out_darkens_the_tail() {
        let mut cfg = VisualConfig::default();
        cfg.fade_out_type = FadeKind::Black;
        cfg.fade_out_duration = 0.5;
        let mut s = session(cfg);
        let dur = s.duration();
        s.tick(1.0 / 30.0, dur - 0.01, true);
        let faded = s.render_frame(true);
        let lit = faded.pixels().filter(|p| p.0[0] > 32).count();
        // At 2% remaining alpha nearly everything is black.
        assert!(lit < (faded.width() * faded.height()) as usize / 100);
    }
}
