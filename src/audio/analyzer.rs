use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::Arc;

use super::decode::AudioTrack;

const FFT_SIZE: usize = 2048;
/// Number of retained samples per tick, before the band cut. Matches the
/// magnitude bin count of the FFT; time-domain ticks use the same length so
/// every visualizer sees a buffer of the same scale.
const BIN_COUNT: usize = FFT_SIZE / 2;
/// Blend factor toward the new raw value; amplitude changes are critically
/// damped rather than jittering every frame.
const SMOOTHING: f32 = 0.25;
/// Fixed analysis window used when smart cut is enabled.
const SMART_CUT: (f32, f32) = (0.01, 0.60);

/// Which sample domain a visualizer consumes. Fixed per registry entry,
/// never derived from the identifier string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDomain {
    /// Magnitudes normalized to [0, 1].
    Frequency,
    /// Signed deviation in [-1, 1].
    Waveform,
}

/// Smoothed, banded per-frame audio data plus scalar aggregates.
#[derive(Debug, Clone, Default)]
pub struct SpectralSnapshot {
    pub bins: Vec<f32>,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    /// Mean of the three band aggregates.
    pub volume: f32,
}

/// Band cut applied to the raw sample array, as percentages of the bin range.
#[derive(Debug, Clone, Copy)]
pub struct BandCut {
    pub low_pct: f32,
    pub high_pct: f32,
    pub smart: bool,
}

impl BandCut {
    /// Resolve to a half-open bin range. Smart cut overrides the manual
    /// values; a degenerate manual range falls back to the full band.
    pub fn resolve(&self, len: usize) -> (usize, usize) {
        let (lo, hi) = if self.smart {
            SMART_CUT
        } else {
            (self.low_pct / 100.0, self.high_pct / 100.0)
        };
        let start = (lo * len as f32).floor() as usize;
        let end = (hi * len as f32).floor() as usize;
        if start >= end || end > len {
            (0, len)
        } else {
            (start, end)
        }
    }
}

/// Rolling loudness window producing a clamped sensitivity correction.
/// The constants are empirically tuned, not load-bearing.
#[derive(Debug, Clone)]
pub struct GainState {
    window: VecDeque<f32>,
    capacity: usize,
    target: f32,
}

impl GainState {
    pub fn new(capacity: usize, target: f32) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            target,
        }
    }

    pub fn push(&mut self, volume: f32) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(volume);
    }

    /// Multiplicative correction toward the target loudness, in [0.5, 3.0].
    /// Unity when the window is silent or empty.
    pub fn correction(&self) -> f32 {
        if self.window.is_empty() {
            return 1.0;
        }
        let mean = self.window.iter().sum::<f32>() / self.window.len() as f32;
        if mean <= 1e-3 {
            return 1.0;
        }
        (self.target / mean).clamp(0.5, 3.0)
    }
}

/// Converts the decoded track into per-tick spectral snapshots.
///
/// The snapshot buffer is single-writer (the render tick). While paused the
/// previous snapshot persists unchanged; the raw window is still computed so
/// a resume blends from current audio, but nothing is written back.
pub struct SpectralAnalyzer {
    samples: Vec<f32>,
    sample_rate: u32,
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    fft_buf: Vec<Complex<f32>>,
    raw: Vec<f32>,
    snapshot: SpectralSnapshot,
}

impl SpectralAnalyzer {
    pub fn new(track: AudioTrack) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        Self {
            samples: track.samples,
            sample_rate: track.sample_rate,
            fft,
            hann: hann_window(FFT_SIZE),
            fft_buf: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            raw: Vec::new(),
            snapshot: SpectralSnapshot::default(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn snapshot(&self) -> &SpectralSnapshot {
        &self.snapshot
    }

    /// Raw window of the most recent update, before smoothing.
    #[cfg(test)]
    fn raw(&self) -> &[f32] {
        &self.raw
    }

    /// Recompute the snapshot for the window centred on `playhead`.
    /// `advance` is false while paused: the smoothed buffer and aggregates
    /// are left exactly as they were.
    pub fn update(
        &mut self,
        playhead: f64,
        domain: SampleDomain,
        cut: BandCut,
        advance: bool,
    ) -> &SpectralSnapshot {
        if !advance {
            return &self.snapshot;
        }

        let (start, end) = cut.resolve(BIN_COUNT);
        self.fill_raw(playhead, domain, start, end);

        if self.snapshot.bins.len() != self.raw.len() {
            // Band length changed (new session or cut change): seed directly.
            self.snapshot.bins = self.raw.clone();
        } else {
            for (s, &r) in self.snapshot.bins.iter_mut().zip(self.raw.iter()) {
                *s += (r - *s) * SMOOTHING;
            }
        }

        let bins = &self.snapshot.bins;
        let third = (bins.len() / 3).max(1);
        let band_mean = |range: std::ops::Range<usize>| -> f32 {
            let slice = &bins[range.start.min(bins.len())..range.end.min(bins.len())];
            if slice.is_empty() {
                0.0
            } else {
                slice.iter().map(|v| v.abs()).sum::<f32>() / slice.len() as f32
            }
        };
        self.snapshot.bass = band_mean(0..third);
        self.snapshot.mid = band_mean(third..2 * third);
        self.snapshot.treble = band_mean(2 * third..bins.len());
        self.snapshot.volume =
            (self.snapshot.bass + self.snapshot.mid + self.snapshot.treble) / 3.0;

        &self.snapshot
    }

    fn fill_raw(&mut self, playhead: f64, domain: SampleDomain, start: usize, end: usize) {
        let center = (playhead * self.sample_rate as f64) as usize;
        let win_start = center.saturating_sub(FFT_SIZE / 2);

        match domain {
            SampleDomain::Frequency => {
                for i in 0..FFT_SIZE {
                    let s = self.samples.get(win_start + i).copied().unwrap_or(0.0);
                    self.fft_buf[i] = Complex::new(s * self.hann[i], 0.0);
                }
                self.fft.process(&mut self.fft_buf);
                // A full-scale sine under a Hann window peaks near N/4.
                let norm = FFT_SIZE as f32 / 4.0;
                self.raw.clear();
                self.raw.extend(
                    self.fft_buf[start..end]
                        .iter()
                        .map(|c| (c.norm() / norm).min(1.0)),
                );
            }
            SampleDomain::Waveform => {
                self.raw.clear();
                self.raw.extend((start..end).map(|i| {
                    self.samples
                        .get(win_start + i)
                        .copied()
                        .unwrap_or(0.0)
                        .clamp(-1.0, 1.0)
                }));
            }
        }
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_track(freq: f32, secs: f32) -> AudioTrack {
        let sr = 44_100u32;
        let n = (secs * sr as f32) as usize;
        let samples = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        AudioTrack { samples, sample_rate: sr }
    }

    #[test]
    fn smart_cut_overrides_manual_values() {
        let cut = BandCut { low_pct: 0.0, high_pct: 100.0, smart: true };
        assert_eq!(cut.resolve(1024), (10, 614));
        // Manual values are irrelevant while smart is on.
        let cut = BandCut { low_pct: 40.0, high_pct: 45.0, smart: true };
        assert_eq!(cut.resolve(1024), (10, 614));
    }

    #[test]
    fn degenerate_cut_falls_back_to_full_band() {
        let cut = BandCut { low_pct: 80.0, high_pct: 20.0, smart: false };
        assert_eq!(cut.resolve(1024), (0, 1024));
    }

    #[test]
    fn smoothing_never_overshoots() {
        let mut an = SpectralAnalyzer::new(sine_track(440.0, 2.0));
        let cut = BandCut { low_pct: 0.0, high_pct: 100.0, smart: false };
        an.update(0.5, SampleDomain::Frequency, cut, true);
        let prev = an.snapshot().bins.clone();
        an.update(1.0, SampleDomain::Frequency, cut, true);
        // Each smoothed value lies between its previous value and the raw
        // sample of this window, having moved exactly the blend fraction of
        // the distance toward it.
        let raw = an.raw().to_vec();
        assert_eq!(prev.len(), raw.len());
        for ((p, r), s) in prev.iter().zip(raw.iter()).zip(an.snapshot().bins.iter()) {
            let (lo, hi) = (p.min(*r), p.max(*r));
            assert!((lo - 1e-6..=hi + 1e-6).contains(s));
            assert!(((s - p) - (r - p) * SMOOTHING).abs() < 1e-5);
            assert!((0.0..=1.0).contains(s));
        }
    }

    #[test]
    fn paused_snapshot_persists() {
        let mut an = SpectralAnalyzer::new(sine_track(440.0, 2.0));
        let cut = BandCut { low_pct: 0.0, high_pct: 100.0, smart: false };
        an.update(0.5, SampleDomain::Frequency, cut, true);
        let before = an.snapshot().clone();
        an.update(1.5, SampleDomain::Frequency, cut, false);
        assert_eq!(before.bins, an.snapshot().bins);
        assert_eq!(before.volume, an.snapshot().volume);
    }

    #[test]
    fn sine_energy_lands_in_low_band() {
        let mut an = SpectralAnalyzer::new(sine_track(200.0, 2.0));
        let cut = BandCut { low_pct: 0.0, high_pct: 100.0, smart: false };
        // Run a few ticks so smoothing converges toward the raw spectrum.
        for i in 0..20 {
            an.update(0.5 + i as f64 * 0.01, SampleDomain::Frequency, cut, true);
        }
        let snap = an.snapshot();
        assert!(snap.bass > snap.treble * 3.0);
        assert!(snap.volume > 0.0);
    }

    #[test]
    fn waveform_domain_is_signed() {
        let mut an = SpectralAnalyzer::new(sine_track(100.0, 1.0));
        let cut = BandCut { low_pct: 0.0, high_pct: 100.0, smart: false };
        an.update(0.5, SampleDomain::Waveform, cut, true);
        let bins = &an.snapshot().bins;
        assert!(bins.iter().any(|&v| v > 0.1));
        assert!(bins.iter().any(|&v| v < -0.1));
        assert!(bins.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn gain_correction_is_clamped() {
        let mut gain = GainState::new(60, 0.2);
        assert_eq!(gain.correction(), 1.0);
        for _ in 0..60 {
            gain.push(0.01);
        }
        assert_eq!(gain.correction(), 3.0);
        for _ in 0..60 {
            gain.push(0.9);
        }
        assert_eq!(gain.correction(), 0.5);
        for _ in 0..60 {
            gain.push(0.2);
        }
        assert!((gain.correction() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn gain_window_is_bounded() {
        let mut gain = GainState::new(60, 0.2);
        for _ in 0..500 {
            gain.push(0.4);
        }
        assert_eq!(gain.window.len(), 60);
    }
}
