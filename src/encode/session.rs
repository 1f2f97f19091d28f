use crossbeam_channel::{bounded, Receiver};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::encode::ffmpeg::{Codec, FfmpegEncoder};
use crate::render::pipeline::RenderSession;

/// Liveness fallback interval. Fires rarely enough to be irrelevant while
/// the primary tick is healthy.
const HEARTBEAT: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("encoder failed to start: {0}")]
    Start(String),
    #[error("encoder rejected a frame: {0}")]
    FrameWrite(String),
    #[error("encoder failed to finalize: {0}")]
    Finalize(String),
}

/// Frame rate and video bitrate for one export run.
#[derive(Debug, Clone, Copy)]
pub struct ExportProfile {
    pub fps: u32,
    pub bitrate: u32,
}

impl ExportProfile {
    /// Safe mode lowers the rate and bitrate to keep the encoder stable on
    /// constrained machines; it also disables the heavier post passes, but
    /// that happens at session construction.
    pub fn for_mode(safe_mode: bool) -> Self {
        if safe_mode {
            ExportProfile { fps: 24, bitrate: 4_000_000 }
        } else {
            ExportProfile { fps: 30, bitrate: 8_000_000 }
        }
    }

    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps as f64
    }
}

enum Pulse {
    Tick,
    Heartbeat,
}

/// Dual-clock frame scheduler: a primary tick at the target frame interval
/// and an independent heartbeat, merged into one channel so the consumer
/// never learns which clock fired. The heartbeat guarantees forward
/// progress if the primary ticker is stalled or deprioritized.
pub struct FrameScheduler {
    rx: Receiver<Pulse>,
    stop: Arc<AtomicBool>,
    next: u64,
    total: u64,
}

impl FrameScheduler {
    pub fn start(fps: u32, total: u64) -> Self {
        let (tx, rx) = bounded(2);
        let stop = Arc::new(AtomicBool::new(false));

        let interval = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        let tick_tx = tx.clone();
        let tick_stop = stop.clone();
        std::thread::spawn(move || {
            while !tick_stop.load(Ordering::Relaxed) {
                if tick_tx.send(Pulse::Tick).is_err() {
                    break;
                }
                std::thread::sleep(interval);
            }
        });
        let beat_stop = stop.clone();
        std::thread::spawn(move || {
            while !beat_stop.load(Ordering::Relaxed) {
                std::thread::sleep(HEARTBEAT);
                if tx.send(Pulse::Heartbeat).is_err() {
                    break;
                }
            }
        });

        Self { rx, stop, next: 0, total }
    }

    /// Block until either clock fires, then yield the next frame index.
    /// None once every frame has been scheduled.
    pub fn next_frame(&mut self) -> Option<u64> {
        if self.next >= self.total {
            return None;
        }
        match self.rx.recv() {
            Ok(Pulse::Tick) | Ok(Pulse::Heartbeat) => {
                let frame = self.next;
                self.next += 1;
                Some(frame)
            }
            Err(_) => None,
        }
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Render every frame of the track and mux it with the source audio.
/// Encoder failure aborts the whole session; the partial output is
/// discarded rather than patched.
pub fn run_export(
    render: &mut RenderSession,
    audio: &Path,
    output: &Path,
    width: u32,
    height: u32,
    codec: Codec,
    profile: ExportProfile,
    mut progress: impl FnMut(u64, u64),
) -> Result<(), ExportError> {
    let dt = profile.frame_interval();
    // A zero-length track still produces one frame so the container is
    // valid and playable.
    let total = ((render.duration() / dt).ceil() as u64).max(1);

    let mut encoder = FfmpegEncoder::new(output, audio, width, height, profile.fps, codec, profile.bitrate)
        .map_err(|e| ExportError::Start(format!("{e:#}")))?;

    // The seamless loop cache is worth a short wait; racing it would bake
    // the live-decode seam into the first seconds of output.
    render.wait_for_background();

    let mut scheduler = FrameScheduler::start(profile.fps, total);
    while let Some(i) = scheduler.next_frame() {
        let playhead = i as f64 * dt;
        render.tick(dt, playhead, true);
        let frame = render.render_frame(true);
        if let Err(e) = encoder.write_frame(frame.as_raw()) {
            encoder.abort();
            return Err(ExportError::FrameWrite(format!("{e:#}")));
        }
        progress(i + 1, total);
    }

    encoder
        .finish()
        .map_err(|e| ExportError::Finalize(format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_match_their_mode() {
        let normal = ExportProfile::for_mode(false);
        let safe = ExportProfile::for_mode(true);
        assert!(safe.fps < normal.fps);
        assert!(safe.bitrate < normal.bitrate);
        assert!((normal.frame_interval() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn scheduler_yields_every_frame_exactly_once() {
        let mut s = FrameScheduler::start(240, 10);
        let mut seen = Vec::new();
        while let Some(i) = s.next_frame() {
            seen.push(i);
        }
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(s.next_frame(), None);
    }

    #[test]
    fn heartbeat_alone_keeps_frames_flowing() {
        // A 1 fps primary tick would take seconds; the heartbeat must carry
        // the schedule forward faster than that.
        let started = std::time::Instant::now();
        let mut s = FrameScheduler::start(1, 4);
        while s.next_frame().is_some() {}
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
