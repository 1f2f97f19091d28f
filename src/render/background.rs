use anyhow::{Context, Result};
use image::RgbaImage;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{LoopMode, VisualConfig};
use crate::render::canvas::{Canvas, Color, Composite, Paint};
use crate::render::fade;

/// Hard cap on cached ping-pong frames.
const MAX_CACHE_FRAMES: usize = 240;
/// Cached frames are downscaled to fit this box.
const CACHE_MAX_W: u32 = 960;
const CACHE_MAX_H: u32 = 540;
/// Live decode is capped at full HD regardless of source size.
const LIVE_MAX_W: u32 = 1920;
const LIVE_MAX_H: u32 = 1080;
/// Extraction gives up after this long.
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);

const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "tiff", "gif"];

#[derive(Debug, Clone, Copy)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: f64,
}

/// Stream metadata via ffprobe.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let out = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate",
            "-show_entries", "format=duration",
            "-of", "csv=p=0",
        ])
        .arg(path)
        .output()
        .context("Failed to run ffprobe. Is ffmpeg installed?")?;
    if !out.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr)
        );
    }

    let text = String::from_utf8_lossy(&out.stdout);
    let mut width = 0u32;
    let mut height = 0u32;
    let mut fps = 30.0f64;
    let mut duration = 0.0f64;
    for line in text.lines() {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() >= 3 {
            width = fields[0].parse().unwrap_or(0);
            height = fields[1].parse().unwrap_or(0);
            fps = parse_rate(fields[2]).unwrap_or(30.0);
        } else if fields.len() == 1 && !fields[0].is_empty() {
            duration = fields[0].parse().unwrap_or(0.0);
        }
    }
    if width == 0 || height == 0 {
        anyhow::bail!("No video stream in {}", path.display());
    }
    Ok(VideoInfo { width, height, fps: fps.max(1.0), duration: duration.max(0.0) })
}

fn parse_rate(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((n, d)) => {
            let n: f64 = n.parse().ok()?;
            let d: f64 = d.parse().ok()?;
            if d > 0.0 {
                Some(n / d)
            } else {
                None
            }
        }
        None => s.parse().ok(),
    }
}

/// Sequential raw-frame decoder over an ffmpeg pipe.
struct FrameReader {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    buf: Vec<u8>,
}

impl FrameReader {
    fn open(path: &Path, width: u32, height: u32) -> Result<Self> {
        let scale = format!("scale={}:{}", width, height);
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args([
                "-f", "rawvideo",
                "-pix_fmt", "rgba",
                "-vf", scale.as_str(),
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;
        let stdout = child.stdout.take().context("ffmpeg stdout not available")?;
        Ok(Self {
            child,
            stdout,
            width,
            height,
            buf: vec![0u8; (width * height * 4) as usize],
        })
    }

    /// Next decoded frame, or None at end of stream.
    fn next(&mut self) -> Result<Option<RgbaImage>> {
        match self.stdout.read_exact(&mut self.buf) {
            Ok(()) => Ok(RgbaImage::from_raw(self.width, self.height, self.buf.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e).context("Failed to read decoded frame"),
        }
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn fit(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let scale = f64::min(1.0, f64::min(max_w as f64 / w as f64, max_h as f64 / h as f64));
    let fw = ((w as f64 * scale) as u32).max(2) & !1;
    let fh = ((h as f64 * scale) as u32).max(2) & !1;
    (fw, fh)
}

/// Fully extracted ping-pong frame sequence.
pub struct FrameCache {
    pub frames: Vec<RgbaImage>,
    pub capture_fps: f64,
}

/// Triangular index map: forward to the last frame, then back to zero.
pub fn yoyo_index(time: f64, capture_fps: f64, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let span = (len - 1) as f64;
    let pos = (time * capture_fps).rem_euclid(span * 2.0);
    let idx = if pos <= span { pos } else { span * 2.0 - pos };
    (idx as usize).min(len - 1)
}

/// In-flight cache extraction on a worker thread; cancelled by drop.
pub struct FrameCacheTask {
    rx: crossbeam_channel::Receiver<Result<FrameCache>>,
    cancel: Arc<AtomicBool>,
}

impl FrameCacheTask {
    pub fn spawn(path: PathBuf, info: VideoInfo) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        std::thread::spawn(move || {
            let result = extract(&path, info, &flag);
            let _ = tx.send(result);
        });
        Self { rx, cancel }
    }

    /// Completed result if the worker has finished, None while running.
    pub fn poll(&self) -> Option<Result<FrameCache>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for FrameCacheTask {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

fn extract(path: &Path, info: VideoInfo, cancel: &AtomicBool) -> Result<FrameCache> {
    let (cw, ch) = fit(info.width, info.height, CACHE_MAX_W, CACHE_MAX_H);
    let mut reader = FrameReader::open(path, cw, ch)?;
    let started = Instant::now();
    let mut frames = Vec::new();
    let mut exhausted = false;
    while frames.len() < MAX_CACHE_FRAMES {
        if cancel.load(Ordering::Relaxed) {
            anyhow::bail!("extraction cancelled");
        }
        if started.elapsed() > EXTRACT_TIMEOUT {
            log::warn!("Frame extraction timed out after {} frames", frames.len());
            break;
        }
        match reader.next()? {
            Some(frame) => frames.push(frame),
            None => {
                exhausted = true;
                break;
            }
        }
    }
    if frames.is_empty() {
        anyhow::bail!("No frames decoded from {}", path.display());
    }
    let capture_fps = capture_rate(frames.len(), exhausted, &info);
    log::info!(
        "Cached {} frames at {}x{} ({:.1} fps)",
        frames.len(),
        cw,
        ch,
        capture_fps
    );
    Ok(FrameCache { frames, capture_fps })
}

/// Decoded frame count over the clip span it covers. Only measurable when
/// the reader drained the whole clip; a capped or timed-out extraction
/// falls back to the probed stream rate.
fn capture_rate(decoded: usize, exhausted: bool, info: &VideoInfo) -> f64 {
    if exhausted && info.duration > 0.0 {
        decoded as f64 / info.duration
    } else {
        info.fps
    }
}

enum CacheState {
    Idle,
    Extracting(FrameCacheTask),
    Ready(FrameCache),
    Failed,
}

enum Source {
    None,
    Image(RgbaImage),
    Video { path: PathBuf, info: VideoInfo },
}

/// Bottom compositing layer: image, live video, or the cached ping-pong
/// sequence, with loop-boundary transitions for native video loops.
pub struct Background {
    source: Source,
    cache: CacheState,
    reader: Option<FrameReader>,
    position: f64,
    current: Option<RgbaImage>,
    live_dims: (u32, u32),
}

impl Background {
    pub fn none() -> Self {
        Self {
            source: Source::None,
            cache: CacheState::Idle,
            reader: None,
            position: 0.0,
            current: None,
            live_dims: (0, 0),
        }
    }

    /// Open an image or video by probing the file. Yo-yo extraction starts
    /// immediately when requested for a video source.
    pub fn open(path: &Path, yoyo: bool) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if IMAGE_EXTS.contains(&ext.as_str()) {
            let img = image::open(path)
                .with_context(|| format!("Failed to load background image {}", path.display()))?
                .to_rgba8();
            log::info!("Background image {}x{}", img.width(), img.height());
            return Ok(Self { source: Source::Image(img), ..Self::none() });
        }

        let info = probe_video(path)?;
        log::info!(
            "Background video {}x{} {:.1}fps {:.1}s",
            info.width,
            info.height,
            info.fps,
            info.duration
        );
        let cache = if yoyo {
            CacheState::Extracting(FrameCacheTask::spawn(path.to_path_buf(), info))
        } else {
            CacheState::Idle
        };
        Ok(Self {
            source: Source::Video { path: path.to_path_buf(), info },
            cache,
            live_dims: fit(info.width, info.height, LIVE_MAX_W, LIVE_MAX_H),
            ..Self::none()
        })
    }

    /// True while yo-yo extraction is still running.
    pub fn processing(&self) -> bool {
        matches!(self.cache, CacheState::Extracting(_))
    }

    /// Block until extraction settles one way or the other. Offline export
    /// wants the seamless cache rather than racing it to the first frame.
    pub fn wait_for_cache(&mut self) {
        while self.processing() {
            self.poll_cache();
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    fn poll_cache(&mut self) {
        if let CacheState::Extracting(task) = &self.cache {
            match task.poll() {
                Some(Ok(cache)) => self.cache = CacheState::Ready(cache),
                Some(Err(err)) => {
                    log::warn!("Frame extraction failed, falling back to live decode: {err:#}");
                    self.cache = CacheState::Failed;
                }
                None => {}
            }
        }
    }

    /// Draw the background for this frame. `bg_time` is the speed-scaled
    /// background clock in seconds.
    pub fn draw(&mut self, c: &mut Canvas, cfg: &VisualConfig, bg_time: f64) {
        self.poll_cache();
        match &self.source {
            Source::None => {}
            Source::Image(img) => draw_cover(c, img, cfg),
            Source::Video { path, info } => {
                let (path, info) = (path.clone(), *info);
                if let CacheState::Ready(cache) = &self.cache {
                    let idx = yoyo_index(bg_time, cache.capture_fps, cache.frames.len());
                    let frame = cache.frames[idx].clone();
                    draw_cover(c, &frame, cfg);
                    return;
                }
                if let Err(err) = self.advance_live(&path, info, bg_time) {
                    log::warn!("Background decode failed: {err:#}");
                    self.reader = None;
                    return;
                }
                let Some(frame) = self.current.clone() else { return };
                self.draw_live(c, &frame, cfg, info);
            }
        }
    }

    /// Step the sequential decoder to the frame covering `bg_time` within
    /// the native loop.
    fn advance_live(&mut self, path: &Path, info: VideoInfo, bg_time: f64) -> Result<()> {
        let duration = if info.duration > 0.0 {
            info.duration
        } else {
            f64::MAX
        };
        let target = bg_time.rem_euclid(duration);
        let step = 1.0 / info.fps;

        if self.reader.is_none() || target + step < self.position {
            // Fresh session or loop wrap: restart the pipe from zero.
            let (w, h) = self.live_dims;
            self.reader = Some(FrameReader::open(path, w, h)?);
            self.position = 0.0;
            self.current = None;
        }
        let Some(reader) = self.reader.as_mut() else { return Ok(()) };
        while self.current.is_none() || self.position + step <= target {
            match reader.next()? {
                Some(frame) => {
                    self.current = Some(frame);
                    self.position += step;
                }
                None => {
                    // Natural end: next call restarts from zero.
                    self.reader = None;
                    self.position = target;
                    break;
                }
            }
        }
        Ok(())
    }

    fn draw_live(&self, c: &mut Canvas, frame: &RgbaImage, cfg: &VisualConfig, info: VideoInfo) {
        let rs = c.min_dim() / 1000.0;
        let loop_dur = cfg.bg_loop_duration as f64;
        let mut alpha = 1.0f32;
        if cfg.bg_loop_mode != LoopMode::Cut
            && loop_dur > 0.0
            && info.duration > loop_dur * 2.0
        {
            let t = self.position;
            if t < loop_dur {
                alpha = (t / loop_dur) as f32;
            } else if t > info.duration - loop_dur {
                alpha = ((info.duration - t) / loop_dur) as f32;
            }
        }

        if alpha >= 1.0 {
            draw_cover(c, frame, cfg);
            return;
        }

        match cfg.bg_loop_mode {
            LoopMode::Fade | LoopMode::WashBlack => {
                draw_cover(c, frame, cfg);
                overlay(c, Color::BLACK.with_alpha(1.0 - alpha));
            }
            LoopMode::WashWhite => {
                draw_cover(c, frame, cfg);
                overlay(c, Color::WHITE.with_alpha(1.0 - alpha));
            }
            LoopMode::Blur => {
                let mut blurred = frame.clone();
                fade::box_blur(&mut blurred, ((1.0 - alpha) * 40.0 * rs) as u32);
                draw_cover(c, &blurred, cfg);
            }
            LoopMode::Zoom => {
                let s = 1.0 + (1.0 - alpha) * 0.2;
                c.save();
                c.translate(c.width() as f32 / 2.0, c.height() as f32 / 2.0);
                c.scale(s, s);
                c.translate(-(c.width() as f32) / 2.0, -(c.height() as f32) / 2.0);
                draw_cover(c, frame, cfg);
                c.restore();
            }
            LoopMode::Slide => {
                c.save();
                c.translate((1.0 - alpha) * c.width() as f32, 0.0);
                draw_cover(c, frame, cfg);
                c.restore();
            }
            LoopMode::Ghost => {
                draw_cover(c, frame, cfg);
                c.save();
                c.set_alpha((1.0 - alpha) * 0.5);
                c.translate(10.0 * rs, 0.0);
                draw_cover_composite(c, frame, cfg, Composite::Screen);
                c.restore();
            }
            LoopMode::Glitch => {
                if fastrand::f32() > alpha {
                    c.save();
                    c.translate((fastrand::f32() - 0.5) * 50.0 * rs, 0.0);
                    draw_cover(c, frame, cfg);
                    c.restore();
                } else {
                    draw_cover(c, frame, cfg);
                }
            }
            LoopMode::Cut => draw_cover(c, frame, cfg),
        }
    }
}

/// Aspect-fill blit honoring the configured zoom/pan/rotation.
fn draw_cover(c: &mut Canvas, img: &RgbaImage, cfg: &VisualConfig) {
    draw_cover_composite(c, img, cfg, Composite::SourceOver);
}

fn draw_cover_composite(c: &mut Canvas, img: &RgbaImage, cfg: &VisualConfig, comp: Composite) {
    let (iw, ih) = (img.width() as f32, img.height() as f32);
    if iw == 0.0 || ih == 0.0 {
        return;
    }
    let (w, h) = (c.width() as f32, c.height() as f32);
    let r = f32::max(w / iw, h / ih) * cfg.bg_zoom.max(0.01);
    c.save();
    c.translate(w * cfg.bg_offset_x / 100.0, h * cfg.bg_offset_y / 100.0);
    if cfg.bg_rotation != 0.0 {
        c.rotate(cfg.bg_rotation.to_radians());
    }
    c.draw_image_composite(img, -(iw * r) / 2.0, -(ih * r) / 2.0, iw * r, ih * r, comp);
    c.restore();
}

fn overlay(c: &mut Canvas, color: Color) {
    let (w, h) = (c.width() as f32, c.height() as f32);
    c.fill_rect(0.0, 0.0, w, h, &Paint::Solid(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yoyo_index_is_bounded_and_palindromic() {
        let len = 10;
        let fps = 1.0;
        let span = (len - 1) as f64;
        let cycle = span * 2.0 / fps;
        // Quarter-frame steps are exact in binary, so both paths truncate
        // identically.
        for i in 0..400 {
            let t = i as f64 * 0.25;
            let idx = yoyo_index(t, fps, len);
            assert!(idx < len);
            let mirrored = yoyo_index(cycle - t.rem_euclid(cycle), fps, len);
            assert_eq!(idx, mirrored, "t={t}");
        }
    }

    #[test]
    fn yoyo_index_reverses_after_the_last_frame() {
        let fps = 1.0;
        let len = 4; // cycle: 0 1 2 3 2 1 | 0 1 ...
        let expect = [0, 1, 2, 3, 2, 1, 0, 1, 2];
        for (i, &want) in expect.iter().enumerate() {
            assert_eq!(yoyo_index(i as f64, fps, len), want);
        }
    }

    #[test]
    fn single_frame_cache_always_indexes_zero() {
        assert_eq!(yoyo_index(123.4, 30.0, 1), 0);
        assert_eq!(yoyo_index(0.0, 30.0, 0), 0);
    }

    #[test]
    fn fit_preserves_aspect_and_caps() {
        assert_eq!(fit(1920, 1080, 960, 540), (960, 540));
        assert_eq!(fit(640, 360, 960, 540), (640, 360));
        let (w, h) = fit(4096, 2160, 960, 540);
        assert!(w <= 960 && h <= 540);
        assert_eq!(w % 2, 0);
        assert_eq!(h % 2, 0);
    }

    #[test]
    fn capture_rate_is_measured_from_the_decoded_count() {
        let info = VideoInfo { width: 640, height: 360, fps: 30.0, duration: 2.0 };
        // Whole clip drained: the measured rate wins over the probed one.
        assert_eq!(capture_rate(48, true, &info), 24.0);
        // Capped or timed out: only part of the clip is covered, so the
        // probed stream rate stands.
        assert_eq!(capture_rate(240, false, &info), 30.0);
        let no_dur = VideoInfo { duration: 0.0, ..info };
        assert_eq!(capture_rate(48, true, &no_dur), 30.0);
    }

    #[test]
    fn parses_frame_rates() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert_eq!(parse_rate("30000/1001").map(|f| f.round()), Some(30.0));
        assert_eq!(parse_rate("25"), Some(25.0));
        assert_eq!(parse_rate("0/0"), None);
    }

    #[test]
    fn none_background_draws_nothing() {
        let mut bg = Background::none();
        let mut c = Canvas::new(32, 32);
        bg.draw(&mut c, &VisualConfig::default(), 1.0);
        assert_eq!(c.image().get_pixel(16, 16).0, [0, 0, 0, 255]);
        assert!(!bg.processing());
    }
}
