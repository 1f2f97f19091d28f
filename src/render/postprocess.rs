use image::RgbaImage;
use rayon::prelude::*;

use crate::config::VisualConfig;

/// Volume gate below which the glitch tear stays quiet.
const GLITCH_VOLUME_GATE: f32 = 0.1;

/// Enabled full-frame effects, applied in a fixed order after the visual
/// layers are composited: color/geometry distortions first, additive
/// overlays last.
#[derive(Debug, Clone, Default)]
pub struct PostFx {
    pub kaleidoscope: bool,
    pub shake: f32,
    pub glitch: f32,
    pub rgb_shift: f32,
    pub pixelate: bool,
    pub vignette: bool,
    pub scanlines: bool,
    pub noise: bool,
    pub invert: bool,
}

impl PostFx {
    /// Safe mode drops the heavier distortion passes to keep export stable.
    pub fn from_config(cfg: &VisualConfig, safe_mode: bool) -> Self {
        PostFx {
            kaleidoscope: cfg.kaleidoscope && !safe_mode,
            shake: cfg.shake_intensity,
            glitch: cfg.glitch_intensity,
            rgb_shift: if safe_mode { 0.0 } else { cfg.rgb_shift_intensity },
            pixelate: cfg.pixelate,
            vignette: cfg.vignette,
            scanlines: cfg.scanlines,
            noise: cfg.noise && !safe_mode,
            invert: cfg.invert,
        }
    }

    pub fn is_active(&self) -> bool {
        self.kaleidoscope
            || self.shake > 0.0
            || self.glitch > 0.0
            || self.rgb_shift > 0.0
            || self.pixelate
            || self.vignette
            || self.scanlines
            || self.noise
            || self.invert
    }
}

pub fn apply(frame: &mut RgbaImage, fx: &PostFx, volume: f32) {
    if !fx.is_active() {
        return;
    }
    let rs = frame.width().min(frame.height()) as f32 / 1000.0;

    if fx.kaleidoscope {
        kaleidoscope(frame);
    }
    if fx.shake > 0.0 {
        let amp = fx.shake * (0.5 + volume) * 30.0 * rs;
        let dx = ((fastrand::f32() - 0.5) * amp) as i32;
        let dy = ((fastrand::f32() - 0.5) * amp) as i32;
        shift(frame, dx, dy);
    }
    if fx.glitch > 0.0 && volume > GLITCH_VOLUME_GATE {
        glitch(frame, fx.glitch, rs);
    }
    if fx.rgb_shift > 0.0 {
        rgb_shift(frame, (fx.rgb_shift * 10.0 * rs).max(1.0) as u32);
    }
    if fx.pixelate {
        pixelate(frame, (10.0 * rs).max(2.0) as u32);
    }
    if fx.vignette {
        vignette(frame);
    }
    if fx.scanlines {
        scanlines(frame);
    }
    if fx.noise {
        noise(frame);
    }
    if fx.invert {
        invert(frame);
    }
}

/// Eight-sector angular fold around the frame center.
fn kaleidoscope(frame: &mut RgbaImage) {
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let src = frame.clone();
    let sector = std::f32::consts::TAU / 8.0;
    let row_len = w as usize * 4;
    let buf: &mut [u8] = frame;
    buf.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let r = dx.hypot(dy);
            let mut a = dy.atan2(dx).rem_euclid(sector * 2.0);
            if a > sector {
                a = sector * 2.0 - a;
            }
            let sx = (cx + a.cos() * r).clamp(0.0, w as f32 - 1.0) as u32;
            let sy = (cy + a.sin() * r).clamp(0.0, h as f32 - 1.0) as u32;
            let px = src.get_pixel(sx, sy).0;
            let o = x as usize * 4;
            row[o..o + 4].copy_from_slice(&px);
        }
    });
}

/// Whole-frame translation, exposed edges filled black.
fn shift(frame: &mut RgbaImage, dx: i32, dy: i32) {
    if dx == 0 && dy == 0 {
        return;
    }
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    let src = frame.clone();
    for y in 0..h {
        for x in 0..w {
            let sx = x - dx;
            let sy = y - dy;
            let px = if sx >= 0 && sx < w && sy >= 0 && sy < h {
                *src.get_pixel(sx as u32, sy as u32)
            } else {
                image::Rgba([0, 0, 0, 255])
            };
            frame.put_pixel(x as u32, y as u32, px);
        }
    }
}

/// Re-blits random horizontal bands with a horizontal offset.
fn glitch(frame: &mut RgbaImage, intensity: f32, rs: f32) {
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    let src = frame.clone();
    let bands = (intensity * 8.0).ceil() as usize;
    for _ in 0..bands {
        if fastrand::f32() > intensity {
            continue;
        }
        let band_h = (10.0 + fastrand::f32() * 70.0 * rs) as i32;
        let y0 = fastrand::i32(0..h.max(1));
        let off = ((fastrand::f32() - 0.5) * intensity * 200.0 * rs) as i32;
        for y in y0..(y0 + band_h).min(h) {
            for x in 0..w {
                let sx = (x - off).rem_euclid(w);
                let px = *src.get_pixel(sx as u32, y as u32);
                frame.put_pixel(x as u32, y as u32, px);
            }
        }
    }
}

/// Opposing horizontal offsets on the red and blue channels.
fn rgb_shift(frame: &mut RgbaImage, offset: u32) {
    let w = frame.width();
    let src = frame.clone();
    let row_len = w as usize * 4;
    let buf: &mut [u8] = frame;
    buf.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let rx = x.saturating_sub(offset);
            let bx = (x + offset).min(w - 1);
            let o = x as usize * 4;
            row[o] = src.get_pixel(rx, y as u32).0[0];
            row[o + 2] = src.get_pixel(bx, y as u32).0[2];
        }
    });
}

/// Nearest-neighbor mosaic with the given block size.
fn pixelate(frame: &mut RgbaImage, block: u32) {
    if block < 2 {
        return;
    }
    let (w, h) = (frame.width(), frame.height());
    let src = frame.clone();
    for by in (0..h).step_by(block as usize) {
        for bx in (0..w).step_by(block as usize) {
            let px = *src.get_pixel(bx, by);
            for y in by..(by + block).min(h) {
                for x in bx..(bx + block).min(w) {
                    frame.put_pixel(x, y, px);
                }
            }
        }
    }
}

/// Radial darkening: untouched inside a third of the width, up to 80%
/// black at the frame corners.
fn vignette(frame: &mut RgbaImage) {
    let (w, h) = (frame.width(), frame.height());
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let inner = w as f32 / 3.0;
    let outer = w as f32 * 0.9;
    let row_len = w as usize * 4;
    let buf: &mut [u8] = frame;
    buf.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let d = (x as f32 - cx).hypot(y as f32 - cy);
            let t = ((d - inner) / (outer - inner)).clamp(0.0, 1.0) * 0.8;
            if t > 0.0 {
                let o = x as usize * 4;
                for ch in 0..3 {
                    row[o + ch] = (row[o + ch] as f32 * (1.0 - t)) as u8;
                }
            }
        }
    });
}

/// Darken every fourth row by 20%.
fn scanlines(frame: &mut RgbaImage) {
    let row_len = frame.width() as usize * 4;
    let buf: &mut [u8] = frame;
    buf.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        if y % 4 == 0 {
            for px in row.chunks_mut(4) {
                for ch in 0..3 {
                    px[ch] = (px[ch] as f32 * 0.8) as u8;
                }
            }
        }
    });
}

/// Low-alpha random grain.
fn noise(frame: &mut RgbaImage) {
    let seed = fastrand::u32(..);
    let row_len = frame.width() as usize * 4;
    let buf: &mut [u8] = frame;
    buf.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        let mut rng = fastrand::Rng::with_seed(seed as u64 ^ (y as u64).wrapping_mul(0x9e3779b9));
        for px in row.chunks_mut(4) {
            let grain = (rng.f32() - 0.5) * 40.0;
            for ch in 0..3 {
                px[ch] = (px[ch] as f32 + grain).clamp(0.0, 255.0) as u8;
            }
        }
    });
}

fn invert(frame: &mut RgbaImage) {
    let buf: &mut [u8] = frame;
    buf.par_chunks_mut(4).for_each(|px| {
        for ch in 0..3 {
            px[ch] = 255 - px[ch];
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            let v = (x * 255 / w.max(1)) as u8;
            image::Rgba([v, v, v, 255])
        })
    }

    #[test]
    fn inactive_stack_leaves_frame_untouched() {
        let mut frame = gradient_frame(32, 32);
        let before = frame.clone();
        apply(&mut frame, &PostFx::default(), 1.0);
        assert_eq!(frame, before);
    }

    #[test]
    fn invert_flips_channels() {
        let mut frame = RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
        invert(&mut frame);
        assert_eq!(frame.get_pixel(0, 0).0, [245, 235, 225, 255]);
    }

    #[test]
    fn scanlines_darken_every_fourth_row() {
        let mut frame = RgbaImage::from_pixel(8, 8, image::Rgba([100, 100, 100, 255]));
        scanlines(&mut frame);
        assert_eq!(frame.get_pixel(0, 0).0[0], 80);
        assert_eq!(frame.get_pixel(0, 1).0[0], 100);
        assert_eq!(frame.get_pixel(0, 4).0[0], 80);
    }

    #[test]
    fn vignette_darkens_corners_more_than_center() {
        let mut frame = RgbaImage::from_pixel(100, 100, image::Rgba([200, 200, 200, 255]));
        vignette(&mut frame);
        let center = frame.get_pixel(50, 50).0[0];
        let corner = frame.get_pixel(0, 0).0[0];
        assert!(corner < center);
    }

    #[test]
    fn pixelate_makes_blocks_uniform() {
        let mut frame = gradient_frame(32, 32);
        pixelate(&mut frame, 8);
        for x in 0..8 {
            assert_eq!(frame.get_pixel(x, 0), frame.get_pixel(0, 0));
        }
    }

    #[test]
    fn shake_shifts_content() {
        let mut frame = RgbaImage::from_pixel(16, 16, image::Rgba([0, 0, 0, 255]));
        frame.put_pixel(8, 8, image::Rgba([255, 255, 255, 255]));
        shift(&mut frame, 3, 0);
        assert_eq!(frame.get_pixel(11, 8).0, [255, 255, 255, 255]);
        assert_eq!(frame.get_pixel(8, 8).0, [0, 0, 0, 255]);
    }

    #[test]
    fn safe_mode_drops_heavy_passes() {
        let mut cfg = VisualConfig::default();
        cfg.kaleidoscope = true;
        cfg.noise = true;
        cfg.rgb_shift_intensity = 0.5;
        cfg.vignette = true;
        let fx = PostFx::from_config(&cfg, true);
        assert!(!fx.kaleidoscope);
        assert!(!fx.noise);
        assert_eq!(fx.rgb_shift, 0.0);
        assert!(fx.vignette);
    }
}
