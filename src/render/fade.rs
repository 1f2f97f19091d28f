use image::RgbaImage;
use rayon::prelude::*;

use crate::config::FadeKind;

/// Attenuation factor for the current playhead. 1.0 outside both fade
/// windows; ramps linearly inside them. The fade-in window wins when the
/// two overlap on a very short track.
pub fn alpha(
    playhead: f64,
    duration: f64,
    fade_in: f64,
    fade_out: f64,
) -> f64 {
    if duration <= 0.0 {
        return 1.0;
    }
    if fade_in > 0.0 && playhead < fade_in {
        return (playhead / fade_in).clamp(0.0, 1.0);
    }
    if fade_out > 0.0 && playhead > duration - fade_out {
        return ((duration - playhead) / fade_out).clamp(0.0, 1.0);
    }
    1.0
}

/// Apply one fade treatment to the finished frame. `alpha` 1.0 is a no-op.
pub fn apply(frame: &mut RgbaImage, kind: FadeKind, alpha: f32) {
    if alpha >= 1.0 || kind == FadeKind::None {
        return;
    }
    let a = alpha.clamp(0.0, 1.0);
    match kind {
        FadeKind::None => {}
        // Plain composite over black and the black overlay coincide on an
        // opaque frame.
        FadeKind::Simple | FadeKind::Black => blend_to(frame, [0, 0, 0], 1.0 - a),
        FadeKind::White => blend_to(frame, [255, 255, 255], 1.0 - a),
        FadeKind::Pixel => {
            let block = (1.0 + (1.0 - a) * 80.0).floor().max(1.0) as u32;
            mosaic(frame, block);
        }
        FadeKind::Blur => {
            let rs = frame.width().min(frame.height()) as f32 / 1000.0;
            let radius = ((1.0 - a) * 30.0 * rs) as u32;
            box_blur(frame, radius);
        }
    }
}

fn blend_to(frame: &mut RgbaImage, target: [u8; 3], t: f32) {
    let t = t.clamp(0.0, 1.0);
    let buf: &mut [u8] = frame;
    buf.par_chunks_mut(4).for_each(|px| {
        for ch in 0..3 {
            px[ch] = (px[ch] as f32 + (target[ch] as f32 - px[ch] as f32) * t) as u8;
        }
    });
}

/// Down-sample then nearest-up-sample, the block size growing as the frame
/// dissolves.
fn mosaic(frame: &mut RgbaImage, block: u32) {
    if block < 2 {
        return;
    }
    let (w, h) = (frame.width(), frame.height());
    let src = frame.clone();
    for by in (0..h).step_by(block as usize) {
        for bx in (0..w).step_by(block as usize) {
            // Sample the block center, as nearest-neighbor scaling would.
            let sx = (bx + block / 2).min(w - 1);
            let sy = (by + block / 2).min(h - 1);
            let px = *src.get_pixel(sx, sy);
            for y in by..(by + block).min(h) {
                for x in bx..(bx + block).min(w) {
                    frame.put_pixel(x, y, px);
                }
            }
        }
    }
}

/// Two-pass separable box blur, a close-enough stand-in for a gaussian at
/// these radii.
pub(crate) fn box_blur(frame: &mut RgbaImage, radius: u32) {
    if radius == 0 {
        return;
    }
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    let r = radius as i32;

    let src = frame.clone();
    let row_len = w as usize * 4;
    {
        let buf: &mut [u8] = frame;
        buf.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
            for x in 0..w {
                let mut acc = [0u32; 3];
                let mut n = 0u32;
                for k in -r..=r {
                    let sx = x + k;
                    if sx >= 0 && sx < w {
                        let p = src.get_pixel(sx as u32, y as u32).0;
                        for ch in 0..3 {
                            acc[ch] += p[ch] as u32;
                        }
                        n += 1;
                    }
                }
                let o = x as usize * 4;
                for ch in 0..3 {
                    row[o + ch] = (acc[ch] / n.max(1)) as u8;
                }
            }
        });
    }

    let src = frame.clone();
    let buf: &mut [u8] = frame;
    buf.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let mut acc = [0u32; 3];
            let mut n = 0u32;
            for k in -r..=r {
                let sy = y as i32 + k;
                if sy >= 0 && sy < h {
                    let p = src.get_pixel(x as u32, sy as u32).0;
                    for ch in 0..3 {
                        acc[ch] += p[ch] as u32;
                    }
                    n += 1;
                }
            }
            let o = x as usize * 4;
            for ch in 0..3 {
                row[o + ch] = (acc[ch] / n.max(1)) as u8;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_ramps_across_fade_in() {
        assert_eq!(alpha(0.0, 10.0, 2.0, 0.0), 0.0);
        assert_eq!(alpha(1.0, 10.0, 2.0, 0.0), 0.5);
        assert_eq!(alpha(2.0, 10.0, 2.0, 0.0), 1.0);
        assert_eq!(alpha(5.0, 10.0, 2.0, 0.0), 1.0);
    }

    #[test]
    fn alpha_ramps_across_fade_out() {
        assert_eq!(alpha(8.0, 10.0, 0.0, 2.0), 1.0);
        assert_eq!(alpha(9.0, 10.0, 0.0, 2.0), 0.5);
        assert_eq!(alpha(10.0, 10.0, 0.0, 2.0), 0.0);
    }

    #[test]
    fn alpha_is_monotonic_within_each_window() {
        let mut prev = -1.0;
        for i in 0..=20 {
            let t = i as f64 * 0.1;
            let a = alpha(t, 10.0, 2.0, 2.0);
            assert!(a >= prev);
            prev = a;
        }
        let mut prev = 2.0;
        for i in 0..=20 {
            let t = 8.0 + i as f64 * 0.1;
            let a = alpha(t, 10.0, 2.0, 2.0);
            assert!(a <= prev);
            prev = a;
        }
    }

    #[test]
    fn zero_duration_track_is_fully_visible() {
        assert_eq!(alpha(0.0, 0.0, 2.0, 2.0), 1.0);
    }

    #[test]
    fn black_fade_at_zero_alpha_blanks_the_frame() {
        let mut frame = RgbaImage::from_pixel(8, 8, image::Rgba([200, 120, 40, 255]));
        apply(&mut frame, FadeKind::Black, 0.0);
        assert_eq!(frame.get_pixel(4, 4).0, [0, 0, 0, 255]);
    }

    #[test]
    fn white_fade_midway_lightens() {
        let mut frame = RgbaImage::from_pixel(8, 8, image::Rgba([100, 100, 100, 255]));
        apply(&mut frame, FadeKind::White, 0.5);
        let px = frame.get_pixel(0, 0).0;
        assert!(px[0] > 100 && px[0] < 255);
    }

    #[test]
    fn full_alpha_is_a_noop() {
        let mut frame = RgbaImage::from_pixel(8, 8, image::Rgba([10, 20, 30, 255]));
        let before = frame.clone();
        apply(&mut frame, FadeKind::Pixel, 1.0);
        assert_eq!(frame, before);
    }

    #[test]
    fn pixel_dissolve_block_grows_as_alpha_falls() {
        let mut frame = RgbaImage::from_fn(64, 64, |x, _| {
            image::Rgba([(x * 4) as u8, 0, 0, 255])
        });
        apply(&mut frame, FadeKind::Pixel, 0.2);
        // Block size at alpha 0.2 is 65px, so the whole frame collapses to
        // one sample.
        assert_eq!(frame.get_pixel(0, 0), frame.get_pixel(60, 60));
    }
}
