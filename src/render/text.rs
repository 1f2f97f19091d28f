use fontdue::{Font, FontSettings};
use std::path::Path;

use crate::config::{TextPosition, TextReact, VisualConfig};
use crate::render::canvas::{Canvas, Color};

/// System font candidates tried when the configuration does not name one.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
];

/// Title/artist overlay with beat-driven modulation.
pub struct TextOverlay {
    font: Option<Font>,
}

impl TextOverlay {
    pub fn new(path: Option<&Path>) -> Self {
        let font = load_font(path);
        if font.is_none() {
            log::warn!("No usable font found; text overlay disabled");
        }
        Self { font }
    }

    pub fn font(&self) -> Option<&Font> {
        self.font.as_ref()
    }

    /// Composite both text lines onto the frame. `volume` drives the
    /// reactive mode, `t` is the visual clock in seconds.
    pub fn draw(&self, c: &mut Canvas, cfg: &VisualConfig, volume: f32, t: f32) {
        let Some(font) = &self.font else { return };
        if cfg.title.is_empty() && cfg.artist.is_empty() {
            return;
        }

        let (w, h) = (c.width() as f32, c.height() as f32);
        let rs = c.min_dim() / 1000.0;
        let r = volume * cfg.text_sensitivity;

        let pulse = if cfg.text_react == TextReact::Pulse { 1.0 + r * 0.5 } else { 1.0 };
        let margin = cfg.text_margin / 100.0 * w;
        let mut base = 80.0 * rs * cfg.font_size_scale * pulse;

        // Shrink until the longer line fits the horizontal safe area.
        let avail = (w - 2.0 * margin).max(10.0);
        let widest = measure(font, &cfg.title, base)
            .max(measure(font, &cfg.artist, base * 0.5));
        if widest > avail {
            base *= avail / widest;
        }

        let (mut tx, mut ty, align) = anchor(cfg.text_position, w, h, margin, base);
        tx += cfg.text_offset_x * w / 100.0;
        ty += cfg.text_offset_y * h / 100.0;

        let mut alpha = 1.0;
        match cfg.text_react {
            TextReact::Jitter => {
                tx += (fastrand::f32() - 0.5) * r * 20.0 * rs;
                ty += (fastrand::f32() - 0.5) * r * 20.0 * rs;
            }
            TextReact::Bounce => {
                ty -= (t * 4.0).sin().abs() * r * 60.0 * rs;
            }
            TextReact::Flash => {
                alpha = 1.0 - r.min(1.0) * 0.8;
            }
            _ => {}
        }

        let glow = if cfg.text_react == TextReact::Glow {
            Some(15.0 * rs * (1.0 + r * 2.0))
        } else if cfg.text_glow {
            Some(15.0 * rs)
        } else {
            None
        };

        let mut top = Color::from_hex(&cfg.text_color);
        let mut bottom = if cfg.use_text_gradient {
            Color::from_hex(&cfg.text_color_end)
        } else {
            top
        };
        if cfg.text_gradient_motion {
            let end = Color::from_hex(&cfg.text_color_end);
            let phase = ((t).sin() + 1.0) / 2.0;
            top = top.lerp(end, phase);
            bottom = end.lerp(Color::from_hex(&cfg.text_color), phase);
        }

        let style = LineStyle {
            top,
            bottom,
            alpha,
            glow,
            outline: if cfg.text_outline { Some(4.0 * rs) } else { None },
            bold: true,
        };
        draw_line(c, font, &cfg.title, tx, ty, base, align, &style);

        let artist_style = LineStyle {
            outline: if cfg.text_outline { Some(2.0 * rs) } else { None },
            bold: false,
            ..style
        };
        draw_line(
            c,
            font,
            &cfg.artist,
            tx,
            ty + base * 0.8,
            base * 0.5,
            align,
            &artist_style,
        );
    }
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy)]
struct LineStyle {
    top: Color,
    bottom: Color,
    alpha: f32,
    glow: Option<f32>,
    outline: Option<f32>,
    bold: bool,
}

fn anchor(pos: TextPosition, w: f32, h: f32, margin: f32, base: f32) -> (f32, f32, Align) {
    let top_y = margin + base;
    let bottom_y = h - margin - base * 0.5;
    match pos {
        TextPosition::Center => (w / 2.0, h / 2.0, Align::Center),
        TextPosition::Top => (w / 2.0, top_y, Align::Center),
        TextPosition::Bottom => (w / 2.0, bottom_y, Align::Center),
        TextPosition::TopLeft => (margin, top_y, Align::Left),
        TextPosition::TopRight => (w - margin, top_y, Align::Right),
        TextPosition::BottomLeft => (margin, bottom_y, Align::Left),
        TextPosition::BottomRight => (w - margin, bottom_y, Align::Right),
    }
}

fn measure(font: &Font, text: &str, px: f32) -> f32 {
    text.chars().map(|ch| font.metrics(ch, px).advance_width).sum()
}

#[allow(clippy::too_many_arguments)]
fn draw_line(
    c: &mut Canvas,
    font: &Font,
    text: &str,
    x: f32,
    y: f32,
    px: f32,
    align: Align,
    style: &LineStyle,
) {
    if text.is_empty() || px < 1.0 {
        return;
    }
    let width = measure(font, text, px);
    let x0 = match align {
        Align::Left => x,
        Align::Center => x - width / 2.0,
        Align::Right => x - width,
    };

    if let Some(radius) = style.glow {
        // A ring of low-alpha copies approximates the blur halo.
        let halo = style.top.with_alpha(0.12 * style.alpha);
        for i in 0..8 {
            let a = i as f32 / 8.0 * std::f32::consts::TAU;
            rasterize(c, font, text, x0 + a.cos() * radius, y + a.sin() * radius, px, halo, halo);
        }
    }
    if let Some(thickness) = style.outline {
        let ink = Color::BLACK.with_alpha(style.alpha);
        for (ox, oy) in [
            (-1.0, 0.0),
            (1.0, 0.0),
            (0.0, -1.0),
            (0.0, 1.0),
            (-0.7, -0.7),
            (0.7, -0.7),
            (-0.7, 0.7),
            (0.7, 0.7),
        ] {
            rasterize(c, font, text, x0 + ox * thickness, y + oy * thickness, px, ink, ink);
        }
    }

    let top = style.top.with_alpha(style.top.a * style.alpha);
    let bottom = style.bottom.with_alpha(style.bottom.a * style.alpha);
    rasterize(c, font, text, x0, y, px, top, bottom);
    if style.bold {
        let offset = (px * 0.025).max(1.0);
        rasterize(c, font, text, x0 + offset, y, px, top, bottom);
    }
}

/// Per-pixel blend of one glyph run at a baseline-left origin, colors
/// interpolated vertically across the em height.
fn rasterize(
    c: &mut Canvas,
    font: &Font,
    text: &str,
    x: f32,
    y: f32,
    px: f32,
    top: Color,
    bottom: Color,
) {
    let mut pen = x;
    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, px);
        let gx0 = pen as i32 + metrics.xmin;
        let gy0 = y as i32 - metrics.ymin - metrics.height as i32;
        for gy in 0..metrics.height {
            let dy = gy0 + gy as i32;
            // Gradient position within the em square above the baseline.
            let frac = ((y - dy as f32) / px).clamp(0.0, 1.0);
            let color = bottom.lerp(top, frac);
            for gx in 0..metrics.width {
                let cov = bitmap[gy * metrics.width + gx] as f32 / 255.0;
                if cov < 0.01 {
                    continue;
                }
                c.blend_px(
                    gx0 + gx as i32,
                    dy,
                    image::Rgba([
                        color.r,
                        color.g,
                        color.b,
                        ((color.a * cov).clamp(0.0, 1.0) * 255.0) as u8,
                    ]),
                );
            }
        }
        pen += metrics.advance_width;
    }
}

fn load_font(path: Option<&Path>) -> Option<Font> {
    let mut candidates: Vec<&Path> = Vec::new();
    if let Some(p) = path {
        candidates.push(p);
    }
    candidates.extend(FONT_CANDIDATES.iter().map(Path::new));

    for p in candidates {
        match std::fs::read(p) {
            Ok(bytes) => match Font::from_bytes(bytes, FontSettings::default()) {
                Ok(font) => {
                    log::info!("Loaded font {}", p.display());
                    return Some(font);
                }
                Err(err) => log::warn!("Unusable font {}: {}", p.display(), err),
            },
            Err(_) => continue,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_degrades_without_a_font() {
        let overlay = TextOverlay { font: None };
        let mut c = Canvas::new(64, 64);
        let cfg = VisualConfig::default();
        overlay.draw(&mut c, &cfg, 0.5, 1.0);
        assert_eq!(c.image().get_pixel(32, 32).0, [0, 0, 0, 255]);
    }

    #[test]
    fn anchors_respect_margins() {
        let (x, _, _) = anchor(TextPosition::TopLeft, 1000.0, 500.0, 50.0, 80.0);
        assert_eq!(x, 50.0);
        let (x, y, _) = anchor(TextPosition::BottomRight, 1000.0, 500.0, 50.0, 80.0);
        assert_eq!(x, 950.0);
        assert!(y < 500.0);
        let (x, y, _) = anchor(TextPosition::Center, 1000.0, 500.0, 50.0, 80.0);
        assert_eq!((x, y), (500.0, 250.0));
    }

    #[test]
    fn draws_text_when_a_font_is_available() {
        let overlay = TextOverlay::new(None);
        let Some(font) = overlay.font() else { return };
        let mut c = Canvas::new(200, 100);
        let style = LineStyle {
            top: Color::WHITE,
            bottom: Color::WHITE,
            alpha: 1.0,
            glow: None,
            outline: None,
            bold: false,
        };
        draw_line(&mut c, font, "Ab", 20.0, 60.0, 40.0, Align::Left, &style);
        let lit = c.image().pixels().filter(|p| p.0[0] > 64).count();
        assert!(lit > 0);
    }
}
