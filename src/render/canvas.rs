use image::{Rgba, RgbaImage};
use imageproc::drawing::{self, Blend};
use imageproc::point::Point;
use kurbo::{Affine, Point as KPoint, Vec2};
use rayon::prelude::*;

/// Blend rule for image blits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    SourceOver,
    /// Inverse-multiply, brightening where both layers carry light.
    Screen,
}

/// RGB color with a separate [0, 1] alpha so opacity multipliers compose
/// without repeated u8 quantization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 1.0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 1.0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 1.0 }
    }

    /// Parse `#rrggbb` or `#rgb`. Unparseable input yields white, matching
    /// how a canvas treats a bad fillStyle.
    pub fn from_hex(s: &str) -> Self {
        let h = s.trim().trim_start_matches('#');
        let parse = |s: &str| u8::from_str_radix(s, 16).ok();
        match h.len() {
            6 => {
                if let (Some(r), Some(g), Some(b)) =
                    (parse(&h[0..2]), parse(&h[2..4]), parse(&h[4..6]))
                {
                    return Color::rgb(r, g, b);
                }
            }
            3 => {
                let expand = |s: &str| parse(s).map(|v| v * 17);
                if let (Some(r), Some(g), Some(b)) =
                    (expand(&h[0..1]), expand(&h[1..2]), expand(&h[2..3]))
                {
                    return Color::rgb(r, g, b);
                }
            }
            _ => {}
        }
        Color::WHITE
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Color { a: a.clamp(0.0, 1.0), ..self }
    }

    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }

    fn rgba(self, alpha_mul: f32) -> Rgba<u8> {
        let a = (self.a * alpha_mul).clamp(0.0, 1.0);
        Rgba([self.r, self.g, self.b, (a * 255.0).round() as u8])
    }
}

/// Fill style for canvas primitives. The vertical gradient spans the local
/// y range [+span/2, -span/2]: the start color sits below the local origin,
/// the end color above it.
#[derive(Debug, Clone, Copy)]
pub enum Paint {
    Solid(Color),
    GradientY { start: Color, end: Color, span: f32 },
}

impl Paint {
    /// Sample the paint at a local-space point.
    fn at(&self, local_y: f32) -> Color {
        match *self {
            Paint::Solid(c) => c,
            Paint::GradientY { start, end, span } => {
                if span <= 0.0 {
                    return start;
                }
                let t = (span / 2.0 - local_y) / span;
                start.lerp(end, t)
            }
        }
    }
}

struct DrawState {
    transform: Affine,
    alpha: f32,
}

/// Software 2D canvas over an RGBA frame. Primitives take local coordinates
/// and are mapped through the current transform stack; colors are
/// alpha-blended into the frame.
pub struct Canvas {
    buf: Blend<RgbaImage>,
    width: u32,
    height: u32,
    transform: Affine,
    alpha: f32,
    stack: Vec<DrawState>,
    pub line_width: f32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut img = RgbaImage::new(width, height);
        for px in img.pixels_mut() {
            *px = Rgba([0, 0, 0, 255]);
        }
        Canvas {
            buf: Blend(img),
            width,
            height,
            transform: Affine::IDENTITY,
            alpha: 1.0,
            stack: Vec::new(),
            line_width: 1.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn min_dim(&self) -> f32 {
        self.width.min(self.height) as f32
    }

    pub fn image(&self) -> &RgbaImage {
        &self.buf.0
    }

    pub fn into_image(self) -> RgbaImage {
        self.buf.0
    }

    pub fn clear(&mut self, color: Color) {
        let px = color.rgba(1.0);
        for p in self.buf.0.pixels_mut() {
            *p = px;
        }
    }

    // Transform stack

    pub fn save(&mut self) {
        self.stack.push(DrawState { transform: self.transform, alpha: self.alpha });
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.transform = state.transform;
            self.alpha = state.alpha;
        }
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.transform *= Affine::translate(Vec2::new(x as f64, y as f64));
    }

    pub fn rotate(&mut self, radians: f32) {
        self.transform *= Affine::rotate(radians as f64);
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.transform *= Affine::scale_non_uniform(sx as f64, sy as f64);
    }

    /// Append an arbitrary affine, coefficients as in a 2D canvas
    /// `transform(a, b, c, d, e, f)` call.
    pub fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.transform *=
            Affine::new([a as f64, b as f64, c as f64, d as f64, e as f64, f as f64]);
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        let p = self.transform * KPoint::new(x as f64, y as f64);
        (p.x as f32, p.y as f32)
    }

    /// Uniform scale magnitude of the current transform; line widths set in
    /// local units are scaled by this before rasterization.
    fn scale_factor(&self) -> f32 {
        (self.transform.determinant().abs() as f32).sqrt()
    }

    pub fn blend_px(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            use imageproc::drawing::Canvas as _;
            self.buf.draw_pixel(x as u32, y as u32, color);
        }
    }

    // Primitives

    pub fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, paint: &Paint) {
        let color = paint.at((y0 + y1) / 2.0);
        let a = self.map(x0, y0);
        let b = self.map(x1, y1);
        self.device_line(a, b, color);
    }

    fn device_line(&mut self, a: (f32, f32), b: (f32, f32), color: Color) {
        let px = color.rgba(self.alpha);
        if px.0[3] == 0 {
            return;
        }
        let w = self.line_width * self.scale_factor();
        if w <= 1.5 {
            drawing::draw_line_segment_mut(&mut self.buf, a, b, px);
            return;
        }
        // Thick segment as a filled quad around the centerline.
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-3 {
            let r = (w / 2.0).round() as i32;
            drawing::draw_filled_circle_mut(
                &mut self.buf,
                (a.0.round() as i32, a.1.round() as i32),
                r.max(1),
                px,
            );
            return;
        }
        let (nx, ny) = (-dy / len * w / 2.0, dx / len * w / 2.0);
        let quad = [
            (a.0 + nx, a.1 + ny),
            (b.0 + nx, b.1 + ny),
            (b.0 - nx, b.1 - ny),
            (a.0 - nx, a.1 - ny),
        ];
        self.device_polygon_fill(&quad, px);
    }

    fn device_polygon_fill(&mut self, pts: &[(f32, f32)], px: Rgba<u8>) {
        let mut poly: Vec<Point<i32>> = pts
            .iter()
            .map(|&(x, y)| Point::new(x.round() as i32, y.round() as i32))
            .collect();
        poly.dedup();
        if poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        if poly.len() < 3 {
            if let Some(p) = poly.first() {
                self.blend_px(p.x, p.y, px);
            }
            return;
        }
        drawing::draw_polygon_mut(&mut self.buf, &poly, px);
    }

    pub fn polyline(&mut self, pts: &[(f32, f32)], paint: &Paint) {
        for pair in pts.windows(2) {
            self.line(pair[0].0, pair[0].1, pair[1].0, pair[1].1, paint);
        }
    }

    pub fn stroke_polygon(&mut self, pts: &[(f32, f32)], paint: &Paint) {
        if pts.len() < 2 {
            return;
        }
        self.polyline(pts, paint);
        let first = pts[0];
        let last = pts[pts.len() - 1];
        self.line(last.0, last.1, first.0, first.1, paint);
    }

    pub fn fill_polygon(&mut self, pts: &[(f32, f32)], paint: &Paint) {
        if pts.len() < 3 {
            return;
        }
        let cy = pts.iter().map(|p| p.1).sum::<f32>() / pts.len() as f32;
        let px = paint.at(cy).rgba(self.alpha);
        if px.0[3] == 0 {
            return;
        }
        let device: Vec<(f32, f32)> = pts.iter().map(|&(x, y)| self.map(x, y)).collect();
        self.device_polygon_fill(&device, px);
    }

    /// Negative extents select the rect on the other side of the origin
    /// corner, as on a 2D canvas.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: &Paint) {
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        if w == 0.0 || h == 0.0 {
            return;
        }
        match paint {
            Paint::Solid(_) => {
                self.fill_polygon(
                    &[(x, y), (x + w, y), (x + w, y + h), (x, y + h)],
                    paint,
                );
            }
            Paint::GradientY { .. } => {
                // Row slabs so the gradient varies across the rect instead
                // of collapsing to the centroid sample.
                let rows = (h.ceil() as usize).clamp(1, 256);
                let step = h / rows as f32;
                for i in 0..rows {
                    let ry = y + i as f32 * step;
                    let color = paint.at(ry + step / 2.0);
                    let solid = Paint::Solid(color);
                    self.fill_polygon(
                        &[(x, ry), (x + w, ry), (x + w, ry + step), (x, ry + step)],
                        &solid,
                    );
                }
            }
        }
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: &Paint) {
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        self.stroke_polygon(&[(x, y), (x + w, y), (x + w, y + h), (x, y + h)], paint);
    }

    /// Circles go through the transform as polygons, so non-uniform scale
    /// produces the expected ellipse.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, paint: &Paint) {
        if r <= 0.0 {
            return;
        }
        let pts = circle_points(cx, cy, r, 48);
        let px = paint.at(cy).rgba(self.alpha);
        if px.0[3] == 0 {
            return;
        }
        let device: Vec<(f32, f32)> = pts.iter().map(|&(x, y)| self.map(x, y)).collect();
        self.device_polygon_fill(&device, px);
    }

    pub fn stroke_circle(&mut self, cx: f32, cy: f32, r: f32, paint: &Paint) {
        if r <= 0.0 {
            return;
        }
        self.stroke_polygon(&circle_points(cx, cy, r, 64), paint);
    }

    pub fn arc(&mut self, cx: f32, cy: f32, r: f32, a0: f32, a1: f32, paint: &Paint) {
        if r <= 0.0 {
            return;
        }
        let sweep = a1 - a0;
        let segs = ((sweep.abs() * 10.0).ceil() as usize).clamp(2, 64);
        let pts: Vec<(f32, f32)> = (0..=segs)
            .map(|i| {
                let a = a0 + sweep * i as f32 / segs as f32;
                (cx + a.cos() * r, cy + a.sin() * r)
            })
            .collect();
        self.polyline(&pts, paint);
    }

    pub fn quad_bezier(
        &mut self,
        p0: (f32, f32),
        ctrl: (f32, f32),
        p1: (f32, f32),
        paint: &Paint,
    ) {
        let pts: Vec<(f32, f32)> = (0..=16)
            .map(|i| {
                let t = i as f32 / 16.0;
                let u = 1.0 - t;
                (
                    u * u * p0.0 + 2.0 * u * t * ctrl.0 + t * t * p1.0,
                    u * u * p0.1 + 2.0 * u * t * ctrl.1 + t * t * p1.1,
                )
            })
            .collect();
        self.polyline(&pts, paint);
    }

    /// Rasterize a glyph run at the given local origin (baseline-left).
    /// Text goes through the transform's translation and scale only.
    pub fn fill_text(
        &mut self,
        font: &fontdue::Font,
        text: &str,
        x: f32,
        y: f32,
        px_size: f32,
        paint: &Paint,
    ) {
        let color = paint.at(y);
        let (ox, oy) = self.map(x, y);
        let size = px_size * self.scale_factor();
        if size < 1.0 {
            return;
        }
        let alpha = self.alpha;
        let mut pen = ox;
        for ch in text.chars() {
            let (metrics, bitmap) = font.rasterize(ch, size);
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let cov = bitmap[gy * metrics.width + gx] as f32 / 255.0;
                    if cov < 0.01 {
                        continue;
                    }
                    let dx = pen as i32 + metrics.xmin + gx as i32;
                    let dy = oy as i32 - metrics.ymin - metrics.height as i32 + gy as i32;
                    self.blend_px(dx, dy, color.rgba(alpha * cov));
                }
            }
            pen += metrics.advance_width;
        }
    }

    /// Blit an image into the local rect (x, y, w, h) through the current
    /// transform, nearest-sampled via the inverse mapping.
    pub fn draw_image(&mut self, img: &RgbaImage, x: f32, y: f32, w: f32, h: f32) {
        self.draw_image_composite(img, x, y, w, h, Composite::SourceOver);
    }

    pub fn draw_image_composite(
        &mut self,
        img: &RgbaImage,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        comp: Composite,
    ) {
        if w <= 0.0 || h <= 0.0 || img.width() == 0 || img.height() == 0 {
            return;
        }
        let Some(inv) = invert_affine(self.transform) else { return };

        // Device bounding box of the transformed rect.
        let corners = [
            self.map(x, y),
            self.map(x + w, y),
            self.map(x, y + h),
            self.map(x + w, y + h),
        ];
        let x0 = corners.iter().map(|p| p.0).fold(f32::MAX, f32::min).floor().max(0.0) as u32;
        let y0 = corners.iter().map(|p| p.1).fold(f32::MAX, f32::min).floor().max(0.0) as u32;
        let x1 = (corners.iter().map(|p| p.0).fold(f32::MIN, f32::max).ceil() as u32)
            .min(self.width);
        let y1 = (corners.iter().map(|p| p.1).fold(f32::MIN, f32::max).ceil() as u32)
            .min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let alpha = self.alpha;
        let (iw, ih) = (img.width() as f32, img.height() as f32);
        let canvas_w = self.width as usize;
        let buf: &mut [u8] = &mut self.buf.0;
        buf.par_chunks_mut(canvas_w * 4)
            .enumerate()
            .skip(y0 as usize)
            .take((y1 - y0) as usize)
            .for_each(|(dy, row)| {
                for dx in x0..x1 {
                    let p = inv * KPoint::new(dx as f64 + 0.5, dy as f64 + 0.5);
                    let lx = p.x as f32;
                    let ly = p.y as f32;
                    if lx < x || ly < y || lx >= x + w || ly >= y + h {
                        continue;
                    }
                    let sx = (((lx - x) / w * iw) as u32).min(img.width() - 1);
                    let sy = (((ly - y) / h * ih) as u32).min(img.height() - 1);
                    let src = img.get_pixel(sx, sy).0;
                    let a = src[3] as f32 / 255.0 * alpha;
                    if a <= 0.0 {
                        continue;
                    }
                    let o = dx as usize * 4;
                    for ch in 0..3 {
                        let d = row[o + ch] as f32;
                        let s = src[ch] as f32;
                        let blended = match comp {
                            Composite::SourceOver => s,
                            Composite::Screen => 255.0 - (255.0 - d) * (255.0 - s) / 255.0,
                        };
                        row[o + ch] = (d + (blended - d) * a) as u8;
                    }
                    row[o + 3] = 255;
                }
            });
    }
}

fn invert_affine(t: Affine) -> Option<Affine> {
    if t.determinant().abs() < 1e-12 {
        None
    } else {
        Some(t.inverse())
    }
}

fn circle_points(cx: f32, cy: f32, r: f32, segs: usize) -> Vec<(f32, f32)> {
    (0..segs)
        .map(|i| {
            let a = i as f32 / segs as f32 * std::f32::consts::TAU;
            (cx + a.cos() * r, cy + a.sin() * r)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        let c = Color::from_hex("#8b5cf6");
        assert_eq!((c.r, c.g, c.b), (0x8b, 0x5c, 0xf6));
        let c = Color::from_hex("#fff");
        assert_eq!((c.r, c.g, c.b), (255, 255, 255));
        // garbage degrades to white
        assert_eq!(Color::from_hex("oops"), Color::WHITE);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Color::rgb(0, 0, 0);
        let b = Color::rgb(200, 100, 50);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        let mid = a.lerp(b, 0.5);
        assert_eq!(mid.r, 100);
    }

    #[test]
    fn gradient_spans_local_vertical() {
        let p = Paint::GradientY {
            start: Color::rgb(0, 0, 0),
            end: Color::rgb(255, 255, 255),
            span: 100.0,
        };
        assert_eq!(p.at(50.0).r, 0);
        assert_eq!(p.at(-50.0).r, 255);
        assert_eq!(p.at(0.0).r, 128);
    }

    #[test]
    fn fill_rect_writes_pixels() {
        let mut c = Canvas::new(64, 64);
        c.fill_rect(10.0, 10.0, 20.0, 20.0, &Paint::Solid(Color::rgb(255, 0, 0)));
        assert_eq!(c.image().get_pixel(20, 20).0, [255, 0, 0, 255]);
        assert_eq!(c.image().get_pixel(5, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn transform_moves_drawing() {
        let mut c = Canvas::new(64, 64);
        c.save();
        c.translate(32.0, 32.0);
        c.fill_rect(0.0, 0.0, 4.0, 4.0, &Paint::Solid(Color::rgb(0, 255, 0)));
        c.restore();
        assert_eq!(c.image().get_pixel(33, 33).0, [0, 255, 0, 255]);
        assert_eq!(c.image().get_pixel(1, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn restore_pops_alpha() {
        let mut c = Canvas::new(8, 8);
        c.save();
        c.set_alpha(0.5);
        c.restore();
        c.fill_rect(0.0, 0.0, 8.0, 8.0, &Paint::Solid(Color::rgb(255, 255, 255)));
        assert_eq!(c.image().get_pixel(4, 4).0, [255, 255, 255, 255]);
    }

    #[test]
    fn draw_image_scales_to_rect() {
        let mut c = Canvas::new(32, 32);
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        c.draw_image(&src, 8.0, 8.0, 16.0, 16.0);
        assert_eq!(c.image().get_pixel(16, 16).0, [0, 0, 255, 255]);
        assert_eq!(c.image().get_pixel(2, 2).0, [0, 0, 0, 255]);
    }

    #[test]
    fn screen_blend_brightens() {
        let mut c = Canvas::new(8, 8);
        c.clear(Color::rgb(100, 100, 100));
        let src = RgbaImage::from_pixel(8, 8, Rgba([100, 100, 100, 255]));
        c.draw_image_composite(&src, 0.0, 0.0, 8.0, 8.0, Composite::Screen);
        assert!(c.image().get_pixel(4, 4).0[0] > 100);
    }

    #[test]
    fn zero_alpha_is_a_noop() {
        let mut c = Canvas::new(8, 8);
        c.set_alpha(0.0);
        c.fill_rect(0.0, 0.0, 8.0, 8.0, &Paint::Solid(Color::rgb(255, 0, 0)));
        assert_eq!(c.image().get_pixel(4, 4).0, [0, 0, 0, 255]);
    }
}
