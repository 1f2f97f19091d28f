use super::{DrawCtx, VizState};
use crate::render::canvas::Canvas;
use std::f32::consts::PI;

pub(super) fn cubes_3d(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    let mut i = 0;
    while i < ctx.bin_count() {
        let s = 20.0 + ctx.v(i) * 200.0;
        c.save();
        c.translate(
            i as f32 / len as f32 * ctx.w - ctx.w / 2.0,
            (ctx.t * 2.0 + i as f32).sin() * 100.0,
        );
        c.rotate(ctx.t + i as f32);
        c.stroke_rect(-s / 2.0, -s / 2.0, s, s, &ctx.paint);
        c.restore();
        i += 15;
    }
}

pub(super) fn neon_grid(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let saved_width = c.line_width;
    let mut x = -ctx.w / 2.0;
    while x < ctx.w / 2.0 {
        c.line_width = 1.0 + ctx.v((x / 10.0).abs() as usize) * 5.0;
        c.line(x, -ctx.h / 2.0, x, ctx.h / 2.0, &ctx.paint);
        x += 100.0;
    }
    let mut y = -ctx.h / 2.0;
    while y < ctx.h / 2.0 {
        c.line_width = 1.0 + ctx.v((y / 10.0).abs() as usize) * 5.0;
        c.line(-ctx.w / 2.0, y, ctx.w / 2.0, y, &ctx.paint);
        y += 100.0;
    }
    c.line_width = saved_width;
}

pub(super) fn hexagon(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let s = 60.0;
    for i in 0..8 {
        for j in 0..8 {
            let v = ctx.v(i * 8 + j);
            let cx = (j as f32 - 4.0) * s * 1.5;
            let cy = (i as f32 - 4.0) * s * 1.7 + if j % 2 == 1 { s * 0.8 } else { 0.0 };
            let r = s * (0.2 + v).max(0.1);
            let pts: Vec<(f32, f32)> = (0..6)
                .map(|k| {
                    let a = k as f32 * PI / 3.0;
                    (cx + r * a.cos(), cy + r * a.sin())
                })
                .collect();
            c.stroke_polygon(&pts, &ctx.paint);
        }
    }
}

pub(super) fn pyramids(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..8 {
        let x = i as f32 / 8.0 * ctx.w - ctx.w / 2.0 + 50.0;
        let peak = ctx.v(i * 10) * 400.0;
        c.stroke_polygon(
            &[(x, 0.0), (x + 50.0, -peak), (x + 100.0, 0.0)],
            &ctx.paint,
        );
    }
}

pub(super) fn crystal(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..6 {
        c.save();
        c.rotate(i as f32 * PI / 3.0);
        let l = 100.0 + ctx.v(i * 10) * 200.0;
        c.stroke_polygon(
            &[(0.0, 0.0), (30.0, l), (0.0, l + 30.0), (-30.0, l)],
            &ctx.paint,
        );
        c.restore();
    }
}

pub(super) fn vector_field(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let mut x = -ctx.w / 2.0;
    while x < ctx.w / 2.0 {
        let mut y = -ctx.h / 2.0;
        while y < ctx.h / 2.0 {
            let d = x.hypot(y);
            c.save();
            c.translate(x, y);
            c.rotate(y.atan2(x) + ctx.v((d / 20.0) as usize) * PI);
            c.line(0.0, 0.0, 20.0, 0.0, &ctx.paint);
            c.restore();
            y += 50.0;
        }
        x += 50.0;
    }
}

pub(super) fn techno_wires(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let nodes: Vec<(f32, f32, f32)> = (0..10)
        .map(|i| {
            (
                (i as f32).cos() * 200.0,
                (i as f32).sin() * 200.0,
                ctx.v(i),
            )
        })
        .collect();
    for &(x, y, v) in &nodes {
        c.fill_circle(x, y, (5.0 + v * 10.0).max(0.1), &ctx.paint);
        for &(x2, y2, _) in &nodes {
            let d = (x - x2).hypot(y - y2);
            if d > 0.0 && d < 300.0 {
                c.line(x, y, x2, y2, &ctx.paint);
            }
        }
    }
}
