use super::{DrawCtx, VizState};
use crate::render::canvas::Canvas;
use std::f32::consts::{PI, TAU};

pub(super) fn spoke_circle(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let base = (ctx.min_dim * 0.25 + ctx.bass * 50.0 * ctx.sens).max(1.0);
    let len = ctx.bin_count().max(1);
    for i in 0..120 {
        let v = ctx.v(i * len / 120);
        let rad = TAU * i as f32 / 120.0;
        let outer = (base + v * ctx.min_dim * 0.3 * ctx.sens).max(0.1);
        c.line(
            rad.cos() * base,
            rad.sin() * base,
            rad.cos() * outer,
            rad.sin() * outer,
            &ctx.paint,
        );
    }
}

pub(super) fn ring(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let base = (ctx.min_dim * 0.25 + ctx.bass * 50.0 * ctx.sens).max(1.0);
    let len = ctx.bin_count().max(1);
    for i in 0..120 {
        let v = ctx.v(i * len / 120);
        let rad = TAU * i as f32 / 120.0;
        let r = base + v * ctx.min_dim * 0.3 * ctx.sens;
        c.fill_circle(rad.cos() * r, rad.sin() * r, 2.0 + v * 10.0, &ctx.paint);
    }
}

pub(super) fn shockwave(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..10 {
        let r = (ctx.t * 300.0 + i as f32 * 100.0) % 1000.0;
        c.save();
        c.set_alpha((1.0 - r / 1000.0).max(0.0) * ctx.opacity);
        c.scale(1.0, 0.5);
        c.stroke_circle(0.0, 0.0, r.max(0.1), &ctx.paint);
        c.restore();
    }
}

pub(super) fn radial_spectrum(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    for i in 0..120 {
        let v = ctx.v(i * len / 120);
        let rad = TAU * i as f32 / 120.0;
        let outer = (100.0 + v * 400.0 * ctx.sens).max(0.1);
        c.line(
            rad.cos() * 100.0,
            rad.sin() * 100.0,
            rad.cos() * outer,
            rad.sin() * outer,
            &ctx.paint,
        );
    }
}

pub(super) fn audio_rings(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..15 {
        let r = ctx.min_dim * 0.1 + i as f32 * 40.0 + ctx.v(i * 5) * 100.0 * ctx.sens;
        c.save();
        c.set_alpha((1.0 - i as f32 / 15.0).max(0.0) * ctx.opacity);
        c.stroke_circle(0.0, 0.0, r.max(0.1), &ctx.paint);
        c.restore();
    }
}

pub(super) fn rings_cyber(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..8 {
        let v = ctx.v(i * 5);
        let r = (100.0 + i as f32 * 50.0 + v * 50.0).max(0.1);
        let dir = if i % 2 == 1 { 1.0 } else { -1.0 };
        let start = ctx.t * dir;
        c.arc(0.0, 0.0, r, start, start + PI * (0.5 + v), &ctx.paint);
    }
}

pub(super) fn spiral(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count();
    if len < 2 {
        return;
    }
    let pts: Vec<(f32, f32)> = (0..len)
        .map(|i| {
            let rad = i as f32 * 0.1 + ctx.t * 2.0;
            let r = i as f32 * 0.5 + ctx.v(i) * 100.0 * ctx.sens;
            (rad.cos() * r, rad.sin() * r)
        })
        .collect();
    c.polyline(&pts, &ctx.paint);
}

pub(super) fn orbitals(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..12 {
        let v = ctx.v(i * 10);
        let rad = ctx.t + i as f32 * TAU / 12.0;
        let r = 200.0 + v * 100.0;
        c.fill_circle(rad.cos() * r, rad.sin() * r, 10.0 + v * 40.0, &ctx.paint);
    }
}

pub(super) fn radar(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let r = (ctx.min_dim * 0.4).max(0.1);
    c.stroke_circle(0.0, 0.0, r, &ctx.paint);
    let ang = (ctx.t * 2.0) % TAU;
    // Sweep wedge.
    let mut wedge = vec![(0.0, 0.0)];
    for s in 0..=8 {
        let a = ang + 0.4 * s as f32 / 8.0;
        wedge.push((a.cos() * r, a.sin() * r));
    }
    c.fill_polygon(&wedge, &ctx.paint);
}

pub(super) fn mandala(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..12 {
        let v = ctx.v(i * 5);
        c.save();
        c.rotate(i as f32 * TAU / 12.0 + ctx.t * 0.1);
        c.quad_bezier(
            (0.0, 0.0),
            (50.0, 100.0 + v * 200.0),
            (0.0, 200.0 + v * 200.0),
            &ctx.paint,
        );
        c.restore();
    }
}

pub(super) fn vortex(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let mut i = 0;
    while i < ctx.bin_count() {
        let rad = i as f32 * 0.1 + ctx.t * 3.0;
        let r = i as f32 * 0.5 * (1.0 + ctx.bass);
        c.fill_rect(rad.cos() * r, rad.sin() * r, 4.0, 4.0, &ctx.paint);
        i += 10;
    }
}

pub(super) fn gravity_well(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..100 {
        let ang = i as f32 * 0.1;
        let r = 300.0 + (ctx.t + i as f32).sin() * 50.0;
        let inner = (r - ctx.v(i) * 200.0).max(0.1);
        c.line(
            ang.cos() * r,
            ang.sin() * r,
            ang.cos() * inner,
            ang.sin() * inner,
            &ctx.paint,
        );
    }
}

pub(super) fn solar_flare(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..20 {
        let v = ctx.v(i);
        let ang = i as f32 * PI / 10.0;
        let r = 100.0 + v * 200.0;
        c.fill_circle(ang.cos() * r, ang.sin() * r, (v * 50.0).max(0.1), &ctx.paint);
    }
}

pub(super) fn kaleido_mesh(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..8 {
        c.save();
        c.rotate(i as f32 * PI / 4.0);
        let pts: Vec<(f32, f32)> = (0..10)
            .map(|j| {
                (
                    j as f32 * 50.0,
                    (ctx.t * 2.0 + j as f32).sin() * ctx.v(j) * 100.0,
                )
            })
            .collect();
        c.polyline(&pts, &ctx.paint);
        c.restore();
    }
}

pub(super) fn tunnel_3d(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let saved_width = c.line_width;
    for i in 0..12 {
        let r = ((ctx.t * 200.0 + i as f32 * 100.0) % 800.0).max(0.1);
        c.line_width = 2.0 + ctx.v(i * 10) * 20.0;
        c.stroke_circle(0.0, 0.0, r, &ctx.paint);
    }
    c.line_width = saved_width;
}

pub(super) fn sphere_3d(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let mut i = 0;
    while i < ctx.bin_count() {
        let v = ctx.v(i);
        let rad = i as f32 * 0.1 + ctx.t * 0.5;
        let r = 200.0 + v * 200.0;
        c.fill_circle(rad.cos() * r, rad.sin() * r, 5.0 + v * 10.0, &ctx.paint);
        i += 10;
    }
}
