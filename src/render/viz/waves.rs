use super::{DrawCtx, VizState};
use crate::render::canvas::Canvas;

fn wave_points(ctx: &DrawCtx, flip: f32) -> Vec<(f32, f32)> {
    let len = ctx.bin_count();
    let step = ctx.w / len.max(1) as f32;
    (0..len)
        .map(|i| {
            (
                -ctx.w / 2.0 + i as f32 * step,
                flip * ctx.v(i) * ctx.h * 0.4 * ctx.sens,
            )
        })
        .collect()
}

pub(super) fn wave(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    c.polyline(&wave_points(ctx, 1.0), &ctx.paint);
}

pub(super) fn dual_wave(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    c.polyline(&wave_points(ctx, 1.0), &ctx.paint);
    c.polyline(&wave_points(ctx, -1.0), &ctx.paint);
}

pub(super) fn spectrum_wave(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    let bw = ctx.w / len as f32;
    for i in 0..ctx.bin_count() {
        c.fill_rect(
            -ctx.w / 2.0 + i as f32 * bw,
            (ctx.t * 3.0 + i as f32 * 0.08).sin() * 80.0 * ctx.rs,
            bw.max(1.0),
            -ctx.v(i) * ctx.h * 0.5 * ctx.sens,
            &ctx.paint,
        );
    }
}

pub(super) fn ribbon(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count();
    if len < 2 {
        return;
    }
    for l in 0..3 {
        c.save();
        c.set_alpha((1.0 - l as f32 / 3.0) * ctx.opacity);
        let pts: Vec<(f32, f32)> = (0..len)
            .map(|i| {
                (
                    i as f32 / len as f32 * ctx.w - ctx.w / 2.0,
                    (i as f32 * 0.05 + ctx.t * 2.0 + l as f32).sin() * 100.0 * ctx.rs
                        + ctx.v(i) * 300.0 * ctx.sens * ctx.rs,
                )
            })
            .collect();
        c.polyline(&pts, &ctx.paint);
        c.restore();
    }
}

pub(super) fn lightning(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count();
    if len < 2 {
        return;
    }
    let mut pts = vec![(-ctx.w / 2.0, 0.0)];
    for i in 0..len {
        let spike = if fastrand::f32() > 0.9 { 3.0 } else { 1.0 };
        pts.push((
            i as f32 / len as f32 * ctx.w - ctx.w / 2.0,
            ctx.v(i) * 350.0 * ctx.sens * ctx.rs * spike,
        ));
    }
    c.polyline(&pts, &ctx.paint);
}

pub(super) fn cosmic_strings(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..8 {
        let amp = ctx.v(i * 10) * 200.0 * ctx.sens;
        let mut pts = Vec::new();
        let mut x = -ctx.w / 2.0;
        while x < ctx.w / 2.0 {
            pts.push((x, (x * 0.002 + ctx.t * 2.0 + i as f32).sin() * amp));
            x += 20.0;
        }
        c.polyline(&pts, &ctx.paint);
    }
}

pub(super) fn dna(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..40 {
        let y = (i as f32 - 20.0) * 25.0;
        let x = (ctx.t * 3.0 + i as f32 * 0.2).sin() * 150.0;
        let r = 5.0 + ctx.v(i * 5) * 20.0;
        c.fill_circle(x, y, r, &ctx.paint);
        c.fill_circle(-x, y, r, &ctx.paint);
        c.line(x, y, -x, y, &ctx.paint);
    }
}

pub(super) fn heartbeat(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let s = (1.2 + ctx.bass).max(0.1);
    c.save();
    c.scale(s, s);
    // Two-lobe heart outline from four cubic segments, flattened and filled.
    let segments: [[(f32, f32); 4]; 4] = [
        [(0.0, 30.0), (0.0, 0.0), (-50.0, -50.0), (-100.0, 0.0)],
        [(-100.0, 0.0), (-150.0, 50.0), (-50.0, 150.0), (0.0, 200.0)],
        [(0.0, 200.0), (50.0, 150.0), (150.0, 50.0), (100.0, 0.0)],
        [(100.0, 0.0), (50.0, -50.0), (0.0, 0.0), (0.0, 30.0)],
    ];
    let mut outline = Vec::new();
    for [p0, c0, c1, p1] in segments {
        for s in 0..20 {
            let t = s as f32 / 20.0;
            let u = 1.0 - t;
            let b = [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t];
            outline.push((
                b[0] * p0.0 + b[1] * c0.0 + b[2] * c1.0 + b[3] * p1.0,
                b[0] * p0.1 + b[1] * c0.1 + b[2] * c1.1 + b[3] * p1.1,
            ));
        }
    }
    c.fill_polygon(&outline, &ctx.paint);
    c.restore();
}

pub(super) fn deep_sea(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..5 {
        let base = i as f32 * 100.0;
        let amp = ctx.v(i * 20) * 100.0;
        let mut pts = vec![(-ctx.w / 2.0, base)];
        let mut x = -ctx.w / 2.0;
        while x < ctx.w / 2.0 {
            pts.push((x, base + (x * 0.005 + ctx.t * 2.0).sin() * amp));
            x += 20.0;
        }
        c.polyline(&pts, &ctx.paint);
    }
}

pub(super) fn liquid_flow(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let mut outline = vec![(-ctx.w / 2.0, ctx.h / 2.0)];
    let mut cursor = outline[0];
    for i in 0..20 {
        let crest = -ctx.v(i * 5) * 400.0;
        let ctrl = (i as f32 / 20.0 * ctx.w - ctx.w / 2.0, crest);
        let end = ((i + 1) as f32 / 20.0 * ctx.w - ctx.w / 2.0, crest);
        for s in 1..=8 {
            let t = s as f32 / 8.0;
            let u = 1.0 - t;
            outline.push((
                u * u * cursor.0 + 2.0 * u * t * ctrl.0 + t * t * end.0,
                u * u * cursor.1 + 2.0 * u * t * ctrl.1 + t * t * end.1,
            ));
        }
        cursor = end;
    }
    outline.push((ctx.w / 2.0, ctx.h / 2.0));
    c.fill_polygon(&outline, &ctx.paint);
}

pub(super) fn poly_world(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let mut outline = vec![(-ctx.w / 2.0, ctx.h / 2.0)];
    for i in 0..=10 {
        outline.push((
            i as f32 / 10.0 * ctx.w - ctx.w / 2.0,
            -ctx.v(i * 10) * 400.0,
        ));
    }
    outline.push((ctx.w / 2.0, ctx.h / 2.0));
    c.fill_polygon(&outline, &ctx.paint);
}
