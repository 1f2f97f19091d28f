use super::{DrawCtx, VizState};
use crate::render::canvas::Canvas;

pub(super) fn spectrum(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    let bw = (ctx.w / len as f32) * 2.0;
    for i in 0..ctx.bin_count() {
        c.fill_rect(
            -ctx.w / 2.0 + i as f32 * (bw + 1.0),
            0.0,
            bw.max(1.0),
            -ctx.v(i) * ctx.h * 0.5 * ctx.sens,
            &ctx.paint,
        );
    }
}

pub(super) fn mirror_spectrum(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    let bw = (ctx.w / len as f32) * 4.0;
    for i in 0..ctx.bin_count() {
        let x = -ctx.w / 2.0 + i as f32 * (bw + 1.0);
        let ext = ctx.v(i) * ctx.h * 0.5 * ctx.sens;
        c.fill_rect(x, 0.0, bw.max(1.0), -ext, &ctx.paint);
        c.fill_rect(x, 0.0, bw.max(1.0), ext, &ctx.paint);
    }
}

pub(super) fn bars_3d(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    let bw = (ctx.w / 40.0) * 0.6;
    for i in 0..40 {
        let v = ctx.v(i * len / 40);
        let ext = v * ctx.h * 0.8 * ctx.sens;
        c.save();
        c.translate(i as f32 / 40.0 * ctx.w - ctx.w / 2.0, 0.0);
        // Vertical shear for the faux-perspective lean.
        c.transform(1.0, 0.4, 0.0, 1.0, 0.0, 0.0);
        c.fill_rect(0.0, 0.0, bw.max(1.0), -ext, &ctx.paint);
        c.stroke_rect(0.0, 0.0, bw.max(1.0), -ext, &ctx.paint);
        c.restore();
    }
}

pub(super) fn bar_rain(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    let bw = (ctx.w / 40.0) * 0.8;
    for i in 0..40 {
        c.fill_rect(
            i as f32 / 40.0 * ctx.w - ctx.w / 2.0,
            -ctx.h / 2.0,
            bw.max(1.0),
            ctx.v(i * len / 40) * ctx.h * ctx.sens,
            &ctx.paint,
        );
    }
}

pub(super) fn cyber_city(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    let bw = (ctx.w / 50.0) * 0.85;
    for i in 0..50 {
        c.fill_rect(
            i as f32 / 50.0 * ctx.w - ctx.w / 2.0,
            0.0,
            bw.max(1.0),
            -ctx.v(i * len / 50) * ctx.h * 0.9 * ctx.sens,
            &ctx.paint,
        );
    }
}

pub(super) fn pixel_blocks(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let size = 50.0 * ctx.rs;
    if size < 1.0 {
        return;
    }
    let len = ctx.bin_count().max(1);
    let rows = 15.0;
    let cols = (ctx.w / size).floor() as usize;
    for i in 0..cols {
        let lit = (ctx.v(i * len / cols.max(1)) * rows * ctx.sens).floor() as i32;
        for j in 0..lit {
            c.fill_rect(
                (i as f32 - cols as f32 / 2.0) * size,
                -j as f32 * size,
                size - 4.0,
                size - 4.0,
                &ctx.paint,
            );
        }
    }
}

pub(super) fn led_wall(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let (rows, cols) = (15.0, 25usize);
    let len = ctx.bin_count().max(1);
    let bw = ctx.w / cols as f32;
    let bh = ctx.h / rows;
    for i in 0..cols {
        let lit = (ctx.v(i * len / cols) * rows * ctx.sens).floor() as i32;
        for j in 0..lit {
            c.fill_rect(
                i as f32 * bw - ctx.w / 2.0,
                ctx.h / 2.0 - j as f32 * bh - bh,
                (bw - 2.0).max(1.0),
                (bh - 2.0).max(1.0),
                &ctx.paint,
            );
        }
    }
}

pub(super) fn segmented_bar(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    let bw = (ctx.w / len as f32) * 2.0;
    for i in 0..ctx.bin_count() {
        let segs = (ctx.v(i) * 15.0 * ctx.sens).floor() as i32;
        for j in 0..segs {
            c.fill_rect(
                -ctx.w / 2.0 + i as f32 * (bw + 1.0),
                -j as f32 * 12.0 * ctx.rs,
                bw.max(1.0),
                -10.0 * ctx.rs,
                &ctx.paint,
            );
        }
    }
}

pub(super) fn seismic(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count();
    if len < 2 {
        return;
    }
    let pts: Vec<(f32, f32)> = (0..len)
        .map(|i| {
            let v = ctx.v(i);
            (
                i as f32 / len as f32 * ctx.w - ctx.w / 2.0,
                v * ctx.h * 0.3 * ctx.sens + (fastrand::f32() - 0.5) * v * 100.0,
            )
        })
        .collect();
    c.polyline(&pts, &ctx.paint);
}

/// Fallback for unrecognized identifiers.
pub(super) fn plain_bars(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    let len = ctx.bin_count().max(1);
    let bw = (ctx.w / len as f32) * 2.0;
    for i in 0..ctx.bin_count() {
        c.fill_rect(
            -ctx.w / 2.0 + i as f32 * bw,
            0.0,
            (bw - 1.0).max(1.0),
            -ctx.v(i) * ctx.h * 0.4 * ctx.sens,
            &ctx.paint,
        );
    }
}
