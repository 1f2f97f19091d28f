use super::{DrawCtx, VizState};
use crate::render::canvas::Canvas;

fn draw_blobs(c: &mut Canvas, ctx: &DrawCtx, outlined: bool) {
    for i in 0..15 {
        let x = (ctx.t * 0.5 + i as f32).sin() * ctx.w * 0.4;
        let y = (ctx.t * 0.4 + i as f32 * 1.5).cos() * ctx.h * 0.4;
        let r = (50.0 + ctx.v(i * 5) * 150.0).max(0.1);
        c.fill_circle(x, y, r, &ctx.paint);
        if outlined {
            c.stroke_circle(x, y, r, &ctx.paint);
        }
    }
}

pub(super) fn blobs(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    draw_blobs(c, ctx, true);
}

pub(super) fn lava(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    draw_blobs(c, ctx, false);
}

pub(super) fn plasma(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..8 {
        let r = (150.0 + ctx.v(i * 20) * 200.0).max(0.1);
        let x = (ctx.t + i as f32).cos() * r;
        let y = (ctx.t + i as f32).sin() * r;
        c.fill_circle(x, y, r, &ctx.paint);
    }
}

pub(super) fn fractal_tree(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    fn branch(c: &mut Canvas, ctx: &DrawCtx, length: f32, angle: f32, depth: usize) {
        if depth > 8 {
            return;
        }
        let next = length * (0.7 + ctx.v(depth * 10) * 0.2);
        c.save();
        c.rotate(angle);
        c.line(0.0, 0.0, 0.0, -length, &ctx.paint);
        c.translate(0.0, -length);
        branch(c, ctx, next, 0.5, depth + 1);
        branch(c, ctx, next, -0.5, depth + 1);
        c.restore();
    }
    branch(c, ctx, 150.0, 0.0, 0);
}
