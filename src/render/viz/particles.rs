use super::{Agent, DrawCtx, Flame, MatrixDrop, Spark, Vine, VizState};
use crate::render::canvas::{Canvas, Color, Paint};
use std::f32::consts::TAU;

pub(super) fn starfield(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..100 {
        let ang = i as f32 * 137.5;
        let d = (i as f32 * 5.0 + ctx.t * 100.0) % ctx.w.max(1.0);
        let s = (2.0 + ctx.v(i) * 10.0).max(1.0);
        c.fill_rect(ang.cos() * d, ang.sin() * d, s, s, &ctx.paint);
    }
}

pub(super) fn drift_particles(c: &mut Canvas, ctx: &DrawCtx, _st: &mut VizState) {
    for i in 0..100 {
        let ang = i as f32 * 2.4 + ctx.t * 0.5;
        c.fill_circle(
            ang.sin() * ctx.w * 0.4,
            (ang * 0.8).cos() * ctx.h * 0.4,
            (2.0 + ctx.v(i) * 30.0).max(0.1),
            &ctx.paint,
        );
    }
}

pub(super) fn star_burst(c: &mut Canvas, ctx: &DrawCtx, st: &mut VizState) {
    if !matches!(st, VizState::Sparks(_)) {
        *st = VizState::Sparks(Vec::new());
    }
    let VizState::Sparks(sparks) = st else { return };

    if ctx.advancing && fastrand::f32() < 0.3 && sparks.len() < 200 {
        for _ in 0..5 {
            sparks.push(Spark {
                x: 0.0,
                y: 0.0,
                vx: (fastrand::f32() - 0.5) * 20.0,
                vy: (fastrand::f32() - 0.5) * 20.0,
                life: 1.0,
                size: 2.0 + fastrand::f32() * 5.0,
            });
        }
    }
    for s in sparks.iter_mut() {
        if ctx.advancing {
            s.x += s.vx;
            s.y += s.vy;
            s.life -= 0.02;
        }
        c.save();
        c.set_alpha(s.life.max(0.0) * ctx.opacity);
        c.fill_rect(s.x, s.y, s.size.max(1.0), s.size.max(1.0), &ctx.paint);
        c.restore();
    }
    sparks.retain(|s| s.life > 0.0);
}

pub(super) fn fire(c: &mut Canvas, ctx: &DrawCtx, st: &mut VizState) {
    if !matches!(st, VizState::Flames(_)) {
        *st = VizState::Flames(
            (0..30).map(|_| Flame { x: 0.0, y: 0.0, life: 0.0 }).collect(),
        );
    }
    let VizState::Flames(flames) = st else { return };

    for (i, f) in flames.iter_mut().enumerate() {
        if f.life <= 0.0 {
            f.x = (fastrand::f32() - 0.5) * 200.0;
            f.y = 100.0;
            f.life = 1.0;
        }
        if ctx.advancing {
            f.y -= 5.0 + ctx.v(i) * 10.0;
            f.life -= 0.02;
        }
        // Embers run their own palette, ignoring the configured colors.
        let ember = Color {
            r: 255,
            g: (f.life.clamp(0.0, 1.0) * 200.0) as u8,
            b: 0,
            a: f.life.max(0.0),
        };
        c.fill_circle(f.x, f.y, (10.0 * f.life).max(0.1), &Paint::Solid(ember));
    }
}

pub(super) fn matrix(c: &mut Canvas, ctx: &DrawCtx, st: &mut VizState) {
    if !matches!(st, VizState::Matrix(_)) {
        *st = VizState::Matrix(
            (0..30)
                .map(|_| MatrixDrop {
                    x: (fastrand::f32() - 0.5) * ctx.w,
                    y: (fastrand::f32() - 0.5) * ctx.h,
                    speed: 2.0 + fastrand::f32() * 5.0,
                })
                .collect(),
        );
    }
    let VizState::Matrix(drops) = st else { return };

    for d in drops.iter_mut() {
        if ctx.advancing {
            d.y += d.speed;
            if d.y > ctx.h / 2.0 {
                d.y = -ctx.h / 2.0;
            }
        }
        let glyph = if fastrand::bool() { "1" } else { "0" };
        match ctx.font {
            Some(font) => c.fill_text(font, glyph, d.x, d.y, 12.0, &ctx.paint),
            // No font available: a small cell keeps the rain readable.
            None => c.fill_rect(d.x, d.y - 8.0, 5.0, 8.0, &ctx.paint),
        }
    }
}

pub(super) fn swarm(c: &mut Canvas, ctx: &DrawCtx, st: &mut VizState) {
    if !matches!(st, VizState::Swarm(_)) {
        *st = VizState::Swarm(
            (0..50).map(|_| Agent { x: 0.0, y: 0.0, vx: 0.0, vy: 0.0 }).collect(),
        );
    }
    let VizState::Swarm(agents) = st else { return };

    for (i, a) in agents.iter_mut().enumerate() {
        if ctx.advancing {
            a.x += (fastrand::f32() - 0.5) * 10.0 + a.vx;
            a.y += (fastrand::f32() - 0.5) * 10.0 + a.vy;
            a.vx *= 0.9;
            a.vy *= 0.9;
            if ctx.v(i) > 0.6 {
                a.vx += (fastrand::f32() - 0.5) * 20.0;
                a.vy += (fastrand::f32() - 0.5) * 20.0;
            }
        }
        c.fill_rect(a.x, a.y, 4.0, 4.0, &ctx.paint);
    }
}

pub(super) fn neural_net(c: &mut Canvas, ctx: &DrawCtx, st: &mut VizState) {
    if !matches!(st, VizState::Nodes(_)) {
        *st = VizState::Nodes(
            (0..20)
                .map(|_| Agent {
                    x: (fastrand::f32() - 0.5) * ctx.w,
                    y: (fastrand::f32() - 0.5) * ctx.h,
                    vx: fastrand::f32() - 0.5,
                    vy: fastrand::f32() - 0.5,
                })
                .collect(),
        );
    }
    let VizState::Nodes(nodes) = st else { return };

    if ctx.advancing {
        for (i, n) in nodes.iter_mut().enumerate() {
            let boost = 1.0 + ctx.v(i) * 5.0;
            n.x += n.vx * boost;
            n.y += n.vy * boost;
        }
    }
    let positions: Vec<(f32, f32)> = nodes.iter().map(|n| (n.x, n.y)).collect();
    for &(x, y) in &positions {
        c.fill_circle(x, y, 5.0, &ctx.paint);
        for &(x2, y2) in &positions {
            let d = (x - x2).hypot(y - y2);
            if d > 0.0 && d < 200.0 {
                c.line(x, y, x2, y2, &ctx.paint);
            }
        }
    }
}

pub(super) fn glitch_vines(c: &mut Canvas, ctx: &DrawCtx, st: &mut VizState) {
    if !matches!(st, VizState::Vines(_)) {
        *st = VizState::Vines(Vec::new());
    }
    let VizState::Vines(vines) = st else { return };

    if ctx.advancing && fastrand::f32() < 0.2 && vines.len() < 50 {
        vines.push(Vine {
            x: (fastrand::f32() - 0.5) * ctx.w,
            y: (fastrand::f32() - 0.5) * ctx.h,
            angle: fastrand::f32() * TAU,
            length: 0.0,
            color: ctx.color_start.lerp(ctx.color_end, fastrand::f32()),
        });
    }
    let speed = 5.0 + ctx.volume * 10.0;
    for v in vines.iter_mut() {
        let paint = Paint::Solid(v.color);
        if ctx.advancing {
            v.length += speed;
            v.angle += (fastrand::f32() - 0.5) * 0.5;
            let nx = v.x + v.angle.cos() * speed;
            let ny = v.y + v.angle.sin() * speed;
            c.line(v.x, v.y, nx, ny, &paint);
            v.x = nx;
            v.y = ny;
        } else {
            c.fill_circle(v.x, v.y, 2.0, &paint);
        }
    }
    vines.retain(|v| v.length <= 500.0);
}
