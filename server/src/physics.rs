//! Verlet integration and collision primitives for circular bodies.
//!
//! Velocity lives in the position history (`cpos - ppos`), so every response
//! below writes the new velocity back by moving `ppos`.

use crate::body::{Body, IMMOVABLE_MASS};
use pocket_shared::vec2::{
    add, distance, dot, length, length_squared, lerp, normalize, perp, scale, sub, Vec2,
};

/// Inverse mass, zero for immovable bodies.
pub fn inverse_mass(mass: f64) -> f64 {
    if mass <= 0.0 || mass == IMMOVABLE_MASS {
        0.0
    } else {
        1.0 / mass
    }
}

/// Integrate accumulated acceleration into position, then clear it.
pub fn accelerate(body: &mut Body, dt: f64) {
    body.cpos = add(body.cpos, scale(body.acel, dt * dt));
    body.acel = Vec2::ZERO;
}

/// Advance by the implicit velocity, keeping `damping` of it.
pub fn inertia(body: &mut Body, damping: f64) {
    let velocity = scale(body.velocity(), damping);
    body.ppos = body.cpos;
    body.cpos = add(body.cpos, velocity);
}

/// True when the two circles interpenetrate (touching is not overlapping).
pub fn overlap(a: &Body, b: &Body) -> bool {
    let reach = a.radius + b.radius;
    length_squared(sub(a.cpos, b.cpos)) < reach * reach
}

/// Elastic impulse between two circles along their centre line.
///
/// The impulse is only applied while the bodies approach each other. With
/// `correct_position` the centres are pushed apart to touching distance,
/// split by inverse mass. Returns false without touching either body when
/// the centres coincide or both bodies are immovable.
pub fn resolve_circle_circle(
    a: &mut Body,
    b: &mut Body,
    restitution: f64,
    correct_position: bool,
) -> bool {
    let delta = sub(a.cpos, b.cpos);
    let Some(normal) = normalize(delta) else {
        return false;
    };
    let inv_a = inverse_mass(a.mass);
    let inv_b = inverse_mass(b.mass);
    let inv_sum = inv_a + inv_b;
    if inv_sum == 0.0 {
        return false;
    }

    let va = a.velocity();
    let vb = b.velocity();

    if correct_position {
        let depth = a.radius + b.radius - length(delta);
        if depth > 0.0 {
            a.cpos = add(a.cpos, scale(normal, depth * inv_a / inv_sum));
            b.cpos = sub(b.cpos, scale(normal, depth * inv_b / inv_sum));
        }
    }

    let approach = dot(sub(va, vb), normal);
    let (va, vb) = if approach < 0.0 {
        let impulse = -(1.0 + restitution) * approach / inv_sum;
        (
            add(va, scale(normal, impulse * inv_a)),
            sub(vb, scale(normal, impulse * inv_b)),
        )
    } else {
        (va, vb)
    };

    a.ppos = sub(a.cpos, va);
    b.ppos = sub(b.cpos, vb);
    true
}

/// Whether this step's path `ppos -> cpos` brings the circle into contact with
/// segment `a`-`b`. On a hit the body is moved back along its path to the
/// first contact point, keeping its velocity, so fast bodies cannot tunnel
/// through thin segments. A body already in contact reports a hit only while
/// it keeps approaching.
pub fn rewind_to_collision_point(body: &mut Body, radius: f64, a: Vec2, b: Vec2) -> bool {
    let Some(tangent) = normalize(sub(b, a)) else {
        return false;
    };
    let edge_len = distance(a, b);
    let normal = perp(tangent);

    let prev_d = dot(sub(body.ppos, a), normal);
    let curr_d = dot(sub(body.cpos, a), normal);
    let side = if prev_d >= 0.0 { 1.0 } else { -1.0 };
    let prev_gap = prev_d * side - radius;
    let curr_gap = curr_d * side - radius;

    if curr_gap >= 0.0 {
        return false;
    }

    let within = |p: Vec2| {
        let along = dot(sub(p, a), tangent);
        (0.0..=edge_len).contains(&along)
    };

    if prev_gap > 0.0 {
        let t = prev_gap / (prev_gap - curr_gap);
        let contact = lerp(body.ppos, body.cpos, t);
        if !within(contact) {
            return false;
        }
        let velocity = body.velocity();
        body.cpos = contact;
        body.ppos = sub(contact, velocity);
        true
    } else {
        curr_gap < prev_gap && within(body.cpos)
    }
}

/// Bounce a circle off segment `a`-`b`, whose endpoints are infinite-mass
/// anchors. The body is pushed out to touching distance and the normal part
/// of its velocity is reflected and scaled by `restitution`.
pub fn resolve_circle_edge(body: &mut Body, a: Vec2, b: Vec2, restitution: f64) -> bool {
    let Some(tangent) = normalize(sub(b, a)) else {
        return false;
    };
    let d = dot(sub(body.cpos, a), perp(tangent));
    let side = if d >= 0.0 { 1.0 } else { -1.0 };
    // Points from the segment towards the body
    let normal = scale(perp(tangent), side);

    let velocity = body.velocity();
    let depth = body.radius - d * side;
    if depth > 0.0 {
        body.cpos = add(body.cpos, scale(normal, depth));
    }

    let vn = dot(velocity, normal);
    let velocity = if vn < 0.0 {
        sub(velocity, scale(normal, (1.0 + restitution) * vn))
    } else {
        velocity
    };
    body.ppos = sub(body.cpos, velocity);
    true
}
