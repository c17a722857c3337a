//! 2D vector utilities for table-space physics.
//! Coordinates are canvas pixels, origin at the top-left corner.

/// Lengths below this are treated as zero when normalizing.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Shorthand constructor
pub fn vec2(x: f64, y: f64) -> Vec2 {
    Vec2::new(x, y)
}

/// Dot product
pub fn dot(a: Vec2, b: Vec2) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Vector length
pub fn length(v: Vec2) -> f64 {
    (v.x * v.x + v.y * v.y).sqrt()
}

/// Squared length (no sqrt)
pub fn length_squared(v: Vec2) -> f64 {
    v.x * v.x + v.y * v.y
}

/// Distance between two points
pub fn distance(a: Vec2, b: Vec2) -> f64 {
    length(sub(a, b))
}

/// Normalize vector to unit length.
/// Returns None for (near) zero vectors, whose direction is undefined.
pub fn normalize(v: Vec2) -> Option<Vec2> {
    let len = length(v);
    if len < EPSILON || !len.is_finite() {
        return None;
    }
    Some(Vec2::new(v.x / len, v.y / len))
}

/// Scale vector by scalar
pub fn scale(v: Vec2, s: f64) -> Vec2 {
    Vec2::new(v.x * s, v.y * s)
}

/// Add two vectors
pub fn add(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new(a.x + b.x, a.y + b.y)
}

/// Subtract vectors (a - b)
pub fn sub(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new(a.x - b.x, a.y - b.y)
}

/// Counter-clockwise perpendicular: (x, y) -> (-y, x)
pub fn perp(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Linear interpolation, t=0 returns a, t=1 returns b.
pub fn lerp(a: Vec2, b: Vec2, t: f64) -> Vec2 {
    Vec2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}
