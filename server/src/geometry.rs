//! Fixed table layout: rails, pocket lines and spawn area.

use pocket_shared::config::TableConfig;
use pocket_shared::vec2::{vec2, Vec2};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
}

impl Segment {
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }
}

/// The four axis-aligned rails, inset by the padding, leaving the corners open.
pub fn rails(config: &TableConfig) -> [Segment; 4] {
    let size = config.canvas_size;
    let pad = config.table_padding;
    let gap = config.corner_pocket_size;
    [
        // left
        Segment::new(vec2(pad, gap), vec2(pad, size - gap)),
        // right
        Segment::new(vec2(size - pad, gap), vec2(size - pad, size - gap)),
        // top
        Segment::new(vec2(gap, pad), vec2(size - gap, pad)),
        // bottom
        Segment::new(vec2(gap, size - pad), vec2(size - gap, size - pad)),
    ]
}

/// The four diagonal lines spanning the corner gaps. Crossing one pockets the body.
pub fn pocket_lines(config: &TableConfig) -> [Segment; 4] {
    let size = config.canvas_size;
    let d = config.pocket_line_offset;
    [
        Segment::new(vec2(0.0, d), vec2(d, 0.0)),
        Segment::new(vec2(size - d, 0.0), vec2(size, d)),
        Segment::new(vec2(0.0, size - d), vec2(d, size)),
        Segment::new(vec2(size, size - d), vec2(size - d, size)),
    ]
}

/// Whole-pixel position inside the rails, uniformly distributed.
pub fn random_position(config: &TableConfig, rng: &mut impl Rng) -> Vec2 {
    let min = config.table_padding + config.ball_radius;
    let span = (config.canvas_size - min * 2.0).floor().max(1.0) as u32;
    let x = min + rng.gen_range(0..span) as f64;
    let y = min + rng.gen_range(0..span) as f64;
    vec2(x, y)
}

/// Outside the canvas entirely, or not a number at all.
pub fn is_out_of_bounds(config: &TableConfig, pos: Vec2) -> bool {
    !pos.is_finite()
        || pos.x < 0.0
        || pos.x > config.canvas_size
        || pos.y < 0.0
        || pos.y > config.canvas_size
}
