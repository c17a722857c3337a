use pocket_shared::protocol::{BodyWire, ConnectionId};
use pocket_shared::vec2::{sub, Vec2};

/// Mass value reserved for anchors that never move (rail endpoints).
pub const IMMOVABLE_MASS: f64 = -1.0;

/// Colors of the neutral balls, indexed by value (index 0 is unused).
pub const NEUTRAL_COLORS: [u32; 9] = [
    0xffffff, 0xffff00, 0x0000ff, 0xff0000, 0xaa00aa, 0xffaa00, 0x1f952f, 0x550000, 0x1a191e,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ball on a table.
///
/// Velocity is implicit: it is the displacement `cpos - ppos` of the last step.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: BodyId,
    /// Current position
    pub cpos: Vec2,
    /// Previous position
    pub ppos: Vec2,
    /// Acceleration accumulated since the last step (px/s²)
    pub acel: Vec2,
    pub radius: f64,
    pub mass: f64,
    /// Points awarded to whoever pockets this body
    pub value: u32,
    pub color: u32,
    pub label: Option<String>,
    /// Set only for player-controlled bodies
    pub owner: Option<ConnectionId>,
    /// Connection that most recently influenced this body, directly or through a chain of collisions
    pub last_touched_by: Option<ConnectionId>,
    /// Simulation time of the last collision (ms)
    pub last_touched_at: i64,
}

impl Body {
    /// A body at rest at `pos`.
    pub fn new(id: BodyId, pos: Vec2, radius: f64, mass: f64, value: u32, now_ms: i64) -> Self {
        Self {
            id,
            cpos: pos,
            ppos: pos,
            acel: Vec2::ZERO,
            radius,
            mass,
            value,
            color: 0xffffff,
            label: None,
            owner: None,
            last_touched_by: None,
            last_touched_at: now_ms,
        }
    }

    pub fn with_owner(mut self, owner: ConnectionId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_neutral(&self) -> bool {
        self.owner.is_none()
    }

    /// Displacement over the last step
    pub fn velocity(&self) -> Vec2 {
        sub(self.cpos, self.ppos)
    }

    /// Move to `pos` and drop all motion.
    pub fn place_at(&mut self, pos: Vec2) {
        self.cpos = pos;
        self.ppos = pos;
        self.acel = Vec2::ZERO;
    }

    pub fn to_wire(&self) -> BodyWire {
        BodyWire {
            id: self.id.0,
            x: self.cpos.x,
            y: self.cpos.y,
            radius: self.radius,
            value: self.value,
            color: self.color,
            label: self.label.clone(),
            owner_id: self.owner.clone(),
        }
    }
}

/// Generate a player ball color from an id using golden angle hue distribution.
pub fn color_from_id(id: u64) -> u32 {
    let hue = (id.wrapping_mul(137)) % 360;
    hsv_to_rgb(hue as f64, 0.55, 0.95)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> u32 {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let ri = ((r + m) * 255.0).round() as u32;
    let gi = ((g + m) * 255.0).round() as u32;
    let bi = ((b + m) * 255.0).round() as u32;

    (ri << 16) | (gi << 8) | bi
}
