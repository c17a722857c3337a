/// Table configuration, shared with clients in the welcome message.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// Width and height of the square table canvas (px)
    pub canvas_size: f64,
    /// Distance from the canvas edge to the rails (px)
    pub table_padding: f64,
    /// Length of the rail-free gap at each corner (px)
    pub corner_pocket_size: f64,
    /// Where each diagonal pocket line meets the canvas edges, measured from the corner (px)
    pub pocket_line_offset: f64,
    pub ball_radius: f64,
    pub ball_mass: f64,
    /// Points lost by the owner (and won by the last toucher) when a player ball is pocketed
    pub player_ball_value: u32,
    /// Neutral balls are valued neutral_value_min..=neutral_value_max, one of each
    pub neutral_value_min: u32,
    pub neutral_value_max: u32,
    pub max_connections_per_table: u32,
    /// Restitution for ball-ball and ball-rail collisions
    pub restitution: f64,
    /// Fraction of velocity kept per physics step
    pub inertia_damping: f64,
    /// Acceleration toward the click target at full-canvas distance (px/s²)
    pub click_impulse: f64,
    pub max_nickname_length: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            canvas_size: 680.0,
            table_padding: 64.0,
            corner_pocket_size: 100.0,
            pocket_line_offset: 140.0,
            ball_radius: 14.0,
            ball_mass: 1.0,
            player_ball_value: 9,
            neutral_value_min: 1,
            neutral_value_max: 8,
            max_connections_per_table: 4,
            restitution: 0.9,
            inertia_damping: 0.99,
            click_impulse: 20_000.0,
            max_nickname_length: 21,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.canvas_size.is_finite() || self.canvas_size <= 0.0 {
            return Err("canvas_size must be finite and > 0".to_string());
        }
        if !self.ball_radius.is_finite() || self.ball_radius <= 0.0 {
            return Err("ball_radius must be finite and > 0".to_string());
        }
        if !self.table_padding.is_finite() || self.table_padding < 0.0 {
            return Err("table_padding must be finite and >= 0".to_string());
        }
        if (self.table_padding + self.ball_radius) * 2.0 >= self.canvas_size {
            return Err("table is too small for a ball between the rails".to_string());
        }
        if self.corner_pocket_size * 2.0 >= self.canvas_size {
            return Err("corner_pocket_size must leave room for the rails".to_string());
        }
        if !self.pocket_line_offset.is_finite() || self.pocket_line_offset <= 0.0 {
            return Err("pocket_line_offset must be finite and > 0".to_string());
        }
        if !self.ball_mass.is_finite() || self.ball_mass <= 0.0 {
            return Err("ball_mass must be finite and > 0".to_string());
        }
        if self.neutral_value_min > self.neutral_value_max {
            return Err("neutral_value_min must be <= neutral_value_max".to_string());
        }
        if self.max_connections_per_table == 0 {
            return Err("max_connections_per_table must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err("restitution must be within 0..=1".to_string());
        }
        if !(0.0..=1.0).contains(&self.inertia_damping) {
            return Err("inertia_damping must be within 0..=1".to_string());
        }
        if !self.click_impulse.is_finite() || self.click_impulse < 0.0 {
            return Err("click_impulse must be finite and >= 0".to_string());
        }
        if self.max_nickname_length == 0 {
            return Err("max_nickname_length must be > 0".to_string());
        }
        Ok(())
    }

    /// Number of neutral balls a full table carries
    pub fn neutral_count(&self) -> usize {
        (self.neutral_value_max - self.neutral_value_min + 1) as usize
    }
}
