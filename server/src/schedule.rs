/// Fixed-period trigger driven by the physics step.
///
/// Fires once the accumulated time strictly exceeds the period, then carries
/// the remainder over so the long-run rate matches the period.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period: f64,
    elapsed: f64,
}

impl Cadence {
    /// `period` in seconds
    pub fn new(period: f64) -> Self {
        Self {
            period,
            elapsed: 0.0,
        }
    }

    pub fn from_rate_hz(rate_hz: u32) -> Self {
        Self::new(1.0 / rate_hz.max(1) as f64)
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn advance(&mut self, dt: f64) -> bool {
        self.elapsed += dt;
        if self.elapsed > self.period {
            self.elapsed -= self.period;
            true
        } else {
            false
        }
    }
}
