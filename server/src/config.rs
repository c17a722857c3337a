use pocket_shared::config::TableConfig;

/// Environment variable that overrides [`ServerConfig::listen_addr`]
pub const LISTEN_ADDR_ENV: &str = "POCKET_LISTEN_ADDR";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    pub position_broadcast_hz: u32,
    pub scoreboard_broadcast_hz: u32,
    pub rng_seed: u64,
    /// Capacity of each connection's outbound mailbox
    pub outbound_buffer: usize,
    /// Largest accepted client frame (bytes)
    pub max_message_bytes: usize,
    /// Unparseable frames tolerated before the connection is closed
    pub max_parse_errors: u32,
    pub table: TableConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9001".to_string(),
            tick_rate_hz: 60,
            position_broadcast_hz: 8,
            scoreboard_broadcast_hz: 1,
            rng_seed: 42,
            outbound_buffer: 256,
            max_message_bytes: 1024,
            max_parse_errors: 5,
            table: TableConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, with the listen address taken from the environment when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var(LISTEN_ADDR_ENV) {
            if !addr.trim().is_empty() {
                config.listen_addr = addr.trim().to_string();
            }
        }
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be > 0".to_string());
        }
        if self.position_broadcast_hz == 0 || self.position_broadcast_hz > self.tick_rate_hz {
            return Err(format!(
                "position_broadcast_hz must be in 1..={} (got {})",
                self.tick_rate_hz, self.position_broadcast_hz
            ));
        }
        if self.scoreboard_broadcast_hz == 0 || self.scoreboard_broadcast_hz > self.tick_rate_hz {
            return Err(format!(
                "scoreboard_broadcast_hz must be in 1..={} (got {})",
                self.tick_rate_hz, self.scoreboard_broadcast_hz
            ));
        }
        if self.outbound_buffer == 0 {
            return Err("outbound_buffer must be > 0".to_string());
        }
        if self.max_message_bytes == 0 {
            return Err("max_message_bytes must be > 0".to_string());
        }
        if self.max_parse_errors == 0 {
            return Err("max_parse_errors must be > 0".to_string());
        }
        self.table.validate()
    }

    pub fn tick_dt(&self) -> f64 {
        1.0 / self.tick_rate_hz as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let config = ServerConfig {
            tick_rate_hz: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn broadcast_faster_than_tick_is_rejected() {
        let config = ServerConfig {
            position_broadcast_hz: 120,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("position_broadcast_hz"), "{}", err);
    }

    #[test]
    fn invalid_table_config_is_reported() {
        let mut config = ServerConfig::default();
        config.table.ball_radius = -1.0;
        assert!(config.validate().is_err());
    }
}
