//! Test data builders for creating test objects

use ledshows::config::{AppConfig, DriverKind};

/// Builder for configurations that run against a dummy strip
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.sys_name = "test".to_string();
        config.strip.driver = DriverKind::Dummy;
        config.strip.num_leds = 8;
        config.shows.refresh_interval_ms = 5;
        config.shows.stop_timeout_ms = 1000;
        Self { config }
    }

    pub fn num_leds(mut self, num_leds: usize) -> Self {
        self.config.strip.num_leds = num_leds;
        self
    }

    pub fn startup_show(mut self, name: &str) -> Self {
        self.config.shows.startup_show = name.to_string();
        self
    }

    pub fn stop_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.shows.stop_timeout_ms = timeout;
        self
    }

    pub fn max_global_brightness(mut self, brightness: f32) -> Self {
        self.config.strip.max_global_brightness = brightness;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new().num_leds(3).startup_show("idle").build();

        assert_eq!(config.strip.num_leds, 3);
        assert_eq!(config.strip.driver, DriverKind::Dummy);
        assert_eq!(config.shows.startup_show, "idle");
        assert!(config.validate().is_ok());
    }
}
