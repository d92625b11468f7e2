//! Daemon settings, read from `thinghub.toml` and then the environment.
//!
//! The file is optional and so is every key in it. Environment variables
//! win over the file:
//!
//! | Variable                 | Setting                      |
//! |--------------------------|------------------------------|
//! | `THINGHUB_DATABASE_URL`  | `database.url`               |
//! | `THINGHUB_LOG`           | `logging.filter`             |
//! | `RUST_LOG`               | `logging.filter` (preferred) |
//! | `THINGHUB_PULL_INTERVAL` | `drivers.pull_interval_secs` |

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

const FILE: &str = "thinghub.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub drivers: DriversConfig,
    pub bus: BusConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlx` connection URL, `sqlite::memory:` included.
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives.
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    /// Seconds between two pulls of every bound driver.
    pub pull_interval_secs: u64,
    /// Simulated devices to bind at startup. An empty list disables them.
    #[serde(rename = "virtual")]
    pub virtual_devices: Vec<VirtualDevice>,
}

/// One `[[drivers.virtual]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VirtualDevice {
    pub kind: VirtualKind,
    pub serial: String,
    /// Name given to the thing unless one was persisted earlier.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualKind {
    Light,
    Sensor,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Events buffered per subscriber before the slowest one lags.
    pub capacity: usize,
}

impl Config {
    /// # Errors
    ///
    /// Fails when `thinghub.toml` cannot be read or parsed, or when the
    /// merged settings do not pass validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(FILE)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("THINGHUB_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(filter) = var("RUST_LOG").or_else(|| var("THINGHUB_LOG")) {
            self.logging.filter = filter;
        }
        if let Some(secs) = var("THINGHUB_PULL_INTERVAL").and_then(|v| v.parse().ok()) {
            self.drivers.pull_interval_secs = secs;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.drivers.pull_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "drivers.pull_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::Validation(
                "bus.capacity must be at least 1".to_string(),
            ));
        }
        // same kind and serial would resolve to the same thing id
        let mut seen = HashSet::new();
        for device in &self.drivers.virtual_devices {
            if !seen.insert((device.kind, device.serial.as_str())) {
                return Err(ConfigError::Validation(format!(
                    "virtual {:?} {:?} is declared twice",
                    device.kind, device.serial
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn pull_interval(&self) -> Duration {
        Duration::from_secs(self.drivers.pull_interval_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:thinghub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "thinghubd=info,thinghub=info".to_string(),
        }
    }
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self {
            pull_interval_secs: 30,
            virtual_devices: vec![
                VirtualDevice {
                    kind: VirtualKind::Light,
                    serial: "lamp-1".to_string(),
                    name: Some("Virtual lamp".to_string()),
                },
                VirtualDevice {
                    kind: VirtualKind::Sensor,
                    serial: "thermo-1".to_string(),
                    name: Some("Virtual thermometer".to_string()),
                },
            ],
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse thinghub.toml")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read thinghub.toml")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn should_bind_one_light_and_one_sensor_by_default() {
        let config = Config::default();

        let kinds: Vec<VirtualKind> = config
            .drivers
            .virtual_devices
            .iter()
            .map(|d| d.kind)
            .collect();
        assert_eq!(kinds, vec![VirtualKind::Light, VirtualKind::Sensor]);
        assert_eq!(config.pull_interval(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_accept_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database_url(), "sqlite:thinghub.db?mode=rwc");
        assert_eq!(config.bus.capacity, 256);
    }

    #[test]
    fn should_read_virtual_device_list() {
        let config: Config = toml::from_str(
            "
            [drivers]
            pull_interval_secs = 5

            [[drivers.virtual]]
            kind = 'sensor'
            serial = 'attic'

            [[drivers.virtual]]
            kind = 'light'
            serial = 'porch'
            name = 'Porch'
            ",
        )
        .unwrap();

        assert_eq!(config.pull_interval(), Duration::from_secs(5));
        assert_eq!(
            config.drivers.virtual_devices,
            vec![
                VirtualDevice {
                    kind: VirtualKind::Sensor,
                    serial: "attic".to_string(),
                    name: None,
                },
                VirtualDevice {
                    kind: VirtualKind::Light,
                    serial: "porch".to_string(),
                    name: Some("Porch".to_string()),
                },
            ]
        );
    }

    #[test]
    fn should_disable_virtual_devices_with_empty_list() {
        let config: Config = toml::from_str("[drivers]\nvirtual = []").unwrap();
        assert!(config.drivers.virtual_devices.is_empty());
    }

    #[test]
    fn should_reject_unknown_device_kind() {
        let result: Result<Config, _> =
            toml::from_str("[[drivers.virtual]]\nkind = 'fan'\nserial = 'x'");
        assert!(result.is_err());
    }

    #[test]
    fn should_prefer_environment_over_file() {
        let mut config: Config = toml::from_str(
            "
            [database]
            url = 'sqlite:file.db'
            [logging]
            filter = 'warn'
            ",
        )
        .unwrap();

        config.apply_env(env(&[
            ("THINGHUB_DATABASE_URL", "sqlite::memory:"),
            ("THINGHUB_LOG", "debug"),
            ("THINGHUB_PULL_INTERVAL", "7"),
        ]));

        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.pull_interval(), Duration::from_secs(7));
    }

    #[test]
    fn should_prefer_rust_log_over_thinghub_log() {
        let mut config = Config::default();
        config.apply_env(env(&[("THINGHUB_LOG", "debug"), ("RUST_LOG", "trace")]));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_ignore_unparsable_pull_interval() {
        let mut config = Config::default();
        config.apply_env(env(&[("THINGHUB_PULL_INTERVAL", "soon")]));
        assert_eq!(config.drivers.pull_interval_secs, 30);
    }

    #[test]
    fn should_reject_zero_pull_interval() {
        let mut config = Config::default();
        config.drivers.pull_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_zero_bus_capacity() {
        let mut config = Config::default();
        config.bus.capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_duplicate_virtual_device() {
        let mut config = Config::default();
        let lamp = config.drivers.virtual_devices[0].clone();
        config.drivers.virtual_devices.push(lamp);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_fall_back_to_defaults_without_file() {
        let config = Config::from_file("does-not-exist.toml").unwrap();
        assert_eq!(config.drivers.virtual_devices.len(), 2);
    }
}
