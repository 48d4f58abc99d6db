//! Orchestrator configuration.

use sabirth_execution::DisplayConfig;
use sabirth_types::{
    constants::{DEFAULT_STAKE_POINTS, INTEGRATION_DISPLAY_MS, LORE_DISPLAY_MS},
    Address,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, str::FromStr};
use thiserror::Error;
use tracing::Level;

/// Configuration for the [crate::Orchestrator], usually read from YAML.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Player address (player 1).
    pub player: Address,
    /// House address (player 2).
    pub house: Address,
    #[serde(default = "default_stake_points")]
    pub stake_points: i128,
    #[serde(default = "default_lore_display_ms")]
    pub lore_display_ms: u64,
    #[serde(default = "default_integration_display_ms")]
    pub integration_display_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seed for session ids. Drawn from entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_stake_points() -> i128 {
    DEFAULT_STAKE_POINTS
}

fn default_lore_display_ms() -> u64 {
    LORE_DISPLAY_MS
}

fn default_integration_display_ms() -> u64 {
    INTEGRATION_DISPLAY_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{field} must not be empty")]
    EmptyAddress { field: &'static str },
    #[error("player and house must differ (both {address})")]
    SameAddress { address: Address },
    #[error("stake_points must be > 0 (got {value})")]
    InvalidStake { value: i128 },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
}

#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    pub player: Address,
    pub house: Address,
    pub stake_points: i128,
    pub display: DisplayConfig,
    pub log_level: Level,
    pub seed: Option<u64>,
}

impl Config {
    pub fn new(player: Address, house: Address) -> Self {
        Self {
            player,
            house,
            stake_points: default_stake_points(),
            lore_display_ms: default_lore_display_ms(),
            integration_display_ms: default_integration_display_ms(),
            log_level: default_log_level(),
            seed: None,
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.player.is_empty() {
            return Err(ConfigError::EmptyAddress { field: "player" });
        }
        if self.house.is_empty() {
            return Err(ConfigError::EmptyAddress { field: "house" });
        }
        if self.player == self.house {
            return Err(ConfigError::SameAddress {
                address: self.player,
            });
        }
        if self.stake_points <= 0 {
            return Err(ConfigError::InvalidStake {
                value: self.stake_points,
            });
        }
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        Ok(ValidatedConfig {
            player: self.player,
            house: self.house,
            stake_points: self.stake_points,
            display: DisplayConfig {
                lore_ms: self.lore_display_ms,
                integration_ms: self.integration_display_ms,
            },
            log_level,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_yaml() {
        let config = Config::from_yaml("player: GPLAYER\nhouse: GHOUSE\n").unwrap();
        assert_eq!(config.stake_points, 1_000_000_000);
        assert_eq!(config.lore_display_ms, 8_000);
        assert_eq!(config.integration_display_ms, 10_000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.seed, None);

        let validated = config.validate().unwrap();
        assert_eq!(validated.log_level, Level::INFO);
        assert_eq!(validated.display, DisplayConfig::default());
    }

    #[test]
    fn test_overrides_from_yaml() {
        let yaml = "player: GPLAYER\nhouse: GHOUSE\nstake_points: 5\nlore_display_ms: 0\nlog_level: debug\nseed: 9\n";
        let validated = Config::from_yaml(yaml).unwrap().validate().unwrap();
        assert_eq!(validated.stake_points, 5);
        assert_eq!(validated.display.lore_ms, 0);
        assert_eq!(validated.log_level, Level::DEBUG);
        assert_eq!(validated.seed, Some(9));
    }

    #[test]
    fn test_validation_errors() {
        let err = Config::new(Address::new(" "), Address::new("GHOUSE"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyAddress { field: "player" }));

        let err = Config::new(Address::new("GSAME"), Address::new("GSAME"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::SameAddress { .. }));

        let mut config = Config::new(Address::new("GPLAYER"), Address::new("GHOUSE"));
        config.stake_points = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStake { value: 0 })
        ));

        let mut config = Config::new(Address::new("GPLAYER"), Address::new("GHOUSE"));
        config.log_level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel { .. })
        ));
    }

    #[test]
    fn test_missing_player_is_parse_error() {
        assert!(matches!(
            Config::from_yaml("house: GHOUSE\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
