//! Environment-driven configuration for the command-line tools.
//!
//! | Variable             | Default     |
//! |----------------------|-------------|
//! | `PIDGEON_DIFFICULTY` | `4`         |
//! | `PIDGEON_MAX_STEPS`  | unbounded   |
//! | `PIDGEON_LOG`        | `info`      |
//!
//! Command-line flags take precedence over these values.

use crate::core::pow::MAX_DIFFICULTY;
use crate::utils::log::Level;
use crate::virtual_machine::vm::ExecLimits;
use pidgeon_derive::Error;
use std::env;

pub const ENV_DIFFICULTY: &str = "PIDGEON_DIFFICULTY";
pub const ENV_MAX_STEPS: &str = "PIDGEON_MAX_STEPS";
pub const ENV_LOG: &str = "PIDGEON_LOG";

const DEFAULT_DIFFICULTY: u32 = 4;

/// Errors raised while reading configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("{var}: difficulty {value} exceeds the maximum of {max}")]
    DifficultyTooHigh {
        var: &'static str,
        value: u32,
        max: u32,
    },
}

/// Resolved tool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Leading zero nibbles required by `pow` when no flag is given.
    pub difficulty: u32,
    /// Step budget applied to `run`.
    pub limits: ExecLimits,
    /// Log threshold.
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            limits: ExecLimits::default(),
            log_level: Level::Info,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Unset or blank variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get(ENV_DIFFICULTY) {
            config.difficulty = parse_difficulty(ENV_DIFFICULTY, &raw)?;
        }

        if let Some(raw) = get(ENV_MAX_STEPS) {
            let steps = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: ENV_MAX_STEPS,
                    expected: "a non-negative integer",
                    value: raw.clone(),
                })?;
            config.limits = ExecLimits::with_max_steps(steps);
        }

        if let Some(raw) = get(ENV_LOG) {
            config.log_level = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_LOG,
                expected: "one of debug, info, warn, error",
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }
}

/// Parses a difficulty value, rejecting anything above [`MAX_DIFFICULTY`].
pub fn parse_difficulty(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    let value = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidValue {
            var,
            expected: "a non-negative integer",
            value: raw.to_string(),
        })?;
    if value > MAX_DIFFICULTY {
        return Err(ConfigError::DifficultyTooHigh {
            var,
            value,
            max: MAX_DIFFICULTY,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.limits.max_steps, None);
        assert_eq!(config.log_level, Level::Info);
    }

    #[test]
    fn reads_all_variables() {
        let config = Config::from_lookup(lookup(&[
            (ENV_DIFFICULTY, "2"),
            (ENV_MAX_STEPS, "1000"),
            (ENV_LOG, "debug"),
        ]))
        .unwrap();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.limits.max_steps, Some(1000));
        assert_eq!(config.log_level, Level::Debug);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[(ENV_DIFFICULTY, "  ")])).unwrap();
        assert_eq!(config.difficulty, 4);
    }

    #[test]
    fn rejects_non_numeric_difficulty() {
        let err = Config::from_lookup(lookup(&[(ENV_DIFFICULTY, "hard")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: ENV_DIFFICULTY, .. }
        ));
        assert_eq!(
            err.to_string(),
            "PIDGEON_DIFFICULTY: expected a non-negative integer, got 'hard'"
        );
    }

    #[test]
    fn rejects_difficulty_beyond_digest_length() {
        let err = Config::from_lookup(lookup(&[(ENV_DIFFICULTY, "65")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DifficultyTooHigh {
                var: ENV_DIFFICULTY,
                value: 65,
                max: 64
            }
        );
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = Config::from_lookup(lookup(&[(ENV_LOG, "chatty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: ENV_LOG, .. }));
    }

    #[test]
    fn rejects_negative_step_budget() {
        let err = Config::from_lookup(lookup(&[(ENV_MAX_STEPS, "-1")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: ENV_MAX_STEPS, .. }
        ));
    }
}
