//! Tunable options, read from an optional TOML file.
//!
//! The file named by `FALLING_BLOCKS_CONFIG` is only ever read. Missing
//! keys fall back to the defaults below.

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "FALLING_BLOCKS_CONFIG";

/// Narrowest/shortest field that still fits every spawn shape.
pub const MIN_GRID_SIDE: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid_width: usize,
    pub grid_height: usize,
    /// Gravity interval at normal speed.
    pub fall_interval_ms: u64,
    /// Gravity interval while soft drop is held.
    pub soft_drop_interval_ms: u64,
    /// Minimum spacing between horizontal moves.
    pub move_repeat_ms: u64,
    /// Minimum spacing between rotations.
    pub rotate_repeat_ms: u64,
    pub ticks_per_second: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_width: 10,
            grid_height: 20,
            fall_interval_ms: 500,
            soft_drop_interval_ms: 50,
            move_repeat_ms: 70,
            rotate_repeat_ms: 150,
            ticks_per_second: 30,
        }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reads the file named by [`CONFIG_ENV_VAR`], or returns the defaults
    /// when the variable is unset or empty.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => {
                let path = PathBuf::from(path);
                tracing::info!(path = %path.display(), "loading config");
                Self::from_path(&path)
            }
            _ => {
                tracing::debug!("{CONFIG_ENV_VAR} not set, using default config");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width < MIN_GRID_SIDE || self.grid_height < MIN_GRID_SIDE {
            return Err(ConfigError::Invalid(format!(
                "grid must be at least {MIN_GRID_SIDE}x{MIN_GRID_SIDE}, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        if self.grid_width > i16::MAX as usize || self.grid_height > i16::MAX as usize {
            return Err(ConfigError::Invalid(format!(
                "grid of {}x{} is too large",
                self.grid_width, self.grid_height
            )));
        }
        if self.fall_interval_ms == 0 || self.soft_drop_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "fall intervals must be greater than zero".to_string(),
            ));
        }
        if self.soft_drop_interval_ms > self.fall_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "soft drop interval ({} ms) is slower than the fall interval ({} ms)",
                self.soft_drop_interval_ms, self.fall_interval_ms
            )));
        }
        if self.ticks_per_second == 0 {
            return Err(ConfigError::Invalid(
                "ticks_per_second must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn frame_ms(&self) -> u64 {
        (1000 / self.ticks_per_second as u64).max(1)
    }

    /// Column where new pieces appear: 3 on a 10-wide field.
    pub fn spawn_column(&self) -> i16 {
        (self.grid_width / 2).saturating_sub(2) as i16
    }
}
