//! Line Configuration
//!
//! Centralized configuration for the inspection line, loaded from a TOML
//! file with environment overrides.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments (applied by the driver binary)
//! 2. Environment variables (`BELTLINE_ENDPOINT`)
//! 3. TOML configuration file
//! 4. Default values (the reference line geometry)
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file lives at
//! `$XDG_CONFIG_HOME/beltline/line.toml` (typically
//! `~/.config/beltline/line.toml`).
//!
//! # Example Configuration
//!
//! ```toml
//! start_position = [0.0, 1.2, -9.0]
//! end_position = [0.0, 1.2, 9.0]
//! speed = 6.0
//! trigger_radius = 1.3
//! cooldown_secs = 2.0
//! accept_offset = 7.08
//! reject_offset = -7.08
//! endpoint = "http://127.0.0.1:5000/inspect"
//! request_timeout_secs = 10
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Inspection line configuration
///
/// All parameters are injected at startup; the core holds them read-only for
/// the lifetime of the line. Defaults reproduce the reference line geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Item spawn position, start of the travel axis
    pub start_position: [f32; 3],
    /// End-of-travel position
    pub end_position: [f32; 3],
    /// Travel speed in units per second, along both travel and diversion
    pub speed: f32,
    /// Capture fires once the gate distance drops to this radius
    pub trigger_radius: f32,
    /// Minimum seconds since the last capture before another may fire
    pub cooldown_secs: f32,
    /// Positional epsilon for "reached the target" checks
    pub arrival_epsilon: f32,
    /// Lateral x offset of the accept branch (verdict: not defective)
    pub accept_offset: f32,
    /// Lateral x offset of the reject branch (verdict: defective)
    pub reject_offset: f32,
    /// Classification service endpoint URL
    pub endpoint: String,
    /// Bound on the classification round trip, in seconds
    pub request_timeout_secs: u64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            start_position: [0.0, 1.2, -9.0],
            end_position: [0.0, 1.2, 9.0],
            speed: 6.0,
            trigger_radius: 1.3,
            cooldown_secs: 2.0,
            arrival_epsilon: 0.1,
            accept_offset: 7.08,
            reject_offset: -7.08,
            endpoint: "http://127.0.0.1:5000/inspect".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl LineConfig {
    /// Start position as a vector
    #[must_use]
    pub fn start(&self) -> Vec3 {
        Vec3::from_array(self.start_position)
    }

    /// End position as a vector
    #[must_use]
    pub fn end(&self) -> Vec3 {
        Vec3::from_array(self.end_position)
    }

    /// Cooldown as a `Duration`
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f32(self.cooldown_secs)
    }

    /// Request timeout as a `Duration`
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate parameter ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a parameter is out of range
    /// or the travel axis is degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speed <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "speed must be positive, got {}",
                self.speed
            )));
        }
        if self.trigger_radius <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "trigger_radius must be positive, got {}",
                self.trigger_radius
            )));
        }
        if self.cooldown_secs < 0.0 {
            return Err(ConfigError::Validation(format!(
                "cooldown_secs must not be negative, got {}",
                self.cooldown_secs
            )));
        }
        if self.arrival_epsilon <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "arrival_epsilon must be positive, got {}",
                self.arrival_epsilon
            )));
        }
        if (self.start_position[2] - self.end_position[2]).abs() <= self.arrival_epsilon {
            return Err(ConfigError::Validation(
                "start and end positions must be separated along the travel axis".to_string(),
            ));
        }
        if self.endpoint.is_empty() {
            return Err(ConfigError::Validation("endpoint must not be empty".to_string()));
        }
        Ok(())
    }

    /// Apply environment overrides (`BELTLINE_ENDPOINT`)
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("BELTLINE_ENDPOINT") {
            if !endpoint.is_empty() {
                self.endpoint = endpoint;
            }
        }
    }
}

/// Get the default config file path
///
/// Follows XDG Base Directory conventions via the `dirs` crate.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("beltline").join("line.toml"))
}

/// Load configuration from an explicit path
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or fails
/// validation.
pub fn load_config_from_path(path: &Path) -> Result<LineConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: LineConfig = toml::from_str(&contents)?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Load configuration from the default location
///
/// A missing file is not an error: defaults (plus environment overrides)
/// are returned instead.
///
/// # Errors
///
/// Returns [`ConfigError`] when an existing file cannot be read or parsed,
/// or when the resulting configuration fails validation.
pub fn load_config() -> Result<LineConfig, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => {
            let mut config = LineConfig::default();
            config.apply_env();
            config.validate()?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults_match_reference_line() {
        let config = LineConfig::default();
        assert_eq!(config.start_position, [0.0, 1.2, -9.0]);
        assert_eq!(config.end_position, [0.0, 1.2, 9.0]);
        assert!((config.speed - 6.0).abs() < f32::EPSILON);
        assert!((config.trigger_radius - 1.3).abs() < f32::EPSILON);
        assert_eq!(config.cooldown(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: LineConfig = toml::from_str("speed = 3.0").unwrap();
        assert!((config.speed - 3.0).abs() < f32::EPSILON);
        assert_eq!(config.end_position, [0.0, 1.2, 9.0]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "trigger_radius = 0.5\ncooldown_secs = 1.0").unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert!((config.trigger_radius - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.cooldown(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let result = load_config_from_path(Path::new("/nonexistent/line.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = LineConfig {
            speed: 0.0,
            ..LineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let config = LineConfig {
            end_position: [0.0, 1.2, -9.0],
            ..LineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let config = LineConfig {
            endpoint: String::new(),
            ..LineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
