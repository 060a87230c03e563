use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tuning knobs for a Wilson factorization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WilsonConfig {
    /// Number of refinement passes. Sole termination criterion unless
    /// `convergence_tolerance` is set.
    pub iterations: usize,
    /// Largest accepted ratio of extreme singular values when inverting a
    /// per-bin factor.
    pub condition_limit: f64,
    /// Relative tolerance for the Hermitian check before Cholesky.
    pub hermitian_tolerance: f64,
    /// Check every bin (not only the mean) for Hermitian positive definiteness.
    pub strict_validation: bool,
    /// Stop early once the reconstruction error drops to this value.
    /// None keeps the fixed iteration count.
    pub convergence_tolerance: Option<f64>,
}

impl Default for WilsonConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            condition_limit: 1e12,
            hermitian_tolerance: 1e-9,
            strict_validation: false,
            convergence_tolerance: None,
        }
    }
}

impl WilsonConfig {
    /// Default configuration with a custom iteration count
    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: WilsonConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    /// Environment variables should be prefixed with WT_WILSON_
    /// Example: WT_WILSON_ITERATIONS=12
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub(crate) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        use std::env;

        if let Ok(val) = env::var("WT_WILSON_ITERATIONS") {
            self.iterations = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid WT_WILSON_ITERATIONS".to_string())
            })?;
        }
        if let Ok(val) = env::var("WT_WILSON_CONDITION_LIMIT") {
            self.condition_limit = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid WT_WILSON_CONDITION_LIMIT".to_string())
            })?;
        }
        if let Ok(val) = env::var("WT_WILSON_HERMITIAN_TOLERANCE") {
            self.hermitian_tolerance = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid WT_WILSON_HERMITIAN_TOLERANCE".to_string())
            })?;
        }
        if let Ok(val) = env::var("WT_WILSON_STRICT_VALIDATION") {
            self.strict_validation = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid WT_WILSON_STRICT_VALIDATION".to_string())
            })?;
        }
        if let Ok(val) = env::var("WT_WILSON_CONVERGENCE_TOLERANCE") {
            self.convergence_tolerance = Some(val.parse().map_err(|_| {
                ConfigError::Validation("Invalid WT_WILSON_CONVERGENCE_TOLERANCE".to_string())
            })?);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::Validation(
                "iterations must be > 0".to_string(),
            ));
        }
        if !(self.condition_limit > 1.0) {
            return Err(ConfigError::Validation(
                "condition_limit must be > 1".to_string(),
            ));
        }
        if !(self.hermitian_tolerance >= 0.0) || !self.hermitian_tolerance.is_finite() {
            return Err(ConfigError::Validation(
                "hermitian_tolerance must be finite and non-negative".to_string(),
            ));
        }
        if let Some(tol) = self.convergence_tolerance {
            if !(tol > 0.0) || !tol.is_finite() {
                return Err(ConfigError::Validation(
                    "convergence_tolerance must be finite and positive".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Export configuration to TOML string
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self
            .to_toml_string()
            .map_err(|e| ConfigError::Validation(format!("TOML serialization error: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}
