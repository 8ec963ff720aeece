use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Weights and stabilizing epsilons of the embedding error function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ErrorWeights {
    pub distance: f64,
    pub chirality: f64,
    pub fourth_dimension: f64,
    pub lower_epsilon: f64,
    pub upper_epsilon: f64,
}

impl Default for ErrorWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            chirality: 1.0,
            fourth_dimension: 1.0,
            lower_epsilon: 0.1,
            upper_epsilon: 0.1,
        }
    }
}

impl ErrorWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("distance", self.distance),
            ("chirality", self.chirality),
            ("fourth-dimension", self.fourth_dimension),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name,
                    reason: format!("weight must be finite and non-negative, got {value}"),
                });
            }
        }
        for (name, value) in [
            ("lower-epsilon", self.lower_epsilon),
            ("upper-epsilon", self.upper_epsilon),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name,
                    reason: format!("epsilon must be finite and positive, got {value}"),
                });
            }
        }
        Ok(())
    }
}

pub const DEFAULT_GRADIENT_THRESHOLD: f64 = 0.1;

/// Settings for a geometry cleanup run.
///
/// The fourth-dimension weight is always 1 during cleanup; the value in
/// `weights` is not consulted there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CleanupConfig {
    pub weights: ErrorWeights,
    /// Largest gradient component still counted as converged.
    pub threshold: f64,
    /// Iteration cap; `None` means three times the number of coordinates.
    pub max_iterations: Option<usize>,
    /// Mirror the starting structure when most chiralities are inverted.
    pub flip_check: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            weights: ErrorWeights::default(),
            threshold: DEFAULT_GRADIENT_THRESHOLD,
            max_iterations: None,
            flip_check: true,
        }
    }
}

impl CleanupConfig {
    pub fn builder() -> CleanupConfigBuilder {
        CleanupConfigBuilder::new()
    }

    /// Reads a configuration from a TOML file. Missing keys take their
    /// defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "threshold",
                reason: format!("must be finite and positive, got {}", self.threshold),
            });
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "max-iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The iteration cap for a coordinate matrix with `len` entries.
    pub fn iteration_cap(&self, len: usize) -> usize {
        self.max_iterations.unwrap_or(3 * len)
    }
}

#[derive(Default)]
pub struct CleanupConfigBuilder {
    weights: Option<ErrorWeights>,
    distance_weight: Option<f64>,
    chirality_weight: Option<f64>,
    threshold: Option<f64>,
    max_iterations: Option<usize>,
    flip_check: Option<bool>,
}

impl CleanupConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weights(mut self, weights: ErrorWeights) -> Self {
        self.weights = Some(weights);
        self
    }
    pub fn distance_weight(mut self, weight: f64) -> Self {
        self.distance_weight = Some(weight);
        self
    }
    pub fn chirality_weight(mut self, weight: f64) -> Self {
        self.chirality_weight = Some(weight);
        self
    }
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn flip_check(mut self, enabled: bool) -> Self {
        self.flip_check = Some(enabled);
        self
    }

    pub fn build(self) -> Result<CleanupConfig, ConfigError> {
        let defaults = CleanupConfig::default();
        let mut weights = self.weights.unwrap_or(defaults.weights);
        if let Some(w) = self.distance_weight {
            weights.distance = w;
        }
        if let Some(w) = self.chirality_weight {
            weights.chirality = w;
        }
        let config = CleanupConfig {
            weights,
            threshold: self.threshold.unwrap_or(defaults.threshold),
            max_iterations: self.max_iterations.or(defaults.max_iterations),
            flip_check: self.flip_check.unwrap_or(defaults.flip_check),
        };
        config.validate()?;
        Ok(config)
    }
}
