use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QNetError, Result};
use crate::optimizer::UpdateRule;

/// Hyperparameters fixed for the lifetime of one estimator.
///
/// The architecture itself (input shape, hidden sizes) lives in the graph
/// builder passed alongside this config.
///
/// ```rust
/// use qnetwork::agent::QNetworkConfig;
///
/// let config = QNetworkConfig::from_json_str(r#"{
///     "batch_size": 64,
///     "num_actions": 4,
///     "discount": 1.0,
///     "learning_rate": 0.001,
///     "regularization": 0.0001,
///     "update_rule": "adam",
///     "freeze_interval": 100000
/// }"#).unwrap();
/// assert_eq!(config.seed, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetworkConfig {
    /// Number of transitions per training call; also the fixed batch
    /// dimension of inference.
    pub batch_size: usize,
    pub num_actions: usize,
    /// Discount factor in `[0, 1]`.
    pub discount: f32,
    pub learning_rate: f32,
    /// Coefficient of the L2 penalty on weights.
    pub regularization: f32,
    /// One of `adam`, `rmsprop` or `sgd`.
    pub update_rule: String,
    /// Training calls between target network synchronisations.
    pub freeze_interval: usize,
    /// Seed for weight initialisation; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl QNetworkConfig {
    /// Check every field and resolve the update rule.
    ///
    /// The update rule is resolved first so an unknown identifier is reported
    /// before anything else is looked at.
    pub fn validate(&self) -> Result<UpdateRule> {
        let rule: UpdateRule = self.update_rule.parse()?;

        if self.batch_size == 0 {
            return Err(QNetError::invalid_parameter("batch_size", "must be positive"));
        }
        if self.num_actions == 0 {
            return Err(QNetError::invalid_parameter("num_actions", "must be positive"));
        }
        if self.freeze_interval == 0 {
            return Err(QNetError::invalid_parameter("freeze_interval", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(QNetError::invalid_parameter(
                "discount".to_string(),
                format!("must lie in [0, 1], got {}", self.discount),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(QNetError::invalid_parameter(
                "learning_rate".to_string(),
                format!("must be finite and positive, got {}", self.learning_rate),
            ));
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(QNetError::invalid_parameter(
                "regularization".to_string(),
                format!("must be finite and non-negative, got {}", self.regularization),
            ));
        }
        Ok(rule)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
