use std::{fs, num::NonZeroUsize, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::{PipelineErr, Result};

/// Hyperparameters and artifact locations of a training run.
///
/// Every field has a default, so a JSON config file only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Where the processed train and test tensors live.
    pub processed_dir: PathBuf,
    /// Where the trained parameters are saved.
    pub model_path: PathBuf,
    /// Where the loss and accuracy plot is saved.
    pub figure_path: PathBuf,
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    /// The Adam learning rate.
    pub lr: f32,
    /// Seeds initialization, shuffling and dropout. Drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Log progress every this many steps.
    pub log_every: NonZeroUsize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            processed_dir: PathBuf::from("data/processed"),
            model_path: PathBuf::from("models/model.safetensors"),
            figure_path: PathBuf::from("reports/figures/training_statistics.png"),
            epochs: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
            batch_size: NonZeroUsize::new(32).unwrap_or(NonZeroUsize::MIN),
            lr: 1e-3,
            seed: None,
            log_every: NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl TrainingConfig {
    /// Reads a config from a JSON file, filling missing fields with their defaults.
    ///
    /// # Arguments
    /// * `path` - The JSON file.
    ///
    /// # Returns
    /// The validated config or an error if the file can't be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| PipelineErr::Config {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the values serde can't check on its own.
    pub fn validate(&self) -> Result<()> {
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(PipelineErr::InvalidConfig(format!(
                "learning rate must be a positive number, got {}",
                self.lr
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");
        fs::write(&path, r#"{ "epochs": 3, "seed": 7 }"#).unwrap();

        let config = TrainingConfig::from_json_file(&path).unwrap();
        assert_eq!(config.epochs.get(), 3);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.batch_size.get(), 32);
        assert_eq!(config.model_path, PathBuf::from("models/model.safetensors"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");
        fs::write(&path, r#"{ "batch_size": 0 }"#).unwrap();

        let err = TrainingConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, PipelineErr::Config { .. }));
    }

    #[test]
    fn negative_learning_rate_is_rejected() {
        let config = TrainingConfig {
            lr: -0.1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineErr::InvalidConfig(_))));
    }
}
