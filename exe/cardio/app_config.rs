use std::path::Path;

use serde::Deserialize;

/// Config file format. Every field is optional, command line flags win.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  /// Path or http(s) URL of the heart table
  pub data: Option<String>,
  pub epochs: Option<usize>,
  pub batch_size: Option<usize>,
  pub validation_split: Option<f32>,
  pub patience: Option<usize>,
  pub learning_rate: Option<f64>,
  /// Reorder training rows every epoch
  pub shuffle: Option<bool>,
  /// Weight initialization seed
  pub seed: Option<u64>,
  pub port: Option<u16>,
}

impl AppConfig {
  // merge configs where the second overwrites the first
  pub fn merge(self, other: Self) -> Self {
    Self {
      data: other.data.or(self.data),
      epochs: other.epochs.or(self.epochs),
      batch_size: other.batch_size.or(self.batch_size),
      validation_split: other.validation_split.or(self.validation_split),
      patience: other.patience.or(self.patience),
      learning_rate: other.learning_rate.or(self.learning_rate),
      shuffle: other.shuffle.or(self.shuffle),
      seed: other.seed.or(self.seed),
      port: other.port.or(self.port),
    }
  }

  pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
  }

  pub fn settings(&self) -> cardio::subcommands::Settings {
    let defaults = cardio::model::TrainConfig::default();
    cardio::subcommands::Settings {
      config: cardio::model::TrainConfig {
        epochs: self.epochs.unwrap_or(defaults.epochs),
        batch_size: self.batch_size.unwrap_or(defaults.batch_size),
        validation_split: self.validation_split.unwrap_or(defaults.validation_split),
        patience: self.patience.unwrap_or(defaults.patience),
        shuffle: self.shuffle.unwrap_or(defaults.shuffle),
        ..defaults
      },
      seed: self.seed,
      learning_rate: self.learning_rate,
    }
  }
}
