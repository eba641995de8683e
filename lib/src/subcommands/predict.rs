use std::path::PathBuf;

use tracing::info;

use crate::{
  model::{Prediction, PredictionInput},
  utils::deserialize_from_file,
  DataSource, Result, TrainingContext,
};

use super::{accuracy_report, start_training, Settings};

/// Trains on `source`, then classifies the coded record in `input_file`.
pub struct Predict {
  source: DataSource,
  settings: Settings,
  input_file: PathBuf,
}

impl Predict {
  pub fn new(source: DataSource, settings: Settings, input_file: PathBuf) -> Self {
    Self {
      source,
      settings,
      input_file,
    }
  }

  pub async fn run(self) -> Result<Prediction> {
    let input: PredictionInput = deserialize_from_file(&self.input_file)?;
    let ctx = TrainingContext::new();
    let history = start_training(&ctx, &self.source, &self.settings).await?.join().await?;
    info!("{}", accuracy_report(&history));
    let prediction = ctx.predict(&input)?;
    println!("Prediction: {}", prediction.label());
    Ok(prediction)
  }
}
