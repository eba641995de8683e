pub use predict::*;
pub use server::*;
pub use train::*;

pub mod predict;
pub mod server;
pub mod train;

use itertools::Itertools;

use crate::{
  model::{build, create_model, TrainConfig, TrainingHistory},
  DataSource, Result, TrainingContext, TrainingHandle,
};

/// Training knobs shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Settings {
  pub config: TrainConfig,
  pub seed: Option<u64>,
  pub learning_rate: Option<f64>,
}

/// Loads the table from `source` and starts training it on `ctx`.
pub async fn start_training(
  ctx: &TrainingContext,
  source: &DataSource,
  settings: &Settings,
) -> Result<TrainingHandle> {
  let records = source.load_records().await?;
  let dataset = build(&records)?;
  let model = create_model(settings.seed, settings.learning_rate);
  ctx.start(dataset, settings.config.clone(), model)
}

pub(crate) fn accuracy_report(history: &TrainingHistory) -> String {
  let per_epoch = history
    .accuracy_percent()
    .iter()
    .map(|acc| format!("{acc:.2}"))
    .join(", ");
  match history.final_accuracy_percent() {
    Some(last) => format!("Epoch accuracy (%): [{per_epoch}]\nTraining Accuracy: {last:.2}%"),
    None => "Training Accuracy: n/a (no epochs ran)".to_owned(),
  }
}
