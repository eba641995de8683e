pub mod dataset;
pub mod encoding;
pub mod network;
pub mod predict;
pub mod training;
pub mod types;
pub mod utils;

pub use dataset::{build, Dataset, Split};
pub use encoding::encode;
pub use network::{Architecture, Compilation, Model};
pub use predict::{predict, Prediction};
pub use training::*;
pub use types::*;
pub use utils::*;

use tracing::info;

use crate::Result;

/// Everything needed for one training run: parsed table, training knobs and
/// the model seed.
pub struct TrainParams {
  pub records: Vec<RawRecord>,
  pub config: TrainConfig,
  pub seed: Option<u64>,
  pub learning_rate: Option<f64>,
}

#[derive(Debug)]
pub struct TrainedModel {
  pub model: Model,
  pub history: TrainingHistory,
}

/// Encodes, builds, creates and trains in one go.
#[tracing::instrument(skip_all, fields(records = params.records.len()))]
pub fn run_model(params: TrainParams) -> Result<TrainedModel> {
  let dataset = build(&params.records)?;
  let mut model = create_model(params.seed, params.learning_rate);
  let history = train(&mut model, &dataset, &params.config)?;
  if let Some(acc) = history.final_accuracy_percent() {
    info!("Training Accuracy: {acc:.2}%");
  }
  Ok(TrainedModel { model, history })
}

pub fn create_model(seed: Option<u64>, learning_rate: Option<f64>) -> Model {
  match learning_rate {
    Some(lr) => Model::with_optimizer(
      seed,
      dfdx::optim::AdamConfig {
        lr,
        ..Default::default()
      },
    ),
    None => Model::create(seed),
  }
}
