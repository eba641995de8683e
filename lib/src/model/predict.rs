use serde::Serialize;

use crate::{Error, Result};

use super::{Classification, Model, PredictionInput};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
  pub probability: f32,
  pub classification: Classification,
}

impl Prediction {
  pub fn label(&self) -> &'static str {
    self.classification.label()
  }
}

/// Classifies one already coded record. The model must have finished at
/// least one training epoch.
pub fn predict(model: &Model, input: &PredictionInput) -> Result<Prediction> {
  if model.epochs_trained() == 0 {
    return Err(Error::ModelNotReady);
  }
  let probability = model
    .probabilities(&[input.to_features()])
    .first()
    .copied()
    .unwrap_or(f32::NAN);
  Ok(Prediction {
    probability,
    classification: Classification::from_probability(probability),
  })
}
