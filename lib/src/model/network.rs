use std::fmt;

use dfdx::{optim::AdamConfig, prelude::*};
use tracing::info;

use super::{FeatureVector, FEATURE_COUNT};

/// 11 -> 64 -> 32 -> 1. The output unit is a logit; sigmoid is applied by
/// [`Model::probabilities`] and fused into the loss during training.
pub type Architecture = (
  (Linear<FEATURE_COUNT, 64>, ReLU),
  (Linear<64, 32>, ReLU),
  Linear<32, 1>,
);

pub type Network = <Architecture as BuildOnDevice<Cpu, f32>>::Built;

/// Everything `compile` fixes besides the weights.
#[derive(Debug, Clone)]
pub struct Compilation {
  pub optimizer: AdamConfig,
}

impl Default for Compilation {
  fn default() -> Self {
    Self {
      optimizer: AdamConfig::default(),
    }
  }
}

pub struct Model {
  pub(crate) device: Cpu,
  pub(crate) network: Network,
  compilation: Compilation,
  seed: u64,
  epochs_trained: usize,
}

impl Model {
  /// Builds and compiles the network. Without a seed the weights are drawn
  /// from a random one, which is logged.
  pub fn create(seed: Option<u64>) -> Self {
    Self::with_optimizer(seed, AdamConfig::default())
  }

  pub fn with_optimizer(seed: Option<u64>, optimizer: AdamConfig) -> Self {
    let seed = seed.unwrap_or_else(rand::random);
    let device = Cpu::seed_from_u64(seed);
    let network = device.build_module::<Architecture, f32>();
    info!(seed, lr = optimizer.lr, "created model");
    Self {
      device,
      network,
      compilation: Compilation { optimizer },
      seed,
      epochs_trained: 0,
    }
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }

  pub fn compilation(&self) -> &Compilation {
    &self.compilation
  }

  pub fn epochs_trained(&self) -> usize {
    self.epochs_trained
  }

  pub(crate) fn finish_epoch(&mut self) {
    self.epochs_trained += 1;
  }

  pub(crate) fn batch(&self, rows: &[FeatureVector]) -> Tensor<(usize, Const<FEATURE_COUNT>), f32, Cpu> {
    let flat: Vec<f32> = rows.iter().flat_map(|x| x.iter().copied()).collect();
    self.device.tensor_from_vec(flat, (rows.len(), Const::<FEATURE_COUNT>))
  }

  pub(crate) fn targets(&self, labels: &[f32]) -> Tensor<(usize, Const<1>), f32, Cpu> {
    self.device.tensor_from_vec(labels.to_vec(), (labels.len(), Const::<1>))
  }

  /// Raw network outputs, one per row.
  pub fn logits(&self, rows: &[FeatureVector]) -> Vec<f32> {
    if rows.is_empty() {
      return Vec::new();
    }
    self.network.forward(self.batch(rows)).as_vec()
  }

  /// Sigmoid outputs, one per row.
  pub fn probabilities(&self, rows: &[FeatureVector]) -> Vec<f32> {
    if rows.is_empty() {
      return Vec::new();
    }
    self.network.forward(self.batch(rows)).sigmoid().as_vec()
  }

  /// Mean binary cross-entropy and accuracy over `rows`.
  pub fn evaluate(&self, rows: &[FeatureVector], labels: &[f32]) -> (f32, f32) {
    if rows.is_empty() {
      return (f32::NAN, f32::NAN);
    }
    let logits = self.network.forward(self.batch(rows));
    let scores = logits.as_vec();
    let loss = binary_cross_entropy_with_logits_loss(logits, self.targets(labels)).array();
    (loss, accuracy(&scores, labels))
  }

  #[cfg(test)]
  pub(crate) fn mark_trained(&mut self) {
    self.epochs_trained = self.epochs_trained.max(1);
  }
}

/// Fraction of rows whose thresholded logit matches the label.
/// `logit > 0` is the same decision as `sigmoid(logit) > 0.5`.
pub(crate) fn accuracy(logits: &[f32], labels: &[f32]) -> f32 {
  correct(logits, labels) as f32 / labels.len().max(1) as f32
}

pub(crate) fn correct(logits: &[f32], labels: &[f32]) -> usize {
  logits
    .iter()
    .zip(labels)
    .filter(|(logit, label)| (**logit > 0.0) == (**label > 0.5))
    .count()
}

impl fmt::Debug for Model {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Model")
      .field("seed", &self.seed)
      .field("compilation", &self.compilation)
      .field("epochs_trained", &self.epochs_trained)
      .finish_non_exhaustive()
  }
}
