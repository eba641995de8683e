use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use dfdx::{optim::Adam, prelude::*};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Result};

use super::{
  network::{correct, Model},
  Dataset, FeatureVector, Label, Split,
};

/// Quantity early stopping watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Monitor {
  #[default]
  ValidationLoss,
  TrainingLoss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
  pub epochs: usize,
  pub batch_size: usize,
  pub validation_split: f32,
  pub monitor: Monitor,
  pub patience: usize,
  pub min_delta: f32,
  /// Reorder training rows every epoch, seeded from the model seed.
  /// Validation membership is unaffected.
  #[serde(default = "default_shuffle")]
  pub shuffle: bool,
}

fn default_shuffle() -> bool {
  true
}

impl Default for TrainConfig {
  fn default() -> Self {
    Self {
      epochs: 50,
      batch_size: 32,
      validation_split: 0.2,
      monitor: Monitor::ValidationLoss,
      patience: 10,
      min_delta: 0.0,
      shuffle: true,
    }
  }
}

impl TrainConfig {
  pub fn validate(&self) -> Result<()> {
    if self.batch_size == 0 {
      return Err(Error::InvalidConfig("batch size must be positive".into()));
    }
    if !(0.0..1.0).contains(&self.validation_split) {
      return Err(Error::InvalidConfig(format!(
        "validation split {} is outside [0, 1)",
        self.validation_split
      )));
    }
    if !(self.min_delta >= 0.0) {
      return Err(Error::InvalidConfig("min delta must be non-negative".into()));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
  /// 1-based
  pub epoch: usize,
  pub loss: f32,
  pub accuracy: f32,
  pub val_loss: Option<f32>,
  pub val_accuracy: Option<f32>,
}

/// Per-epoch metrics of one training run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
  epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
  pub fn push(&mut self, metrics: EpochMetrics) {
    self.epochs.push(metrics);
  }

  pub fn epochs(&self) -> &[EpochMetrics] {
    &self.epochs
  }

  pub fn len(&self) -> usize {
    self.epochs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.epochs.is_empty()
  }

  /// Training accuracy per epoch as a fraction.
  pub fn accuracy(&self) -> Vec<f32> {
    self.epochs.iter().map(|m| m.accuracy).collect()
  }

  pub fn accuracy_percent(&self) -> Vec<f32> {
    self.epochs.iter().map(|m| m.accuracy * 100.0).collect()
  }

  pub fn final_accuracy_percent(&self) -> Option<f32> {
    self.epochs.last().map(|m| m.accuracy * 100.0)
  }
}

/// Stops once the monitored loss has not improved by more than `min_delta`
/// for `patience` consecutive epochs.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
  patience: usize,
  min_delta: f32,
  best: f32,
  wait: usize,
}

impl EarlyStopping {
  pub fn new(patience: usize, min_delta: f32) -> Self {
    Self {
      patience,
      min_delta,
      best: f32::INFINITY,
      wait: 0,
    }
  }

  pub fn best(&self) -> f32 {
    self.best
  }

  /// Returns true when training should stop after this epoch.
  pub fn update(&mut self, loss: f32) -> bool {
    if loss < self.best - self.min_delta {
      self.best = loss;
      self.wait = 0;
      false
    } else {
      self.wait += 1;
      self.wait >= self.patience
    }
  }
}

type EpochObserver = Box<dyn FnMut(&EpochMetrics, &TrainingHistory) + Send>;

pub struct Trainer {
  config: TrainConfig,
  cancel: Option<Arc<AtomicBool>>,
  observers: Vec<EpochObserver>,
}

impl Trainer {
  pub fn new(config: TrainConfig) -> Self {
    Self {
      config,
      cancel: None,
      observers: Vec::new(),
    }
  }

  /// Checked before every batch. Once set, the run ends with
  /// [`Error::TrainingCancelled`].
  pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
    self.cancel = Some(flag);
    self
  }

  /// Called after every completed epoch with that epoch's metrics and the
  /// history so far. Observers run in registration order.
  pub fn on_epoch(mut self, observer: impl FnMut(&EpochMetrics, &TrainingHistory) + Send + 'static) -> Self {
    self.observers.push(Box::new(observer));
    self
  }

  fn cancelled(&self) -> bool {
    self
      .cancel
      .as_ref()
      .map(|flag| flag.load(Ordering::SeqCst))
      .unwrap_or(false)
  }

  /// Fits `model` in place. Weights after the last executed epoch are kept,
  /// including when early stopping fires.
  #[tracing::instrument(skip_all, fields(rows = dataset.len()))]
  pub fn fit(mut self, model: &mut Model, dataset: &Dataset) -> Result<TrainingHistory> {
    self.config.validate()?;
    let config = self.config.clone();
    let (train, val) = dataset.split(config.validation_split);
    if train.is_empty() {
      return Err(Error::EmptyTrainingSplit {
        records: dataset.len(),
        validation_split: config.validation_split,
      });
    }
    if val.is_empty() && config.monitor == Monitor::ValidationLoss {
      warn!("no validation rows, early stopping on validation loss is disabled");
    }
    info!(train = train.len(), validation = val.len(), "starting training");

    let mut grads = model.network.alloc_grads();
    let mut opt = Adam::new(&model.network, model.compilation().optimizer.clone());
    let mut stopper = EarlyStopping::new(config.patience, config.min_delta);
    let mut history = TrainingHistory::default();
    let mut rng = StdRng::seed_from_u64(model.seed());
    let mut order: Vec<usize> = (0..train.len()).collect();
    let start = std::time::Instant::now();

    for epoch in 1..=config.epochs {
      if config.shuffle {
        order.shuffle(&mut rng);
      }
      let (features, labels) = reorder(train, &order);
      let epoch_rows = Split {
        features: &features,
        labels: &labels,
      };
      let (mut loss_sum, mut hits, mut seen) = (0.0f32, 0usize, 0usize);
      for (step, batch) in epoch_rows.batches(config.batch_size).enumerate() {
        if self.cancelled() {
          info!(epoch, step, "training cancelled");
          return Err(Error::TrainingCancelled);
        }
        let x = model.batch(batch.features);
        let y = model.targets(batch.labels);
        let logits = model.network.forward_mut(x.traced(grads));
        let scores = logits.as_vec();
        let loss = binary_cross_entropy_with_logits_loss(logits, y);
        let batch_loss = loss.array();
        grads = loss.backward();
        opt
          .update(&mut model.network, &grads)
          .map_err(|err| Error::Optimizer(format!("{err:?}")))?;
        model.network.zero_grads(&mut grads);

        loss_sum += batch_loss * batch.len() as f32;
        hits += correct(&scores, batch.labels);
        seen += batch.len();
        debug!(epoch, step, batch_loss, "batch done");
      }
      model.finish_epoch();

      let (val_loss, val_accuracy) = if val.is_empty() {
        (None, None)
      } else {
        let (l, a) = model.evaluate(val.features, val.labels);
        (Some(l), Some(a))
      };
      let metrics = EpochMetrics {
        epoch,
        loss: loss_sum / seen as f32,
        accuracy: hits as f32 / seen as f32,
        val_loss,
        val_accuracy,
      };
      info!(
        epoch,
        loss = metrics.loss,
        acc = metrics.accuracy,
        val_loss = ?metrics.val_loss,
        val_acc = ?metrics.val_accuracy,
        "epoch done"
      );
      history.push(metrics);
      for observer in self.observers.iter_mut() {
        observer(&metrics, &history);
      }

      let monitored = match config.monitor {
        Monitor::ValidationLoss => metrics.val_loss,
        Monitor::TrainingLoss => Some(metrics.loss),
      };
      if let Some(monitored) = monitored {
        if stopper.update(monitored) {
          info!(epoch, best = stopper.best(), "early stopping");
          break;
        }
      }
    }

    if !history.is_empty() {
      info!(
        "Finished {} epochs in {:.2}s",
        history.len(),
        start.elapsed().as_secs_f32()
      );
    }
    Ok(history)
  }
}

fn reorder(rows: Split<'_>, order: &[usize]) -> (Vec<FeatureVector>, Vec<Label>) {
  order.iter().map(|&i| (rows.features[i], rows.labels[i])).unzip()
}

/// Fits `model` on `dataset` with `config`. See [`Trainer`] for hooks.
pub fn train(model: &mut Model, dataset: &Dataset, config: &TrainConfig) -> Result<TrainingHistory> {
  Trainer::new(config.clone()).fit(model, dataset)
}
