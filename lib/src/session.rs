use std::{
  any::Any,
  panic::{self, AssertUnwindSafe},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{info, warn};

use crate::{
  model::{self, Dataset, Model, Prediction, PredictionInput, TrainConfig, Trainer, TrainingHistory},
  Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Idle,
  Training,
  Ready,
  Cancelled,
  Failed,
}

/// What a front-end polls: phase, ready flag and the history so far.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingStatus {
  pub phase: Phase,
  pub ready: bool,
  pub history: TrainingHistory,
  pub final_accuracy_percent: Option<f32>,
  pub error: Option<String>,
}

impl TrainingStatus {
  fn new(phase: Phase, history: TrainingHistory) -> Self {
    Self {
      phase,
      ready: phase == Phase::Ready,
      final_accuracy_percent: history.final_accuracy_percent(),
      history,
      error: None,
    }
  }
}

// Status and model travel together so a reader never sees one without the other.
#[derive(Clone)]
struct Snapshot {
  status: TrainingStatus,
  model: Option<Arc<Model>>,
}

impl Snapshot {
  fn phase(phase: Phase) -> Self {
    Self {
      status: TrainingStatus::new(phase, TrainingHistory::default()),
      model: None,
    }
  }
}

/// Owns the single trained model of a process. Written by one training task,
/// read by any number of predictors.
pub struct TrainingContext {
  tx: Arc<watch::Sender<Snapshot>>,
}

impl Default for TrainingContext {
  fn default() -> Self {
    Self::new()
  }
}

impl TrainingContext {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(Snapshot::phase(Phase::Idle));
    Self { tx: Arc::new(tx) }
  }

  pub fn status(&self) -> TrainingStatus {
    self.tx.borrow().status.clone()
  }

  pub fn is_ready(&self) -> bool {
    self.tx.borrow().status.ready
  }

  /// The trained model, once training has finished.
  pub fn model(&self) -> Result<Arc<Model>> {
    let snapshot = self.tx.borrow();
    model_of(&snapshot)
  }

  pub fn predict(&self, input: &PredictionInput) -> Result<Prediction> {
    let trained = self.model()?;
    model::predict(&trained, input)
  }

  /// Resolves when the current or next run finishes.
  pub async fn wait_ready(&self) -> Result<Arc<Model>> {
    let mut rx = self.tx.subscribe();
    loop {
      let outcome = {
        let snapshot = rx.borrow_and_update();
        match snapshot.status.phase {
          Phase::Idle | Phase::Training => None,
          _ => Some(model_of(&snapshot)),
        }
      };
      if let Some(outcome) = outcome {
        return outcome;
      }
      rx.changed()
        .await
        .map_err(|_| Error::TaskFailed("training context closed".into()))?;
    }
  }

  /// Trains `model` on a blocking worker. Only one run may be in flight, and
  /// once a model is published the context no longer accepts runs.
  pub fn start(&self, dataset: Dataset, config: TrainConfig, model: Model) -> Result<TrainingHandle> {
    self.start_with(dataset, Trainer::new(config), model)
  }

  /// Like [`TrainingContext::start`], with a caller-configured [`Trainer`].
  pub fn start_with(&self, dataset: Dataset, trainer: Trainer, mut model: Model) -> Result<TrainingHandle> {
    let mut claimed = Ok(());
    self.tx.send_if_modified(|snapshot| {
      claimed = match snapshot.status.phase {
        Phase::Training => Err(Error::TrainingInProgress),
        Phase::Ready => Err(Error::AlreadyTrained),
        Phase::Idle | Phase::Cancelled | Phase::Failed => Ok(()),
      };
      if claimed.is_err() {
        return false;
      }
      *snapshot = Snapshot::phase(Phase::Training);
      true
    });
    claimed?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    let tx = self.tx.clone();
    info!(rows = dataset.len(), "training task started");
    let join = tokio::task::spawn_blocking(move || {
      let epoch_tx = tx.clone();
      let trainer = trainer.with_cancel_flag(flag).on_epoch(move |_, history| {
        epoch_tx.send_modify(|snapshot| {
          snapshot.status = TrainingStatus::new(Phase::Training, history.clone());
        });
      });
      let result = panic::catch_unwind(AssertUnwindSafe(|| trainer.fit(&mut model, &dataset)))
        .unwrap_or_else(|payload| Err(Error::TaskFailed(panic_message(payload.as_ref()))));
      tx.send_modify(|snapshot| publish(snapshot, &result, model));
      result
    });
    Ok(TrainingHandle { cancel, join })
  }
}

fn publish(snapshot: &mut Snapshot, result: &Result<TrainingHistory>, model: Model) {
  let history = std::mem::take(&mut snapshot.status.history);
  *snapshot = match result {
    Ok(history) if model.epochs_trained() > 0 => {
      info!(epochs = history.len(), "model ready");
      Snapshot {
        status: TrainingStatus::new(Phase::Ready, history.clone()),
        model: Some(Arc::new(model)),
      }
    }
    Ok(history) => failed(history.clone(), "training ran no epochs".into()),
    Err(Error::TrainingCancelled) => {
      warn!("training cancelled, model discarded");
      Snapshot {
        status: TrainingStatus::new(Phase::Cancelled, history),
        model: None,
      }
    }
    Err(err) => failed(history, err.to_string()),
  };
}

fn failed(history: TrainingHistory, error: String) -> Snapshot {
  warn!(%error, "training failed");
  let mut status = TrainingStatus::new(Phase::Failed, history);
  status.error = Some(error);
  Snapshot {
    status,
    model: None,
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  let message = payload
    .downcast_ref::<&str>()
    .map(|s| s.to_string())
    .or_else(|| payload.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "unknown cause".into());
  format!("training panicked: {message}")
}

fn model_of(snapshot: &Snapshot) -> Result<Arc<Model>> {
  match (snapshot.status.phase, &snapshot.model) {
    (Phase::Ready, Some(model)) => Ok(model.clone()),
    (Phase::Cancelled, _) => Err(Error::TrainingCancelled),
    (Phase::Failed, _) => Err(Error::TaskFailed(
      snapshot.status.error.clone().unwrap_or_default(),
    )),
    _ => Err(Error::ModelNotReady),
  }
}

pub struct TrainingHandle {
  cancel: Arc<AtomicBool>,
  join: JoinHandle<Result<TrainingHistory>>,
}

impl TrainingHandle {
  /// Training stops before its next batch and the model is dropped.
  pub fn cancel(&self) {
    self.cancel.store(true, Ordering::SeqCst);
  }

  pub fn is_finished(&self) -> bool {
    self.join.is_finished()
  }

  pub async fn join(self) -> Result<TrainingHistory> {
    self
      .join
      .await
      .map_err(|err| Error::TaskFailed(err.to_string()))?
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::training::tests::toy_dataset;

  fn input() -> PredictionInput {
    PredictionInput::from([2.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
  }

  fn short_config(epochs: usize) -> TrainConfig {
    TrainConfig {
      epochs,
      batch_size: 8,
      patience: usize::MAX,
      ..Default::default()
    }
  }

  #[test]
  fn idle_context_rejects_predictions() {
    let ctx = TrainingContext::new();
    let status = ctx.status();
    assert_eq!(status.phase, Phase::Idle);
    assert!(!status.ready);
    assert!(status.history.is_empty());
    assert!(matches!(ctx.predict(&input()), Err(Error::ModelNotReady)));
  }

  #[tokio::test]
  async fn publishes_model_when_training_completes() {
    let ctx = TrainingContext::new();
    let handle = ctx
      .start(toy_dataset(40), short_config(3), Model::create(Some(8)))
      .unwrap();
    let history = handle.join().await.unwrap();
    assert_eq!(history.len(), 3);

    let status = ctx.status();
    assert_eq!(status.phase, Phase::Ready);
    assert!(status.ready && ctx.is_ready());
    assert_eq!(status.history, history);
    assert_eq!(status.final_accuracy_percent, history.final_accuracy_percent());
    assert_eq!(ctx.model().unwrap().epochs_trained(), 3);
    let p = ctx.predict(&input()).unwrap();
    assert!((0.0..=1.0).contains(&p.probability));
  }

  #[tokio::test]
  async fn wait_ready_resolves_after_training() {
    let ctx = Arc::new(TrainingContext::new());
    let waiter = {
      let ctx = ctx.clone();
      tokio::spawn(async move { ctx.wait_ready().await.map(|m| m.epochs_trained()) })
    };
    let handle = ctx
      .start(toy_dataset(20), short_config(2), Model::create(Some(8)))
      .unwrap();
    handle.join().await.unwrap();
    assert_eq!(waiter.await.unwrap().unwrap(), 2);
  }

  #[tokio::test]
  async fn second_start_is_rejected_and_cancel_discards_model() {
    let ctx = TrainingContext::new();
    let handle = ctx
      .start(toy_dataset(200), short_config(1_000_000), Model::create(Some(8)))
      .unwrap();
    let again = ctx.start(toy_dataset(10), short_config(1), Model::create(Some(9)));
    assert!(matches!(again, Err(Error::TrainingInProgress)));
    assert!(matches!(ctx.predict(&input()), Err(Error::ModelNotReady)));

    handle.cancel();
    assert!(matches!(handle.join().await, Err(Error::TrainingCancelled)));
    assert_eq!(ctx.status().phase, Phase::Cancelled);
    assert!(!ctx.is_ready());
    assert!(matches!(ctx.predict(&input()), Err(Error::TrainingCancelled)));
    assert!(matches!(ctx.wait_ready().await, Err(Error::TrainingCancelled)));
  }

  #[tokio::test]
  async fn ready_context_keeps_its_model() {
    let ctx = TrainingContext::new();
    let handle = ctx
      .start(toy_dataset(20), short_config(2), Model::create(Some(8)))
      .unwrap();
    handle.join().await.unwrap();
    let before = ctx.predict(&input()).unwrap();

    let again = ctx.start(toy_dataset(20), short_config(1), Model::create(Some(9)));
    assert!(matches!(again, Err(Error::AlreadyTrained)));
    assert_eq!(ctx.status().phase, Phase::Ready);
    assert_eq!(ctx.model().unwrap().epochs_trained(), 2);
    assert_eq!(ctx.predict(&input()).unwrap(), before);
  }

  #[tokio::test]
  async fn status_during_training_has_partial_history() {
    let ctx = TrainingContext::new();
    let handle = ctx
      .start(toy_dataset(40), short_config(1_000_000), Model::create(Some(3)))
      .unwrap();
    let mut rx = ctx.tx.subscribe();
    rx.wait_for(|s| !s.status.history.is_empty()).await.unwrap();

    let status = ctx.status();
    assert_eq!(status.phase, Phase::Training);
    assert!(!status.ready && !ctx.is_ready());
    assert!(!status.history.is_empty());
    assert!(status.final_accuracy_percent.is_some());
    assert!(ctx.tx.borrow().model.is_none());
    assert!(matches!(ctx.predict(&input()), Err(Error::ModelNotReady)));

    handle.cancel();
    assert!(matches!(handle.join().await, Err(Error::TrainingCancelled)));
  }

  #[tokio::test]
  async fn panicking_run_fails_and_frees_the_context() {
    let ctx = TrainingContext::new();
    let trainer = Trainer::new(short_config(3)).on_epoch(|_, _| panic!("observer gave up"));
    let handle = ctx
      .start_with(toy_dataset(20), trainer, Model::create(Some(5)))
      .unwrap();
    match handle.join().await {
      Err(Error::TaskFailed(msg)) => assert!(msg.contains("observer gave up"), "{msg}"),
      other => panic!("unexpected {other:?}"),
    }
    let status = ctx.status();
    assert_eq!(status.phase, Phase::Failed);
    assert!(status.error.unwrap().contains("observer gave up"));
    assert!(matches!(ctx.wait_ready().await, Err(Error::TaskFailed(_))));

    let handle = ctx
      .start(toy_dataset(20), short_config(1), Model::create(Some(5)))
      .unwrap();
    handle.join().await.unwrap();
    assert!(ctx.is_ready());
  }

  #[tokio::test]
  async fn failed_run_reports_error() {
    let ctx = TrainingContext::new();
    let config = TrainConfig {
      batch_size: 0,
      ..Default::default()
    };
    let handle = ctx.start(toy_dataset(10), config, Model::create(Some(1))).unwrap();
    assert!(matches!(handle.join().await, Err(Error::InvalidConfig(_))));
    let status = ctx.status();
    assert_eq!(status.phase, Phase::Failed);
    assert!(status.error.is_some());
    assert!(matches!(ctx.predict(&input()), Err(Error::TaskFailed(_))));
  }
}
