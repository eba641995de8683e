use std::path::PathBuf;

use thiserror::Error;

use crate::model::Field;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A single field of a single record could not be encoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
  #[error("field {field} has unknown category {value:?}")]
  UnknownCategory { field: Field, value: String },
  #[error("field {field} is not a finite number: {value:?}")]
  NotNumeric { field: Field, value: String },
  #[error("label {value:?} is neither 0 nor 1")]
  InvalidLabel { value: String },
}

#[derive(Debug, Error)]
pub enum Error {
  /// `position` is the zero-based index of the record in the input table.
  #[error("record {position}: {source}")]
  Encoding {
    position: usize,
    #[source]
    source: EncodingError,
  },
  #[error("dataset contains no records")]
  EmptyDataset,
  #[error("{features} feature rows but {labels} labels")]
  MisalignedData { features: usize, labels: usize },
  #[error("validation split {validation_split} leaves no training rows out of {records}")]
  EmptyTrainingSplit { records: usize, validation_split: f32 },
  #[error("Model is still training, please wait.")]
  ModelNotReady,
  #[error("training was cancelled")]
  TrainingCancelled,
  #[error("training is already in progress")]
  TrainingInProgress,
  #[error("model is already trained")]
  AlreadyTrained,
  #[error("invalid training configuration: {0}")]
  InvalidConfig(String),
  #[error("table header is missing column {0:?}")]
  MissingColumn(&'static str),
  #[error("line {line}: expected {expected} cells, found {found}")]
  MalformedRow {
    line: usize,
    expected: usize,
    found: usize,
  },
  #[error("optimizer update failed: {0}")]
  Optimizer(String),
  #[error("training task failed: {0}")]
  TaskFailed(String),
  #[error("i/o error on {path:?}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("server failed: {0}")]
  Serve(#[source] std::io::Error),
  #[error("fetching data failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("data is not valid UTF-8: {0}")]
  Utf8(#[from] std::string::FromUtf8Error),
  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}
