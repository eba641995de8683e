use tracing::debug;

use crate::{Error, Result};

use super::{encoding::encode, FeatureVector, Label, RawRecord};

/// Index-aligned features and labels. Fields are private so the two
/// sequences cannot drift apart after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
  features: Vec<FeatureVector>,
  labels: Vec<Label>,
}

impl Dataset {
  /// Fails on mismatched lengths and on empty input.
  pub fn from_parts(features: Vec<FeatureVector>, labels: Vec<Label>) -> Result<Self> {
    if features.len() != labels.len() {
      return Err(Error::MisalignedData {
        features: features.len(),
        labels: labels.len(),
      });
    }
    if features.is_empty() {
      return Err(Error::EmptyDataset);
    }
    Ok(Self { features, labels })
  }

  pub fn features(&self) -> &[FeatureVector] {
    &self.features
  }

  pub fn labels(&self) -> &[Label] {
    &self.labels
  }

  pub fn len(&self) -> usize {
    self.features.len()
  }

  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }

  /// Trailing `validation_split` fraction becomes the validation part, in
  /// index order, without shuffling.
  pub fn split(&self, validation_split: f32) -> (Split<'_>, Split<'_>) {
    let at = split_point(self.len(), validation_split);
    let (x_train, x_val) = self.features.split_at(at);
    let (y_train, y_val) = self.labels.split_at(at);
    (
      Split {
        features: x_train,
        labels: y_train,
      },
      Split {
        features: x_val,
        labels: y_val,
      },
    )
  }
}

/// Borrowed contiguous slice of a [`Dataset`].
#[derive(Debug, Clone, Copy)]
pub struct Split<'a> {
  pub features: &'a [FeatureVector],
  pub labels: &'a [Label],
}

impl<'a> Split<'a> {
  pub fn len(&self) -> usize {
    self.features.len()
  }

  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }

  /// The last batch may be shorter than `batch_size`.
  pub fn batches(self, batch_size: usize) -> impl Iterator<Item = Split<'a>> + 'a {
    let (features, labels) = (self.features, self.labels);
    features
      .chunks(batch_size)
      .zip(labels.chunks(batch_size))
      .map(|(features, labels)| Split { features, labels })
  }
}

fn split_point(len: usize, validation_split: f32) -> usize {
  (len as f32 * (1.0 - validation_split)).floor() as usize
}

pub fn build(records: &[RawRecord]) -> Result<Dataset> {
  if records.is_empty() {
    return Err(Error::EmptyDataset);
  }
  let mut features = Vec::with_capacity(records.len());
  let mut labels = Vec::with_capacity(records.len());
  for (position, record) in records.iter().enumerate() {
    let (x, y) = encode(record).map_err(|source| Error::Encoding { position, source })?;
    features.push(x);
    labels.push(y);
  }
  debug!("encoded {} records", features.len());
  Dataset::from_parts(features, labels)
}
