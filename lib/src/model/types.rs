use std::fmt;

use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 11;
pub const COLUMN_COUNT: usize = FEATURE_COUNT + 1;

/// Encoded features in [`Field::FEATURES`] order.
pub type FeatureVector = [f32; FEATURE_COUNT];
/// 0.0 or 1.0
pub type Label = f32;

/// Columns of the source table. The discriminant is the column's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
  Age,
  Sex,
  ChestPainType,
  RestingBP,
  Cholesterol,
  FastingBS,
  RestingECG,
  MaxHR,
  ExerciseAngina,
  Oldpeak,
  StSlope,
  HeartDisease,
}

impl Field {
  pub const ALL: [Field; COLUMN_COUNT] = [
    Field::Age,
    Field::Sex,
    Field::ChestPainType,
    Field::RestingBP,
    Field::Cholesterol,
    Field::FastingBS,
    Field::RestingECG,
    Field::MaxHR,
    Field::ExerciseAngina,
    Field::Oldpeak,
    Field::StSlope,
    Field::HeartDisease,
  ];

  /// Every column but the label, in feature vector order.
  pub const FEATURES: [Field; FEATURE_COUNT] = [
    Field::Age,
    Field::Sex,
    Field::ChestPainType,
    Field::RestingBP,
    Field::Cholesterol,
    Field::FastingBS,
    Field::RestingECG,
    Field::MaxHR,
    Field::ExerciseAngina,
    Field::Oldpeak,
    Field::StSlope,
  ];

  pub fn index(self) -> usize {
    self as usize
  }

  /// Exact header name in the source table.
  pub fn column_name(self) -> &'static str {
    match self {
      Field::Age => "Age",
      Field::Sex => "Sex",
      Field::ChestPainType => "ChestPainType",
      Field::RestingBP => "RestingBP",
      Field::Cholesterol => "Cholesterol",
      Field::FastingBS => "FastingBS",
      Field::RestingECG => "RestingECG",
      Field::MaxHR => "MaxHR",
      Field::ExerciseAngina => "ExerciseAngina",
      Field::Oldpeak => "Oldpeak",
      Field::StSlope => "ST_Slope",
      Field::HeartDisease => "HeartDisease",
    }
  }

  pub fn from_column_name(name: &str) -> Option<Field> {
    Field::ALL.into_iter().find(|f| f.column_name() == name)
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.column_name())
  }
}

/// One row of the source table, cell text kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
  values: [String; COLUMN_COUNT],
}

impl RawRecord {
  /// `values` are in [`Field::ALL`] order.
  pub fn new(values: [String; COLUMN_COUNT]) -> Self {
    Self { values }
  }

  pub fn from_strs(values: [&str; COLUMN_COUNT]) -> Self {
    Self::new(values.map(str::to_owned))
  }

  pub fn get(&self, field: Field) -> &str {
    &self.values[field.index()]
  }
}

/// Already coded form values, one per feature. Categorical fields carry the
/// code from the encoding tables, not the raw token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
  pub age: f32,
  pub sex: f32,
  pub chest_pain_type: f32,
  #[serde(rename = "restingBP")]
  pub resting_bp: f32,
  pub cholesterol: f32,
  #[serde(rename = "fastingBS")]
  pub fasting_bs: f32,
  #[serde(rename = "restingECG")]
  pub resting_ecg: f32,
  #[serde(rename = "maxHR")]
  pub max_hr: f32,
  pub exercise_angina: f32,
  pub oldpeak: f32,
  pub st_slope: f32,
}

impl PredictionInput {
  pub fn to_features(&self) -> FeatureVector {
    [
      self.age,
      self.sex,
      self.chest_pain_type,
      self.resting_bp,
      self.cholesterol,
      self.fasting_bs,
      self.resting_ecg,
      self.max_hr,
      self.exercise_angina,
      self.oldpeak,
      self.st_slope,
    ]
  }
}

impl From<FeatureVector> for PredictionInput {
  fn from(x: FeatureVector) -> Self {
    Self {
      age: x[0],
      sex: x[1],
      chest_pain_type: x[2],
      resting_bp: x[3],
      cholesterol: x[4],
      fasting_bs: x[5],
      resting_ecg: x[6],
      max_hr: x[7],
      exercise_angina: x[8],
      oldpeak: x[9],
      st_slope: x[10],
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
  Positive,
  Negative,
}

impl Classification {
  pub const THRESHOLD: f32 = 0.5;

  /// Strictly above the threshold is positive. NaN is negative.
  pub fn from_probability(p: f32) -> Self {
    if p > Self::THRESHOLD {
      Classification::Positive
    } else {
      Classification::Negative
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Classification::Positive => "Positive for Cardiovascular Disease",
      Classification::Negative => "Negative for Cardiovascular Disease",
    }
  }
}

impl fmt::Display for Classification {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}
