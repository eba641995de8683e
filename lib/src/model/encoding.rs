use crate::error::EncodingError;

use super::{FeatureVector, Field, Label, RawRecord};

pub type CodeTable = &'static [(&'static str, f32)];

pub const SEX: CodeTable = &[("M", 1.0), ("F", 0.0)];
pub const CHEST_PAIN_TYPE: CodeTable = &[("ATA", 0.0), ("NAP", 1.0), ("ASY", 2.0), ("TA", 3.0)];
pub const RESTING_ECG: CodeTable = &[("Normal", 0.0), ("ST", 1.0), ("LVH", 2.0)];
pub const EXERCISE_ANGINA: CodeTable = &[("Y", 1.0), ("N", 0.0)];
pub const ST_SLOPE: CodeTable = &[("Up", 0.0), ("Flat", 1.0), ("Down", 2.0)];

impl Field {
  /// `None` for numeric fields.
  pub fn code_table(self) -> Option<CodeTable> {
    match self {
      Field::Sex => Some(SEX),
      Field::ChestPainType => Some(CHEST_PAIN_TYPE),
      Field::RestingECG => Some(RESTING_ECG),
      Field::ExerciseAngina => Some(EXERCISE_ANGINA),
      Field::StSlope => Some(ST_SLOPE),
      _ => None,
    }
  }
}

fn encode_field(field: Field, raw: &str) -> Result<f32, EncodingError> {
  let raw = raw.trim();
  match field.code_table() {
    Some(table) => table
      .iter()
      .find(|(token, _)| *token == raw)
      .map(|(_, code)| *code)
      .ok_or_else(|| EncodingError::UnknownCategory {
        field,
        value: raw.to_owned(),
      }),
    None => parse_number(raw).ok_or_else(|| EncodingError::NotNumeric {
      field,
      value: raw.to_owned(),
    }),
  }
}

// "NaN" and "inf" parse as f32, they are rejected all the same.
fn parse_number(raw: &str) -> Option<f32> {
  raw.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn encode_label(raw: &str) -> Result<Label, EncodingError> {
  match parse_number(raw.trim()) {
    Some(v) if v == 0.0 || v == 1.0 => Ok(v),
    _ => Err(EncodingError::InvalidLabel {
      value: raw.trim().to_owned(),
    }),
  }
}

pub fn encode(record: &RawRecord) -> Result<(FeatureVector, Label), EncodingError> {
  let mut features: FeatureVector = [0.0; super::FEATURE_COUNT];
  for (slot, field) in features.iter_mut().zip(Field::FEATURES) {
    *slot = encode_field(field, record.get(field))?;
  }
  let label = encode_label(record.get(Field::HeartDisease))?;
  Ok((features, label))
}

#[cfg(test)]
pub(crate) mod tests {
  use proptest::prelude::*;

  use super::*;

  pub(crate) fn record(values: [&str; super::super::COLUMN_COUNT]) -> RawRecord {
    RawRecord::from_strs(values)
  }

  #[test]
  fn encodes_first_row_of_heart_table() {
    let r = record([
      "40", "M", "ATA", "140", "289", "0", "Normal", "172", "N", "0", "Up", "0",
    ]);
    let (x, y) = encode(&r).unwrap();
    assert_eq!(x, [40.0, 1.0, 0.0, 140.0, 289.0, 0.0, 0.0, 172.0, 0.0, 0.0, 0.0]);
    assert_eq!(y, 0.0);
  }

  #[test]
  fn encodes_fractional_oldpeak_and_positive_label() {
    let r = record([
      "48", "F", "ASY", "138", "214", "0", "Normal", "108", "Y", "1.5", "Flat", "1",
    ]);
    let (x, y) = encode(&r).unwrap();
    assert_eq!(x, [48.0, 0.0, 2.0, 138.0, 214.0, 0.0, 0.0, 108.0, 1.0, 1.5, 1.0]);
    assert_eq!(y, 1.0);
  }

  #[test]
  fn unknown_category_is_rejected() {
    let r = record([
      "40", "M", "XX", "140", "289", "0", "Normal", "172", "N", "0", "Up", "0",
    ]);
    assert_eq!(
      encode(&r),
      Err(EncodingError::UnknownCategory {
        field: Field::ChestPainType,
        value: "XX".into()
      })
    );
  }

  #[test]
  fn categories_are_case_sensitive() {
    let r = record([
      "40", "m", "ATA", "140", "289", "0", "Normal", "172", "N", "0", "Up", "0",
    ]);
    assert!(matches!(
      encode(&r),
      Err(EncodingError::UnknownCategory { field: Field::Sex, .. })
    ));
  }

  #[test]
  fn unparseable_numbers_are_rejected() {
    for bad in ["", "abc", "NaN", "inf", "12x"] {
      let r = record([
        "40", "M", "ATA", bad, "289", "0", "Normal", "172", "N", "0", "Up", "0",
      ]);
      assert_eq!(
        encode(&r),
        Err(EncodingError::NotNumeric {
          field: Field::RestingBP,
          value: bad.into()
        }),
        "value {bad:?}"
      );
    }
  }

  #[test]
  fn label_must_be_binary() {
    let r = record([
      "40", "M", "ATA", "140", "289", "0", "Normal", "172", "N", "0", "Up", "2",
    ]);
    assert!(matches!(encode(&r), Err(EncodingError::InvalidLabel { .. })));
  }

  fn token(table: CodeTable) -> impl Strategy<Value = &'static str> {
    proptest::sample::select(table.iter().map(|(t, _)| *t).collect::<Vec<_>>())
  }

  proptest! {
    #[test]
    fn valid_records_encode_into_code_tables(
      age in 20u32..90,
      sex in token(SEX),
      cp in token(CHEST_PAIN_TYPE),
      bp in 0u32..220,
      chol in 0u32..600,
      fbs in 0u32..2,
      ecg in token(RESTING_ECG),
      hr in 60u32..210,
      angina in token(EXERCISE_ANGINA),
      oldpeak in -2.6f32..6.2,
      slope in token(ST_SLOPE),
      label in 0u32..2,
    ) {
      let cells = [
        age.to_string(), sex.to_owned(), cp.to_owned(), bp.to_string(), chol.to_string(),
        fbs.to_string(), ecg.to_owned(), hr.to_string(), angina.to_owned(),
        oldpeak.to_string(), slope.to_owned(), label.to_string(),
      ];
      let (x, y) = encode(&RawRecord::new(cells)).unwrap();
      prop_assert_eq!(x.len(), Field::FEATURES.len());
      for field in Field::FEATURES {
        let v = x[field.index()];
        match field.code_table() {
          Some(table) => prop_assert!(table.iter().any(|(_, code)| *code == v)),
          None => prop_assert!(v.is_finite()),
        }
      }
      prop_assert_eq!(x[Field::Oldpeak.index()], oldpeak);
      prop_assert!(y == 0.0 || y == 1.0);
    }
  }
}
