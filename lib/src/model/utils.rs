use std::path::Path;

use crate::{Error, Result};

use super::{Field, RawRecord, COLUMN_COUNT};

/// Parses a comma separated table whose first non-blank line names the
/// columns. Column order is free and unknown columns are ignored. Blank
/// lines are skipped.
pub fn parse_table(content: &str) -> Result<Vec<RawRecord>> {
  let mut lines = content
    .lines()
    .enumerate()
    .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
    .filter(|(_, line)| !line.trim().is_empty());

  let header: Vec<&str> = match lines.next() {
    Some((_, line)) => split_cells(line).collect(),
    None => return Ok(Vec::new()),
  };
  let mut columns = [0usize; COLUMN_COUNT];
  for field in Field::ALL {
    columns[field.index()] = header
      .iter()
      .position(|name| *name == field.column_name())
      .ok_or(Error::MissingColumn(field.column_name()))?;
  }

  lines
    .map(|(line_no, line)| {
      let cells: Vec<&str> = split_cells(line).collect();
      if cells.len() != header.len() {
        return Err(Error::MalformedRow {
          line: line_no,
          expected: header.len(),
          found: cells.len(),
        });
      }
      Ok(RawRecord::new(columns.map(|c| cells[c].to_owned())))
    })
    .collect()
}

fn split_cells(line: &str) -> impl Iterator<Item = &str> {
  line.split(',').map(|cell| cell.trim().trim_matches('"'))
}

pub fn read_dataset(path: &Path) -> Result<Vec<RawRecord>> {
  let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
    path: path.to_path_buf(),
    source,
  })?;
  parse_table(&content)
}

#[cfg(test)]
mod tests {
  use super::*;

  const HEADER: &str =
    "Age,Sex,ChestPainType,RestingBP,Cholesterol,FastingBS,RestingECG,MaxHR,ExerciseAngina,Oldpeak,ST_Slope,HeartDisease";

  #[test]
  fn header_row_names_fields() {
    let table = format!(
      "{HEADER}\r\n40,M,ATA,140,289,0,Normal,172,N,0,Up,0\r\n49,F,NAP,160,180,0,Normal,156,N,1,Flat,1\r\n\r\n"
    );
    let records = parse_table(&table).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get(Field::ChestPainType), "ATA");
    assert_eq!(records[1].get(Field::StSlope), "Flat");
    assert_eq!(records[1].get(Field::HeartDisease), "1");
  }

  #[test]
  fn column_order_is_taken_from_header() {
    let table = "HeartDisease,Note,ST_Slope,Oldpeak,ExerciseAngina,MaxHR,RestingECG,FastingBS,Cholesterol,RestingBP,ChestPainType,Sex,Age\n\
                 1,x,Down,2.0,Y,99,LVH,1,200,120,TA,F,63\n";
    let records = parse_table(table).unwrap();
    assert_eq!(records[0].get(Field::Age), "63");
    assert_eq!(records[0].get(Field::Sex), "F");
    assert_eq!(records[0].get(Field::HeartDisease), "1");
  }

  #[test]
  fn missing_column_is_reported() {
    let table = "Age,Sex\n40,M\n";
    assert!(matches!(
      parse_table(table),
      Err(Error::MissingColumn("ChestPainType"))
    ));
  }

  #[test]
  fn short_row_is_reported_with_line_number() {
    let table = format!("{HEADER}\n40,M,ATA,140,289,0,Normal,172,N,0,Up,0\n41,M,ATA\n");
    match parse_table(&table) {
      Err(Error::MalformedRow { line, expected, found }) => {
        assert_eq!((line, expected, found), (3, 12, 3));
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn empty_content_has_no_records() {
    assert!(parse_table("").unwrap().is_empty());
    assert!(parse_table(HEADER).unwrap().is_empty());
  }

  #[test]
  fn reads_fixture_file() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/heart_sample.csv");
    let records = read_dataset(&path).unwrap();
    assert!(records.len() >= 40);
    assert_eq!(records[0].get(Field::Age), "40");
  }

  #[test]
  fn missing_file_is_io_error() {
    let err = read_dataset(Path::new("/definitely/not/here.csv")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
  }
}
