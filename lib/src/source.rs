use std::{fmt, path::PathBuf, str::FromStr};

use tracing::info;

use crate::{
  model::{parse_table, RawRecord},
  Error, Result,
};

/// Where the raw table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
  Path(PathBuf),
  Url(String),
}

impl FromStr for DataSource {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    if s.starts_with("http://") || s.starts_with("https://") {
      Ok(DataSource::Url(s.to_owned()))
    } else {
      Ok(DataSource::Path(PathBuf::from(s)))
    }
  }
}

impl fmt::Display for DataSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DataSource::Path(path) => write!(f, "{}", path.display()),
      DataSource::Url(url) => f.write_str(url),
    }
  }
}

impl DataSource {
  pub async fn fetch_bytes(&self) -> Result<Vec<u8>> {
    match self {
      DataSource::Path(path) => tokio::fs::read(path).await.map_err(|source| Error::Io {
        path: path.clone(),
        source,
      }),
      DataSource::Url(url) => {
        let response = reqwest::get(url).await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
      }
    }
  }

  /// Fetches the table and decodes it as UTF-8.
  pub async fn fetch_text(&self) -> Result<String> {
    let bytes = self.fetch_bytes().await?;
    Ok(String::from_utf8(bytes)?)
  }

  #[tracing::instrument(skip_all, fields(source = %self))]
  pub async fn load_records(&self) -> Result<Vec<RawRecord>> {
    let records = parse_table(&self.fetch_text().await?)?;
    info!("loaded {} records", records.len());
    Ok(records)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;
  use crate::model::Field;

  #[test]
  fn urls_and_paths_are_told_apart() {
    assert_eq!(
      "https://example.org/heart.csv".parse::<DataSource>().unwrap(),
      DataSource::Url("https://example.org/heart.csv".into())
    );
    assert_eq!(
      "data/heart.csv".parse::<DataSource>().unwrap(),
      DataSource::Path(PathBuf::from("data/heart.csv"))
    );
  }

  #[tokio::test]
  async fn loads_records_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "Age,Sex,ChestPainType,RestingBP,Cholesterol,FastingBS,RestingECG,MaxHR,ExerciseAngina,Oldpeak,ST_Slope,HeartDisease"
    )
    .unwrap();
    writeln!(file, "40,M,ATA,140,289,0,Normal,172,N,0,Up,0").unwrap();
    let source = DataSource::Path(file.path().to_path_buf());
    let records = source.load_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get(Field::MaxHR), "172");
  }

  #[tokio::test]
  async fn invalid_utf8_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0x41, 0x67, 0x65, 0xff, 0xfe]).unwrap();
    let source = DataSource::Path(file.path().to_path_buf());
    assert!(matches!(source.fetch_text().await, Err(Error::Utf8(_))));
  }

  #[tokio::test]
  async fn missing_file_is_io_error() {
    let source = DataSource::Path(PathBuf::from("/no/such/heart.csv"));
    assert!(matches!(source.fetch_bytes().await, Err(Error::Io { .. })));
  }
}
