use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

#[cfg(not(debug_assertions))]
use human_panic::setup_panic;
use tracing::{subscriber::SetGlobalDefaultError, Level};

#[cfg(debug_assertions)]
extern crate better_panic;

use crate::{Error, Result};

// [NOTE] tracing
//
// Library code logs through the `tracing` macros only. The subscriber is
// installed once by the binary through `init_logging`.

pub fn install_logger(level: Level) -> std::result::Result<(), SetGlobalDefaultError> {
  let subscriber = tracing_subscriber::fmt()
    .compact()
    .with_max_level(level)
    .finish();
  tracing::subscriber::set_global_default(subscriber)
}

pub fn init_logging(level: Level) -> std::result::Result<(), SetGlobalDefaultError> {
  // Human Panic. Only enabled when *not* debugging.
  #[cfg(not(debug_assertions))]
  {
    setup_panic!();
  }

  // Better Panic. Only enabled *when* debugging.
  #[cfg(debug_assertions)]
  {
    better_panic::Settings::debug()
      .most_recent_first(false)
      .lineno_suffix(true)
      .verbosity(better_panic::Verbosity::Full)
      .install();
  }

  install_logger(level)?;

  Ok(())
}

pub fn serialize_to_file<T: Serialize>(path: &Path, obj: &T) -> Result<()> {
  let buff = serde_json::to_string_pretty(obj)?;
  std::fs::write(path, buff).map_err(|source| Error::Io {
    path: path.to_path_buf(),
    source,
  })
}

pub fn deserialize_from_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(serde_json::from_str(&content)?)
}
