use std::path::PathBuf;

use crate::{model::TrainingHistory, utils::serialize_to_file, DataSource, Result, TrainingContext};

use super::{accuracy_report, start_training, Settings};

pub struct Train {
  source: DataSource,
  settings: Settings,
  history_out: Option<PathBuf>,
}

impl Train {
  pub fn new(source: DataSource, settings: Settings, history_out: Option<PathBuf>) -> Self {
    Self {
      source,
      settings,
      history_out,
    }
  }

  pub async fn run(self) -> Result<TrainingHistory> {
    let ctx = TrainingContext::new();
    let history = start_training(&ctx, &self.source, &self.settings).await?.join().await?;
    println!("{}", accuracy_report(&history));
    if let Some(path) = &self.history_out {
      serialize_to_file(path, &history)?;
    }
    Ok(history)
  }
}
