mod app_config;

use app_config::AppConfig;
use cardio::*;

use clap::{Parser, Subcommand};
use std::{error::Error, path::PathBuf};

#[derive(Parser)]
struct Cli {
  /// YAML file with defaults for the training options
  #[arg(short, long, value_name = "PATH", global = true)]
  config: Option<PathBuf>,
  /// Log debug output
  #[arg(short, long, global = true)]
  verbose: bool,
  #[command(subcommand)]
  command: Command,
}

#[derive(clap::Args)]
struct TrainArgs {
  /// Heart table, local path or http(s) URL
  #[arg(short, long, value_name = "PATH|URL")]
  data: Option<String>,
  #[arg(short, long, value_name = "INT")]
  epochs: Option<usize>,
  #[arg(long, value_name = "INT")]
  batch_size: Option<usize>,
  #[arg(long, value_name = "FRACTION")]
  validation_split: Option<f32>,
  #[arg(long, value_name = "INT")]
  patience: Option<usize>,
  #[arg(long, value_name = "FLOAT")]
  learning_rate: Option<f64>,
  /// Keep training rows in table order every epoch
  #[arg(long)]
  no_shuffle: bool,
  /// Weight initialization seed, random when omitted
  #[arg(long, value_name = "INT")]
  seed: Option<u64>,
}

impl TrainArgs {
  fn into_config(self) -> AppConfig {
    AppConfig {
      data: self.data,
      epochs: self.epochs,
      batch_size: self.batch_size,
      validation_split: self.validation_split,
      patience: self.patience,
      learning_rate: self.learning_rate,
      shuffle: self.no_shuffle.then_some(false),
      seed: self.seed,
      port: None,
    }
  }
}

#[derive(Subcommand)]
enum Command {
  /// Train on the table and report accuracy
  Train {
    #[command(flatten)]
    train: TrainArgs,
    /// Write the per-epoch metrics as JSON
    #[arg(long, value_name = "PATH")]
    history_out: Option<PathBuf>,
  },
  /// Train, then classify one coded record read from a JSON file
  Predict {
    #[command(flatten)]
    train: TrainArgs,
    #[arg(short, long, value_name = "PATH")]
    input_file: PathBuf,
  },
  /// Train in the background and serve /status and /predict
  Serve {
    #[command(flatten)]
    train: TrainArgs,
    #[arg(short, long)]
    port: Option<u16>,
  },
}

const DEFAULT_PORT: u16 = 4545;

fn data_source(config: &AppConfig) -> Result<DataSource, Box<dyn Error>> {
  let data = config
    .data
    .as_deref()
    .ok_or("no data source given, pass --data or set `data` in the config file")?;
  Ok(data.parse()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
  let args = Cli::parse();
  let level = if args.verbose {
    tracing::Level::DEBUG
  } else {
    tracing::Level::INFO
  };
  utils::init_logging(level)?;

  let file_config = match &args.config {
    Some(path) => AppConfig::load(path)?,
    None => AppConfig::default(),
  };

  match args.command {
    Command::Train { train, history_out } => {
      let config = file_config.merge(train.into_config());
      let app = subcommands::Train::new(data_source(&config)?, config.settings(), history_out);
      app.run().await?;
    }
    Command::Predict { train, input_file } => {
      let config = file_config.merge(train.into_config());
      let app = subcommands::Predict::new(data_source(&config)?, config.settings(), input_file);
      app.run().await?;
    }
    Command::Serve { train, port } => {
      let cli = AppConfig {
        port,
        ..train.into_config()
      };
      let config = file_config.merge(cli);
      let port = config.port.unwrap_or(DEFAULT_PORT);
      let app = subcommands::Server::new(port, data_source(&config)?, config.settings());
      app.run().await?;
    }
  }
  Ok(())
}
