use std::sync::Arc;

use axum::{
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use crate::{
  model::PredictionInput, DataSource, Error, Result, TrainingContext, TrainingStatus,
};

use super::{start_training, Settings};

/// Trains in the background and serves status and predictions over HTTP.
pub struct Server {
  port: u16,
  source: DataSource,
  settings: Settings,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
  pub prediction: &'static str,
  pub probability: f32,
}

pub struct ApiError(Error);

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match self.0 {
      Error::ModelNotReady | Error::TrainingCancelled => StatusCode::SERVICE_UNAVAILABLE,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = serde_json::json!({ "error": self.0.to_string() });
    (status, Json(body)).into_response()
  }
}

impl Server {
  pub fn new(port: u16, source: DataSource, settings: Settings) -> Self {
    Self {
      port,
      source,
      settings,
    }
  }

  pub fn router(ctx: Arc<TrainingContext>) -> Router {
    Router::new()
      .route("/status", get(Self::status))
      .route("/predict", post(Self::predict))
      .with_state(ctx)
  }

  pub async fn run(self) -> Result<()> {
    let ctx = Arc::new(TrainingContext::new());
    let handle = start_training(&ctx, &self.source, &self.settings).await?;
    tokio::spawn(async move {
      match handle.join().await {
        Ok(history) => info!(epochs = history.len(), "background training finished"),
        Err(err) => error!(%err, "background training ended"),
      }
    });

    let server_addr = format!("0.0.0.0:{}", self.port);
    let tcp_listener = tokio::net::TcpListener::bind(&server_addr)
      .await
      .map_err(Error::Serve)?;
    info!("listening on {server_addr}");
    axum::serve(tcp_listener, Self::router(ctx))
      .await
      .map_err(Error::Serve)
  }

  async fn status(State(ctx): State<Arc<TrainingContext>>) -> Json<TrainingStatus> {
    Json(ctx.status())
  }

  async fn predict(
    State(ctx): State<Arc<TrainingContext>>,
    Json(input): Json<PredictionInput>,
  ) -> std::result::Result<Json<PredictionResponse>, ApiError> {
    let prediction = ctx.predict(&input).map_err(ApiError)?;
    Ok(Json(PredictionResponse {
      prediction: prediction.label(),
      probability: prediction.probability,
    }))
  }
}
