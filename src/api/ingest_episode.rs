use axum::{Json, extract::State, http::StatusCode};
use epigraph_core::{IngestOutcome, ingest_episode as run_ingest};
use epigraph_llm::openai::OpenAiClient;
use epigraph_shared::{AppError, Episode};
use serde::Serialize;

use crate::utils::AppState;

#[derive(Serialize)]
pub struct IngestEpisodeResponse {
  pub already_ingested: bool,
  pub entities_resolved: usize,
  pub edges_touched: usize,
}

#[axum::debug_handler]
pub async fn ingest_episode(
  State(state): State<AppState>,
  Json(episode): Json<Episode>,
) -> Result<(StatusCode, Json<IngestEpisodeResponse>), AppError> {
  let client = OpenAiClient;

  let outcome = run_ingest(&state.db, &episode, &client, &client, &client).await?;

  let response = match outcome {
    IngestOutcome::AlreadyIngested => IngestEpisodeResponse {
      already_ingested: true,
      entities_resolved: 0,
      edges_touched: 0,
    },
    IngestOutcome::Processed {
      entities_resolved,
      edges_touched,
    } => IngestEpisodeResponse {
      already_ingested: false,
      entities_resolved,
      edges_touched,
    },
  };

  Ok((StatusCode::OK, Json(response)))
}
