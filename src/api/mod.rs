use axum::{Router, routing::post};

use crate::utils::AppState;

mod ingest_episode;

pub fn app() -> Router<AppState> {
  Router::new().route("/api/v0/ingest_episode", post(ingest_episode::ingest_episode))
}
