//! Handler for `POST /search`.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use statesearch_core::{
  embed::Embedder,
  store::{ActivityStore, FeedbackStore, TheoremStore},
  theorem::TheoremResult,
  vector::VectorStore,
};
use statesearch_engine::SearchRequest;
use tokio::time::Instant;

use crate::{AppState, error::ApiError};

fn default_nresult() -> i64 { 10 }

#[derive(Debug, Deserialize)]
pub struct SearchBody {
  /// Raw proof state.
  pub query:   String,
  pub rev:     String,
  /// Clamped into `[1, 100]` by the engine.
  #[serde(default = "default_nresult")]
  pub nresult: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
  pub results: Vec<TheoremResult>,
}

pub async fn handler<E, V, S>(
  State(state): State<AppState<E, V, S>>,
  body: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError>
where
  E: Embedder,
  V: VectorStore,
  S: TheoremStore + FeedbackStore + ActivityStore,
{
  let Json(body) = body?;
  let request = SearchRequest {
    query:    body.query,
    rev:      body.rev,
    nresult:  body.nresult,
    deadline: state.request_timeout.map(|t| Instant::now() + t),
  };
  let results = state.engine.retriever.search(request).await?;
  Ok(Json(SearchResponse { results }))
}
