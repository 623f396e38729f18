//! Handler for `GET /revs`.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use statesearch_core::{
  Revision,
  embed::Embedder,
  store::{ActivityStore, FeedbackStore, TheoremStore},
  vector::VectorStore,
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct RevsResponse {
  pub revs: Vec<Revision>,
}

pub async fn handler<E, V, S>(
  State(state): State<AppState<E, V, S>>,
) -> Result<Json<RevsResponse>, ApiError>
where
  E: Embedder,
  V: VectorStore,
  S: TheoremStore + FeedbackStore + ActivityStore,
{
  let revs = state.engine.registry.all_revisions().await?;
  Ok(Json(RevsResponse { revs }))
}
