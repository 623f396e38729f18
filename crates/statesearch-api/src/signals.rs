//! Handlers for `POST /feedback`, `POST /click` and `POST /call`.
//!
//! All three answer `{}` on success.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Deserialize;
use serde_json::{Value, json};
use statesearch_core::{
  embed::Embedder,
  signal::{NewCall, NewClick, NewFeedback},
  store::{ActivityStore, FeedbackStore, TheoremStore},
  theorem::TheoremId,
  vector::VectorStore,
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
  pub query:      String,
  pub theorem_id: TheoremId,
  pub relevant:   bool,
  pub rank:       i64,
  /// Overwrite the latest judgment for `(query, theorem_id)` instead of
  /// appending a new one.
  #[serde(default)]
  pub update:     bool,
}

#[derive(Debug, Deserialize)]
pub struct ClickBody {
  pub query:      String,
  pub theorem_id: TheoremId,
  pub rank:       i64,
}

#[derive(Debug, Deserialize)]
pub struct CallBody {
  pub call_type: String,
  #[serde(default)]
  pub query:     String,
}

pub async fn feedback<E, V, S>(
  State(state): State<AppState<E, V, S>>,
  body: Result<Json<FeedbackBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  E: Embedder,
  V: VectorStore,
  S: TheoremStore + FeedbackStore + ActivityStore,
{
  let Json(body) = body?;
  let input = NewFeedback {
    query:      body.query,
    theorem_id: body.theorem_id,
    relevant:   body.relevant,
    rank:       body.rank,
  };
  state.engine.recorder.feedback(input, body.update).await?;
  Ok(Json(json!({})))
}

pub async fn click<E, V, S>(
  State(state): State<AppState<E, V, S>>,
  body: Result<Json<ClickBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  E: Embedder,
  V: VectorStore,
  S: TheoremStore + FeedbackStore + ActivityStore,
{
  let Json(body) = body?;
  state
    .engine
    .recorder
    .click(NewClick { query: body.query, theorem_id: body.theorem_id, rank: body.rank })
    .await?;
  Ok(Json(json!({})))
}

pub async fn call<E, V, S>(
  State(state): State<AppState<E, V, S>>,
  body: Result<Json<CallBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  E: Embedder,
  V: VectorStore,
  S: TheoremStore + FeedbackStore + ActivityStore,
{
  let Json(body) = body?;
  state
    .engine
    .recorder
    .call(NewCall { call_type: body.call_type, query: body.query })
    .await?;
  Ok(Json(json!({})))
}
