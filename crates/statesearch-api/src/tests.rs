//! Router tests: requests go through `tower::ServiceExt::oneshot` against an
//! engine backed by in-memory SQLite and the in-memory vector store.

use std::{sync::Arc, time::Duration};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use statesearch_core::{
  Revision,
  embed::{EmbedRole, Embedder},
  store::{ActivityStore, FeedbackStore, TheoremStore},
  theorem::NewTheorem,
  vector::VectorStore,
};
use statesearch_embed::HashedEmbedder;
use statesearch_engine::{Engine, RetrieverConfig};
use statesearch_store_sqlite::SqliteStore;
use statesearch_vector::MemoryVectorStore;
use tower::ServiceExt;

use crate::{AppState, api_router};

type State = AppState<HashedEmbedder, MemoryVectorStore, SqliteStore>;

async fn make_state() -> (State, Arc<SqliteStore>) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let engine = Engine::new(
    Arc::new(HashedEmbedder::new(32).unwrap()),
    Arc::new(MemoryVectorStore::new()),
    store.clone(),
    RetrieverConfig::default(),
  );
  let state = AppState { engine: Arc::new(engine), request_timeout: Some(Duration::from_secs(5)) };
  (state, store)
}

fn rev(tag: &str) -> Revision { Revision::parse(tag).unwrap() }

async fn seed(state: &State, store: &SqliteStore, tag: &str) {
  let theorems = vec![
    NewTheorem {
      name:        "Nat.add_comm".into(),
      args:        vec!["(a b : ℕ)".into()],
      goal:        "a + b = b + a".into(),
      module:      "Init.Data.Nat.Basic".into(),
      formal_type: None,
    },
    NewTheorem {
      name:        "Nat.le_refl".into(),
      args:        vec!["(n : ℕ)".into()],
      goal:        "n ≤ n".into(),
      module:      "Init.Data.Nat.Basic".into(),
      formal_type: Some("theorem".into()),
    },
  ];
  store.insert_theorems(&rev(tag), theorems).await.unwrap();
  state.engine.indexer.index(&rev(tag)).await.unwrap();
}

async fn send<E, V, S>(
  state: AppState<E, V, S>,
  method: &str,
  uri: &str,
  body: &str,
) -> (StatusCode, Value)
where
  E: Embedder + 'static,
  V: VectorStore + 'static,
  S: TheoremStore + FeedbackStore + ActivityStore + 'static,
{
  let req = Request::builder()
    .method(method)
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap();
  let resp = api_router(state).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, value)
}

async fn post<E, V, S>(state: AppState<E, V, S>, uri: &str, body: Value) -> (StatusCode, Value)
where
  E: Embedder + 'static,
  V: VectorStore + 'static,
  S: TheoremStore + FeedbackStore + ActivityStore + 'static,
{
  send(state, "POST", uri, &body.to_string()).await
}

// ── Search ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_returns_ranked_results() {
  let (state, store) = make_state().await;
  seed(&state, &store, "v1").await;

  let (status, body) = post(
    state,
    "/search",
    json!({ "query": "a b : ℕ\n⊢ a + b = b + a", "rev": "v1", "nresult": 5 }),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  let results = body["results"].as_array().unwrap();
  assert_eq!(results.len(), 2);
  assert_eq!(results[0]["name"], "Nat.add_comm");
  assert_eq!(results[0]["code"], "theorem Nat.add_comm (a b : ℕ) : a + b = b + a");
  assert_eq!(results[0]["rev"], "v1");
  assert!(results[0].get("formal_type").is_none());
  assert_eq!(results[1]["formal_type"], "theorem");
}

#[tokio::test]
async fn search_on_unknown_revision_is_404() {
  let (state, _) = make_state().await;
  let (status, body) =
    post(state, "/search", json!({ "query": "⊢ True", "rev": "nope", "nresult": 5 })).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn search_with_empty_revision_is_400() {
  let (state, _) = make_state().await;
  let (status, _) =
    post(state, "/search", json!({ "query": "⊢ True", "rev": "", "nresult": 5 })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_400() {
  let (state, _) = make_state().await;
  let (status, body) = send(state.clone(), "POST", "/search", "{not json").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  let (status, _) = post(state, "/search", json!({ "rev": "v1" })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Embedder whose endpoint always fails.
struct Unreachable;

impl Embedder for Unreachable {
  type Error = statesearch_embed::Error;

  fn dimension(&self) -> usize { 32 }

  fn model_name(&self) -> &str { "unreachable" }

  async fn embed_batch(
    &self,
    _texts: &[String],
    _role: EmbedRole,
  ) -> statesearch_embed::Result<Vec<Vec<f32>>> {
    Err(statesearch_embed::Error::Status { status: 502, body: "upstream secret".into() })
  }
}

#[tokio::test]
async fn embedding_failure_is_500_without_detail() {
  let engine = Engine::new(
    Arc::new(Unreachable),
    Arc::new(MemoryVectorStore::new()),
    Arc::new(SqliteStore::open_in_memory().await.unwrap()),
    RetrieverConfig::default(),
  );
  let state = AppState { engine: Arc::new(engine), request_timeout: None };

  let (status, body) =
    post(state, "/search", json!({ "query": "⊢ True", "rev": "v1", "nresult": 5 })).await;

  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert!(!body["error"].as_str().unwrap().contains("upstream secret"));
}

#[tokio::test]
async fn search_during_reindex_is_503() {
  let (state, store) = make_state().await;
  seed(&state, &store, "v1").await;

  let _guard = state.engine.locks().write(&rev("v1")).await;
  let (status, _) =
    post(state.clone(), "/search", json!({ "query": "⊢ True", "rev": "v1", "nresult": 5 })).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ── Signals ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn feedback_update_flow() {
  let (state, store) = make_state().await;
  let judgment = |relevant: bool, update: bool| {
    json!({ "query": "⊢ True", "theorem_id": 1, "relevant": relevant, "rank": 0, "update": update })
  };

  let (status, _) = post(state.clone(), "/feedback", judgment(true, true)).await;
  assert_eq!(status, StatusCode::PRECONDITION_FAILED);

  let (status, body) = post(state.clone(), "/feedback", judgment(false, false)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({}));

  let (status, _) = post(state, "/feedback", judgment(true, true)).await;
  assert_eq!(status, StatusCode::OK);

  let rows = store.list_feedback().await.unwrap();
  assert_eq!(rows.len(), 1);
  assert!(rows[0].relevant);
}

#[tokio::test]
async fn clicks_and_calls_are_recorded() {
  let (state, store) = make_state().await;

  let (status, _) =
    post(state.clone(), "/click", json!({ "query": "⊢ True", "theorem_id": 3, "rank": 1 })).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = post(state, "/call", json!({ "call_type": "editor" })).await;
  assert_eq!(status, StatusCode::OK);

  assert_eq!(store.list_clicks().await.unwrap().len(), 1);
  let calls = store.list_calls().await.unwrap();
  assert_eq!(calls.len(), 1);
  assert_eq!(calls[0].query, "");
}

// ── Revisions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn revs_lists_known_revisions() {
  let (state, store) = make_state().await;
  let (status, body) = send(state.clone(), "GET", "/revs", "").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "revs": [] }));

  seed(&state, &store, "v2").await;
  seed(&state, &store, "v1").await;
  let (_, body) = send(state, "GET", "/revs", "").await;
  assert_eq!(body, json!({ "revs": ["v1", "v2"] }));
}
