//! [`HttpEmbedder`]: client for an OpenAI-compatible embeddings endpoint.
//!
//! Request:  `POST <url>` with `{"model": "...", "input": ["...", ...]}`.
//! Response: `{"data": [{"index": 0, "embedding": [...]}, ...]}`.
//!
//! Inputs are sent in chunks of `batch_size`. Returned vectors are re-ordered
//! by `index`, checked against the configured dimension, and L2-normalised.

use std::{borrow::Cow, time::Duration};

use serde::{Deserialize, Serialize};
use statesearch_core::embed::{EmbedRole, Embedder, l2_normalize};

use crate::{Error, Result};

fn default_batch_size() -> usize { 256 }

fn default_timeout_secs() -> u64 { 60 }

/// Connection and model settings for [`HttpEmbedder`].
#[derive(Debug, Clone, Deserialize)]
pub struct HttpEmbedderConfig {
  /// Full URL of the embeddings endpoint.
  pub url:               String,
  pub model:             String,
  /// Output dimension of `model`; every returned vector is checked against it.
  pub dimension:         usize,
  #[serde(default = "default_batch_size")]
  pub batch_size:        usize,
  /// Prepended to every text embedded with [`EmbedRole::Query`].
  #[serde(default)]
  pub query_instruction: Option<String>,
  /// Sent as a bearer token when present.
  #[serde(default)]
  pub api_key:           Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:      u64,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
  #[serde(default)]
  index:     Option<usize>,
  embedding: Vec<f32>,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpEmbedder {
  client: reqwest::Client,
  config: HttpEmbedderConfig,
}

impl HttpEmbedder {
  pub fn new(config: HttpEmbedderConfig) -> Result<Self> {
    if config.dimension == 0 {
      return Err(Error::Config("dimension must be positive".into()));
    }
    if config.batch_size == 0 {
      return Err(Error::Config("batch_size must be positive".into()));
    }
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  async fn embed_chunk(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>> {
    let mut request = self.client.post(&self.config.url).json(&EmbeddingRequest {
      model: &self.config.model,
      input: chunk,
    });
    if let Some(key) = &self.config.api_key {
      request = request.bearer_auth(key);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::Status { status: status.as_u16(), body });
    }

    let parsed: EmbeddingResponse = response.json().await?;
    collect_vectors(parsed, chunk.len(), self.config.dimension)
  }
}

/// Validate, order and normalise one response.
fn collect_vectors(
  response: EmbeddingResponse,
  expected: usize,
  dimension: usize,
) -> Result<Vec<Vec<f32>>> {
  if response.data.len() != expected {
    return Err(Error::Count { expected, actual: response.data.len() });
  }

  let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
  for (position, datum) in response.data.into_iter().enumerate() {
    let index = datum.index.unwrap_or(position);
    if datum.embedding.len() != dimension {
      return Err(Error::Dimension { expected: dimension, actual: datum.embedding.len() });
    }
    match slots.get_mut(index) {
      Some(slot) if slot.is_none() => *slot = Some(datum.embedding),
      _ => return Err(Error::Index { index, expected }),
    }
  }

  slots
    .into_iter()
    .enumerate()
    .map(|(index, slot)| {
      let mut v = slot.ok_or(Error::Index { index, expected })?;
      l2_normalize(&mut v);
      Ok(v)
    })
    .collect()
}

impl Embedder for HttpEmbedder {
  type Error = Error;

  fn dimension(&self) -> usize { self.config.dimension }

  fn model_name(&self) -> &str { &self.config.model }

  async fn embed_batch(&self, texts: &[String], role: EmbedRole) -> Result<Vec<Vec<f32>>> {
    let inputs: Cow<'_, [String]> = match (&self.config.query_instruction, role) {
      (Some(instruction), EmbedRole::Query) => {
        Cow::Owned(texts.iter().map(|t| format!("{instruction}{t}")).collect())
      }
      _ => Cow::Borrowed(texts),
    };

    let mut vectors = Vec::with_capacity(inputs.len());
    for chunk in inputs.chunks(self.config.batch_size) {
      tracing::debug!(model = %self.config.model, batch = chunk.len(), ?role, "embedding batch");
      vectors.extend(self.embed_chunk(chunk).await?);
    }
    Ok(vectors)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{Json, Router, extract::State, routing::post};
  use serde_json::{Value, json};
  use tokio::net::TcpListener;

  use super::*;

  fn config(url: String, dimension: usize, batch_size: usize) -> HttpEmbedderConfig {
    HttpEmbedderConfig {
      url,
      model: "test-model".into(),
      dimension,
      batch_size,
      query_instruction: None,
      api_key: None,
      timeout_secs: 5,
    }
  }

  /// Serve a fake endpoint that embeds each input as `[len, 1, 0]`, returns
  /// the data in reverse order, and records every request body.
  async fn fake_endpoint() -> (String, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));

    async fn handler(
      State(seen): State<Arc<Mutex<Vec<Value>>>>,
      Json(body): Json<Value>,
    ) -> Json<Value> {
      seen.lock().unwrap().push(body.clone());
      let inputs = body["input"].as_array().cloned().unwrap_or_default();
      let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| {
          let len = text.as_str().unwrap_or_default().chars().count() as f32;
          json!({ "index": i, "embedding": [len, 1.0, 0.0] })
        })
        .collect();
      Json(json!({ "data": data }))
    }

    let app = Router::new().route("/v1/embeddings", post(handler)).with_state(seen.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}/v1/embeddings"), seen)
  }

  #[tokio::test]
  async fn batches_are_chunked_ordered_and_normalised() {
    let (url, seen) = fake_endpoint().await;
    let embedder = HttpEmbedder::new(config(url, 3, 2)).unwrap();
    let texts: Vec<String> = ["a", "bbb", "cc"].iter().map(|s| s.to_string()).collect();

    let out = embedder.embed_batch(&texts, EmbedRole::Corpus).await.unwrap();

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(out.len(), 3);
    // [3, 1, 0] normalised: the second input is the longest.
    let norm = (10.0_f32).sqrt();
    assert!((out[1][0] - 3.0 / norm).abs() < 1e-6);
    assert!((out[0][0] - 1.0 / (2.0_f32).sqrt()).abs() < 1e-6);
  }

  #[tokio::test]
  async fn query_instruction_applies_to_queries_only() {
    let (url, seen) = fake_endpoint().await;
    let mut cfg = config(url, 3, 8);
    cfg.query_instruction = Some("Represent this proof state: ".into());
    let embedder = HttpEmbedder::new(cfg).unwrap();
    let texts = vec!["<GOAL>True".to_string()];

    embedder.embed_batch(&texts, EmbedRole::Query).await.unwrap();
    embedder.embed_batch(&texts, EmbedRole::Corpus).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0]["input"][0], "Represent this proof state: <GOAL>True");
    assert_eq!(seen[1]["input"][0], "<GOAL>True");
    assert_eq!(seen[0]["model"], "test-model");
  }

  #[tokio::test]
  async fn dimension_mismatch_is_an_error() {
    let (url, _) = fake_endpoint().await;
    let embedder = HttpEmbedder::new(config(url, 4, 8)).unwrap();
    let texts = vec!["x".to_string()];

    let err = embedder.embed_batch(&texts, EmbedRole::Corpus).await.unwrap_err();
    assert!(matches!(err, Error::Dimension { expected: 4, actual: 3 }));
  }

  #[tokio::test]
  async fn non_success_status_is_surfaced() {
    let app = Router::new().route(
      "/v1/embeddings",
      post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "model loading") }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let embedder =
      HttpEmbedder::new(config(format!("http://{addr}/v1/embeddings"), 3, 8)).unwrap();
    let err = embedder
      .embed_batch(&["x".to_string()], EmbedRole::Query)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, .. }));
  }

  #[tokio::test]
  async fn empty_input_makes_no_request() {
    let (url, seen) = fake_endpoint().await;
    let embedder = HttpEmbedder::new(config(url, 3, 8)).unwrap();

    let out = embedder.embed_batch(&[], EmbedRole::Corpus).await.unwrap();
    assert!(out.is_empty());
    assert!(seen.lock().unwrap().is_empty());
  }

  #[test]
  fn missing_or_duplicate_indices_are_rejected() {
    let response = EmbeddingResponse {
      data: vec![
        EmbeddingDatum { index: Some(0), embedding: vec![1.0] },
        EmbeddingDatum { index: Some(0), embedding: vec![1.0] },
      ],
    };
    assert!(matches!(
      collect_vectors(response, 2, 1),
      Err(Error::Index { index: 0, expected: 2 })
    ));

    let out_of_range = EmbeddingResponse {
      data: vec![EmbeddingDatum { index: Some(5), embedding: vec![1.0] }],
    };
    assert!(matches!(
      collect_vectors(out_of_range, 1, 1),
      Err(Error::Index { index: 5, expected: 1 })
    ));

    let short = EmbeddingResponse { data: vec![] };
    assert!(matches!(
      collect_vectors(short, 1, 1),
      Err(Error::Count { expected: 1, actual: 0 })
    ));
  }
}
