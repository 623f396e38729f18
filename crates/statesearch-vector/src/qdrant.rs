//! [`QdrantStore`]: async client for Qdrant's REST API.
//!
//! A revision is never a physical collection. Each build lands in its own
//! staging collection, and the revision name is a Qdrant alias pointing at
//! the live one. `promote` re-points the alias in a single
//! `POST /collections/aliases` call, which Qdrant applies atomically, and then
//! drops the collection the alias used to point at.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use statesearch_core::vector::{Point, ScoredPoint, VectorStore};

use crate::{Error, Result};

fn default_upload_batch_size() -> usize { 512 }

fn default_timeout_secs() -> u64 { 60 }

/// Connection settings for [`QdrantStore`].
#[derive(Debug, Clone, Deserialize)]
pub struct QdrantConfig {
  /// Base URL, e.g. `http://localhost:6333`.
  pub url:               String,
  #[serde(default)]
  pub api_key:           Option<String>,
  /// Points sent per upsert request.
  #[serde(default = "default_upload_batch_size")]
  pub upload_batch_size: usize,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:      u64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
  result: T,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
  points: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct AliasList {
  aliases: Vec<AliasDescription>,
}

#[derive(Debug, Clone, Deserialize)]
struct AliasDescription {
  alias_name:      String,
  collection_name: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
  points: &'a [Point],
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct QdrantStore {
  client: Client,
  config: QdrantConfig,
}

impl QdrantStore {
  pub fn new(config: QdrantConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.config.api_key {
      Some(key) => req.header("api-key", key),
      None => req,
    }
  }

  /// The collection `alias` currently points at, if it is an alias.
  async fn resolve_alias(&self, alias: &str) -> Result<Option<String>> {
    let resp = self.auth(self.client.get(self.url("/aliases"))).send().await?;
    let list: Envelope<AliasList> = ok(resp).await?.json().await?;
    Ok(
      list
        .result
        .aliases
        .into_iter()
        .find(|a| a.alias_name == alias)
        .map(|a| a.collection_name),
    )
  }

  /// `DELETE /collections/{name}`; a missing collection is not an error.
  async fn drop_physical(&self, name: &str) -> Result<()> {
    let resp = self
      .auth(self.client.delete(self.url(&format!("/collections/{name}"))))
      .send()
      .await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(());
    }
    ok(resp).await?;
    Ok(())
  }
}

/// Turn a non-2xx response into [`Error::Status`].
async fn ok(resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(Error::Status { status: status.as_u16(), body })
}

impl VectorStore for QdrantStore {
  type Error = Error;

  async fn delete_collection(&self, collection: &str) -> Result<()> {
    match self.resolve_alias(collection).await? {
      Some(backing) => {
        let actions = json!({ "actions": [{ "delete_alias": { "alias_name": collection } }] });
        let resp = self
          .auth(self.client.post(self.url("/collections/aliases")))
          .json(&actions)
          .send()
          .await?;
        ok(resp).await?;
        self.drop_physical(&backing).await
      }
      None => self.drop_physical(collection).await,
    }
  }

  async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()> {
    let body = json!({ "vectors": { "size": dimension, "distance": "Dot" } });
    let resp = self
      .auth(self.client.put(self.url(&format!("/collections/{collection}"))))
      .json(&body)
      .send()
      .await?;
    if resp.status() == StatusCode::CONFLICT {
      return Err(Error::CollectionExists(collection.to_owned()));
    }
    ok(resp).await?;
    tracing::debug!(collection, dimension, "created collection");
    Ok(())
  }

  async fn upload_points(&self, collection: &str, points: Vec<Point>) -> Result<()> {
    let path = format!("/collections/{collection}/points");
    for chunk in points.chunks(self.config.upload_batch_size.max(1)) {
      let resp = self
        .auth(self.client.put(self.url(&path)))
        .query(&[("wait", "true")])
        .json(&UpsertRequest { points: chunk })
        .send()
        .await?;
      if resp.status() == StatusCode::NOT_FOUND {
        return Err(Error::CollectionNotFound(collection.to_owned()));
      }
      ok(resp).await?;
      tracing::debug!(collection, batch = chunk.len(), "uploaded points");
    }
    Ok(())
  }

  async fn query(
    &self,
    collection: &str,
    vector: &[f32],
    limit: usize,
  ) -> Result<Option<Vec<ScoredPoint>>> {
    let body = json!({ "query": vector, "limit": limit, "with_payload": true });
    let resp = self
      .auth(self.client.post(self.url(&format!("/collections/{collection}/points/query"))))
      .json(&body)
      .send()
      .await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let parsed: Envelope<QueryResult> = ok(resp).await?.json().await?;
    Ok(Some(parsed.result.points))
  }

  async fn promote(&self, staging: &str, target: &str) -> Result<()> {
    let previous = self.resolve_alias(target).await?;

    let mut actions = Vec::new();
    match &previous {
      Some(_) => actions.push(json!({ "delete_alias": { "alias_name": target } })),
      // A collection created before aliases were used occupies the name.
      None => self.drop_physical(target).await?,
    }
    actions.push(json!({
      "create_alias": { "collection_name": staging, "alias_name": target }
    }));

    let resp = self
      .auth(self.client.post(self.url("/collections/aliases")))
      .json(&json!({ "actions": actions }))
      .send()
      .await?;
    ok(resp).await?;

    tracing::info!(alias = target, staging, "alias switched");
    // The switch is committed; from here on `staging` is live.
    if let Some(old) = previous.filter(|old| old != staging) {
      if let Err(err) = self.drop_physical(&old).await {
        tracing::warn!(collection = %old, error = %err, "failed to drop previous generation");
      }
    }
    Ok(())
  }
}
