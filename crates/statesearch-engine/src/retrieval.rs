//! [`Retriever`]: proof state in, ranked theorems out.
//!
//! ```text
//! validate → clamp nresult → read guard → normalize → embed
//!   → nearest neighbours → fetch rows → reorder by hit → render
//! ```
//!
//! The vector store's ranking is authoritative. Rows are fetched as an
//! unordered set and put back into hit order; hits with no matching row of
//! the requested revision are dropped.

use std::{collections::HashMap, sync::Arc};

use serde::Deserialize;
use statesearch_core::{
  Revision,
  embed::{EmbedRole, Embedder, average},
  query::{NormalizedQuery, normalize},
  store::TheoremStore,
  theorem::{Theorem, TheoremId, TheoremResult},
  vector::VectorStore,
};
use tokio::time::Instant;

use crate::{
  Error, Result,
  error::{embedding, store, vector_store},
  guard::{RevisionLocks, within},
};

/// Lower bound on the number of results returned.
pub const MIN_RESULTS: i64 = 1;

/// Upper bound on the number of results returned.
pub const MAX_RESULTS: i64 = 100;

/// Clamp a requested result count into `[MIN_RESULTS, MAX_RESULTS]`.
pub fn clamp_nresult(nresult: i64) -> usize { nresult.clamp(MIN_RESULTS, MAX_RESULTS) as usize }

/// How the query vector is computed from a normalized proof state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryEmbedding {
  /// Embed context and goal separately and average, the same way corpus
  /// vectors are built.
  #[default]
  Averaged,
  /// Embed `context + goal` as a single text.
  Combined,
}

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
  /// Longest accepted raw query, in bytes.
  pub max_query_bytes: usize,
  pub query_embedding: QueryEmbedding,
}

impl Default for RetrieverConfig {
  fn default() -> Self {
    Self { max_query_bytes: 16 * 1024, query_embedding: QueryEmbedding::default() }
  }
}

/// One `SearchTheorem` call.
#[derive(Debug, Clone)]
pub struct SearchRequest {
  /// Raw proof state as shown by the proof assistant.
  pub query:    String,
  pub rev:      String,
  pub nresult:  i64,
  pub deadline: Option<Instant>,
}

pub struct Retriever<E, V, S> {
  embedder: Arc<E>,
  vectors:  Arc<V>,
  store:    Arc<S>,
  locks:    Arc<RevisionLocks>,
  config:   RetrieverConfig,
}

impl<E, V, S> Retriever<E, V, S>
where
  E: Embedder,
  V: VectorStore,
  S: TheoremStore,
{
  pub fn new(
    embedder: Arc<E>,
    vectors: Arc<V>,
    store: Arc<S>,
    locks: Arc<RevisionLocks>,
    config: RetrieverConfig,
  ) -> Self {
    Self { embedder, vectors, store, locks, config }
  }

  pub async fn search(&self, request: SearchRequest) -> Result<Vec<TheoremResult>> {
    let SearchRequest { query, rev, nresult, deadline } = request;

    if query.len() > self.config.max_query_bytes {
      return Err(Error::InvalidArgument(format!(
        "query is {} bytes, limit is {}",
        query.len(),
        self.config.max_query_bytes
      )));
    }
    let rev = Revision::parse(rev)?;
    let limit = clamp_nresult(nresult);

    let _guard = self.locks.try_read(&rev)?;

    let normalized = normalize(&query);
    let vector = within(deadline, "query embedding", self.embed_query(&normalized)).await?;

    let hits = within(deadline, "vector search", async {
      self
        .vectors
        .query(rev.as_str(), &vector, limit)
        .await
        .map_err(vector_store)
    })
    .await?
    .ok_or_else(|| Error::RevisionNotFound(rev.clone()))?;

    let ids = distinct_ids(hits.iter().map(|h| h.payload.id));
    let rows = within(deadline, "theorem lookup", async {
      self.store.theorems_by_ids(&ids).await.map_err(store)
    })
    .await?;

    let results = order_by_hits(&rev, &ids, rows);
    if results.len() < ids.len() {
      tracing::warn!(
        rev = %rev,
        unmatched = ids.len() - results.len(),
        "vector hits without a theorem row in this revision"
      );
    }
    tracing::debug!(rev = %rev, limit, hits = ids.len(), results = results.len(), "search");
    Ok(results)
  }

  async fn embed_query(&self, normalized: &NormalizedQuery) -> Result<Vec<f32>> {
    let vector = match self.config.query_embedding {
      QueryEmbedding::Averaged => {
        let context = [normalized.context.clone()];
        let goal = [normalized.goal.clone()];
        let (context, goal) = tokio::try_join!(self.embed_one(&context), self.embed_one(&goal))?;
        average(&context, &goal)?
      }
      QueryEmbedding::Combined => self.embed_one(&[normalized.text()]).await?,
    };

    let expected = self.embedder.dimension();
    if vector.len() != expected {
      return Err(Error::DimensionMismatch { expected, actual: vector.len() });
    }
    Ok(vector)
  }

  async fn embed_one(&self, text: &[String]) -> Result<Vec<f32>> {
    self
      .embedder
      .embed_batch(text, EmbedRole::Query)
      .await
      .map_err(embedding)?
      .into_iter()
      .next()
      .ok_or_else(|| Error::Embedding("embedder returned no vector".into()))
  }
}

/// Ids in first-seen order with duplicates removed.
fn distinct_ids(ids: impl Iterator<Item = TheoremId>) -> Vec<TheoremId> {
  let mut out: Vec<TheoremId> = Vec::new();
  for id in ids {
    if !out.contains(&id) {
      out.push(id);
    }
  }
  out
}

/// Put `rows` into the order of `ids`, keeping only rows of `rev`.
fn order_by_hits(rev: &Revision, ids: &[TheoremId], rows: Vec<Theorem>) -> Vec<TheoremResult> {
  let mut by_id: HashMap<TheoremId, Theorem> = rows
    .into_iter()
    .filter(|t| &t.rev == rev)
    .map(|t| (t.id, t))
    .collect();
  ids
    .iter()
    .filter_map(|id| by_id.remove(id))
    .map(TheoremResult::from)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn theorem(id: TheoremId, rev: &str) -> Theorem {
    Theorem {
      id,
      name: format!("T{id}"),
      args: vec![],
      goal: "True".into(),
      module: "M".into(),
      rev: Revision::parse(rev).unwrap(),
      formal_type: None,
    }
  }

  #[test]
  fn nresult_is_clamped() {
    assert_eq!(clamp_nresult(0), 1);
    assert_eq!(clamp_nresult(-4), 1);
    assert_eq!(clamp_nresult(10), 10);
    assert_eq!(clamp_nresult(500), 100);
  }

  #[test]
  fn duplicates_keep_first_occurrence() {
    assert_eq!(distinct_ids([4, 2, 4, 9, 2].into_iter()), vec![4, 2, 9]);
  }

  #[test]
  fn rows_follow_hit_order() {
    let rev = Revision::parse("v1").unwrap();
    let rows = vec![theorem(3, "v1"), theorem(9, "v1"), theorem(7, "v1")];
    let ordered = order_by_hits(&rev, &[7, 3, 9], rows);
    assert_eq!(ordered.iter().map(|r| r.id).collect::<Vec<_>>(), [7, 3, 9]);
  }

  #[test]
  fn rows_of_other_revisions_and_missing_ids_are_dropped() {
    let rev = Revision::parse("v2").unwrap();
    let rows = vec![theorem(1, "v1"), theorem(2, "v2")];
    let ordered = order_by_hits(&rev, &[1, 2, 3], rows);
    assert_eq!(ordered.iter().map(|r| r.id).collect::<Vec<_>>(), [2]);
  }
}
