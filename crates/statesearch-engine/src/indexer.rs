//! [`CorpusIndexer`] builds a revision's vector collection from its
//! theorem rows.
//!
//! Each theorem contributes one point: the average of the embeddings of its
//! context text and its goal text, with the point id set to the theorem's
//! position in the batch and the relational id carried in the payload.
//!
//! A run builds into a fresh staging collection and promotes it onto the
//! revision name only once every point is uploaded. If anything fails the
//! staging collection is dropped and the previous generation keeps serving.

use std::sync::Arc;

use statesearch_core::{
  Revision,
  embed::{EmbedRole, Embedder, average},
  query::{context_text, goal_text},
  store::TheoremStore,
  vector::{Payload, Point, VectorStore},
};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::{embedding, store, vector_store},
  guard::RevisionLocks,
};

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
  pub rev:       Revision,
  pub theorems:  usize,
  pub dimension: usize,
}

pub struct CorpusIndexer<E, V, S> {
  embedder: Arc<E>,
  vectors:  Arc<V>,
  store:    Arc<S>,
  locks:    Arc<RevisionLocks>,
}

impl<E, V, S> CorpusIndexer<E, V, S>
where
  E: Embedder,
  V: VectorStore,
  S: TheoremStore,
{
  pub fn new(embedder: Arc<E>, vectors: Arc<V>, store: Arc<S>, locks: Arc<RevisionLocks>) -> Self {
    Self { embedder, vectors, store, locks }
  }

  /// Rebuild the collection for `rev`. Searches on `rev` are refused with
  /// [`Error::RevisionBusy`] until this returns.
  pub async fn index(&self, rev: &Revision) -> Result<IndexReport> {
    let _guard = self.locks.write(rev).await;

    let theorems = self.store.theorems_in_revision(rev).await.map_err(store)?;
    let dimension = self.embedder.dimension();
    tracing::info!(
      rev = %rev,
      theorems = theorems.len(),
      model = self.embedder.model_name(),
      "indexing revision"
    );

    let contexts: Vec<String> = theorems.iter().map(|t| context_text(&t.args)).collect();
    let goals: Vec<String> = theorems.iter().map(|t| goal_text(&t.goal)).collect();
    let (contexts, goals) =
      tokio::try_join!(self.embed_corpus(&contexts), self.embed_corpus(&goals))?;

    let mut points = Vec::with_capacity(theorems.len());
    for (position, ((theorem, context), goal)) in
      theorems.iter().zip(contexts).zip(goals).enumerate()
    {
      for half in [&context, &goal] {
        if half.len() != dimension {
          return Err(Error::DimensionMismatch { expected: dimension, actual: half.len() });
        }
      }
      points.push(Point {
        id:      position as u64,
        vector:  average(&context, &goal)?,
        payload: Payload { id: theorem.id },
      });
    }

    let staging = format!("{rev}__{}", Uuid::new_v4().simple());
    if let Err(err) = self.build(&staging, rev, dimension, points).await {
      if let Err(cleanup) = self.vectors.delete_collection(&staging).await {
        tracing::warn!(collection = %staging, error = %cleanup, "failed to drop staging collection");
      }
      return Err(err);
    }

    let report = IndexReport { rev: rev.clone(), theorems: theorems.len(), dimension };
    tracing::info!(rev = %rev, theorems = report.theorems, dimension, "revision indexed");
    Ok(report)
  }

  /// Index every revision known to the relational store, in order. Stops at
  /// the first failure.
  pub async fn index_all(&self) -> Result<Vec<IndexReport>> {
    let revisions = self.store.revisions().await.map_err(store)?;
    let mut reports = Vec::with_capacity(revisions.len());
    for rev in &revisions {
      reports.push(self.index(rev).await?);
    }
    Ok(reports)
  }

  async fn embed_corpus(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let vectors = self
      .embedder
      .embed_batch(texts, EmbedRole::Corpus)
      .await
      .map_err(embedding)?;
    if vectors.len() != texts.len() {
      return Err(Error::Embedding(
        format!("expected {} vectors, embedder returned {}", texts.len(), vectors.len()).into(),
      ));
    }
    Ok(vectors)
  }

  async fn build(
    &self,
    staging: &str,
    rev: &Revision,
    dimension: usize,
    points: Vec<Point>,
  ) -> Result<()> {
    self
      .vectors
      .create_collection(staging, dimension)
      .await
      .map_err(vector_store)?;
    self.vectors.upload_points(staging, points).await.map_err(vector_store)?;
    self.vectors.promote(staging, rev.as_str()).await.map_err(vector_store)
  }
}
