//! The `Embedder` trait, the contract the core needs from an embedding model,
//! plus the small amount of vector arithmetic shared by indexing and search.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which side of the retrieval task a text belongs to.
///
/// Models with a retrieval instruction apply it to queries only; corpus texts
/// are embedded as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedRole {
  Query,
  Corpus,
}

/// Abstraction over an embedding model.
///
/// Implementations must be deterministic for identical text, role and model,
/// must return exactly one vector per input text in input order, every vector
/// of length [`Embedder::dimension`], L2-normalised so that dot product
/// behaves as cosine similarity. Failures are returned, never retried.
pub trait Embedder: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Output dimensionality of the deployed model.
  fn dimension(&self) -> usize;

  /// Identifier of the deployed model, for logs.
  fn model_name(&self) -> &str;

  /// Embed `texts` in one logical batch.
  fn embed_batch<'a>(
    &'a self,
    texts: &'a [String],
    role: EmbedRole,
  ) -> impl Future<Output = Result<Vec<Vec<f32>>, Self::Error>> + Send + 'a;
}

// ─── Vector arithmetic ───────────────────────────────────────────────────────

/// Scale `v` to unit length in place. The zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
  let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
  if norm > 0.0 {
    v.iter_mut().for_each(|x| *x /= norm);
  }
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
  a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Element-wise mean of two vectors.
///
/// This is how a theorem's context and goal embeddings are combined into the
/// single vector stored in the index. The result is not re-normalised.
pub fn average(a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
  if a.len() != b.len() {
    return Err(Error::DimensionMismatch { expected: a.len(), actual: b.len() });
  }
  Ok(a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect())
}
