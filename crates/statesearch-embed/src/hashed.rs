//! [`HashedEmbedder`], a deterministic bag-of-tokens embedder.
//!
//! Every token is hashed with SHA-256; the digest picks a bucket and a sign,
//! and the bucket counts form the vector. Texts that share tokens therefore
//! score higher under dot product than texts that do not, which is all the
//! retrieval pipeline's tests and local development need.

use sha2::{Digest, Sha256};
use statesearch_core::embed::{EmbedRole, Embedder, l2_normalize};

use crate::{Error, Result};

pub struct HashedEmbedder {
  dimension: usize,
  model:     String,
}

impl HashedEmbedder {
  pub fn new(dimension: usize) -> Result<Self> {
    if dimension == 0 {
      return Err(Error::Config("dimension must be positive".into()));
    }
    Ok(Self { dimension, model: format!("hashed-{dimension}") })
  }

  /// Embed one text. The role does not influence the result.
  pub fn embed_one(&self, text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; self.dimension];

    for token in tokens(text) {
      let digest = Sha256::digest(token.as_bytes());
      let mut head = [0_u8; 8];
      head.copy_from_slice(&digest[..8]);
      let bucket = (u64::from_le_bytes(head) % self.dimension as u64) as usize;
      let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
      vector[bucket] += sign;
    }

    l2_normalize(&mut vector);
    vector
  }
}

/// Split on whitespace and on the bracket characters that delimit binders and
/// the `<VAR>` / `<GOAL>` markers.
fn tokens(text: &str) -> impl Iterator<Item = &str> {
  text
    .split(|c: char| {
      c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | ',')
    })
    .filter(|t| !t.is_empty())
}

impl Embedder for HashedEmbedder {
  type Error = Error;

  fn dimension(&self) -> usize { self.dimension }

  fn model_name(&self) -> &str { &self.model }

  async fn embed_batch(&self, texts: &[String], _role: EmbedRole) -> Result<Vec<Vec<f32>>> {
    Ok(texts.iter().map(|t| self.embed_one(t)).collect())
  }
}
