//! Error type for `statesearch-embed`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("embedding endpoint returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("embedding endpoint returned {actual} vectors for {expected} inputs")]
  Count { expected: usize, actual: usize },

  #[error("embedding endpoint index {index} is duplicated, missing or outside 0..{expected}")]
  Index { index: usize, expected: usize },

  #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
  Dimension { expected: usize, actual: usize },

  #[error("invalid embedder configuration: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
