//! Error type for `statesearch-vector`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("vector store returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("collection not found: {0}")]
  CollectionNotFound(String),

  #[error("collection already exists: {0}")]
  CollectionExists(String),

  #[error("vector dimension mismatch: expected {expected}, got {actual}")]
  Dimension { expected: usize, actual: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
