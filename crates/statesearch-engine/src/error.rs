//! Error type for `statesearch-engine`.
//!
//! Collaborator failures are boxed so the engine stays generic over its
//! embedder, vector store and relational store.

use statesearch_core::{Revision, theorem::TheoremId};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("revision not found: {0}")]
  RevisionNotFound(Revision),

  #[error("revision {0} is being reindexed")]
  RevisionBusy(Revision),

  #[error("deadline exceeded during {0}")]
  Timeout(&'static str),

  #[error("no feedback recorded for query {query:?} and theorem {theorem_id}")]
  FeedbackNotFound { query: String, theorem_id: TheoremId },

  #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("embedding error: {0}")]
  Embedding(#[source] BoxError),

  #[error("vector store error: {0}")]
  VectorStore(#[source] BoxError),

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl From<statesearch_core::Error> for Error {
  fn from(err: statesearch_core::Error) -> Self {
    match err {
      statesearch_core::Error::DimensionMismatch { expected, actual } => {
        Error::DimensionMismatch { expected, actual }
      }
      other => Error::InvalidArgument(other.to_string()),
    }
  }
}

pub(crate) fn embedding<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
  Error::Embedding(Box::new(err))
}

pub(crate) fn vector_store<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
  Error::VectorStore(Box::new(err))
}

pub(crate) fn store<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
  Error::Store(Box::new(err))
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
