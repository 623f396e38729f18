//! Error types for `statesearch-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("revision tag must not be empty")]
  EmptyRevision,

  #[error("revision tag {0:?} contains characters outside [A-Za-z0-9._-]")]
  InvalidRevision(String),

  #[error("revision tag is longer than {max} bytes")]
  RevisionTooLong { max: usize },

  #[error("vector dimension mismatch: expected {expected}, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
