//! The `VectorStore` trait and the point types exchanged with it.
//!
//! Collections are named after revisions. Each point carries, in its payload,
//! the relational id of the theorem it was computed from; that id is the only
//! link between the two stores.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::theorem::TheoremId;

/// Data stored next to a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
  /// Relational id of the theorem this vector was computed from.
  pub id: TheoremId,
}

/// A vector to be uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
  /// Position of the theorem in the indexing batch.
  pub id:      u64,
  pub vector:  Vec<f32>,
  pub payload: Payload,
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
  pub id:      u64,
  pub score:   f32,
  pub payload: Payload,
}

/// Abstraction over a nearest-neighbour index with named collections.
///
/// All collections use dot-product similarity.
pub trait VectorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Delete `collection` if it exists. Deleting a missing collection is not
  /// an error.
  fn delete_collection<'a>(
    &'a self,
    collection: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Create an empty collection for vectors of `dimension` floats.
  fn create_collection<'a>(
    &'a self,
    collection: &'a str,
    dimension: usize,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Bulk-upload `points` into an existing collection.
  fn upload_points<'a>(
    &'a self,
    collection: &'a str,
    points: Vec<Point>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Return up to `limit` points with the highest dot product against
  /// `vector`, best first. Returns `None` if the collection does not exist.
  fn query<'a>(
    &'a self,
    collection: &'a str,
    vector: &'a [f32],
    limit: usize,
  ) -> impl Future<Output = Result<Option<Vec<ScoredPoint>>, Self::Error>> + Send + 'a;

  /// Make the fully-built `staging` collection serve under the name
  /// `target`, replacing whatever `target` served before.
  ///
  /// After this returns, queries against `target` see exactly the contents
  /// of `staging`; there is no moment at which `target` answers with a
  /// mixture of both generations. An `Err` means `target` still serves the
  /// previous generation and `staging` may be discarded.
  fn promote<'a>(
    &'a self,
    staging: &'a str,
    target: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
