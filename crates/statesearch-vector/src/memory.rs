//! [`MemoryVectorStore`], an in-process vector store.
//!
//! Collections live in a map behind one lock; `promote` swaps a staging
//! collection in under that lock, so readers see either the old or the new
//! generation, never both.

use std::{
  collections::HashMap,
  sync::{PoisonError, RwLock},
};

use statesearch_core::{
  embed::dot,
  vector::{Point, ScoredPoint, VectorStore},
};

use crate::{Error, Result};

struct Collection {
  dimension: usize,
  points:    Vec<Point>,
}

#[derive(Default)]
pub struct MemoryVectorStore {
  collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
  pub fn new() -> Self { Self::default() }

  /// Snapshot of every point in `collection`, in upload order.
  pub fn points(&self, collection: &str) -> Option<Vec<Point>> {
    let map = self.collections.read().unwrap_or_else(PoisonError::into_inner);
    map.get(collection).map(|c| c.points.clone())
  }

  /// Names of all collections, sorted.
  pub fn collection_names(&self) -> Vec<String> {
    let map = self.collections.read().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<String> = map.keys().cloned().collect();
    names.sort();
    names
  }
}

impl VectorStore for MemoryVectorStore {
  type Error = Error;

  async fn delete_collection(&self, collection: &str) -> Result<()> {
    let mut map = self.collections.write().unwrap_or_else(PoisonError::into_inner);
    map.remove(collection);
    Ok(())
  }

  async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()> {
    let mut map = self.collections.write().unwrap_or_else(PoisonError::into_inner);
    if map.contains_key(collection) {
      return Err(Error::CollectionExists(collection.to_owned()));
    }
    map.insert(collection.to_owned(), Collection { dimension, points: Vec::new() });
    Ok(())
  }

  async fn upload_points(&self, collection: &str, points: Vec<Point>) -> Result<()> {
    let mut map = self.collections.write().unwrap_or_else(PoisonError::into_inner);
    let target = map
      .get_mut(collection)
      .ok_or_else(|| Error::CollectionNotFound(collection.to_owned()))?;

    if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimension) {
      return Err(Error::Dimension { expected: target.dimension, actual: bad.vector.len() });
    }

    // Uploading an existing id replaces the point, as Qdrant's upsert does.
    for point in points {
      match target.points.iter_mut().find(|p| p.id == point.id) {
        Some(existing) => *existing = point,
        None => target.points.push(point),
      }
    }
    Ok(())
  }

  async fn query(
    &self,
    collection: &str,
    vector: &[f32],
    limit: usize,
  ) -> Result<Option<Vec<ScoredPoint>>> {
    let map = self.collections.read().unwrap_or_else(PoisonError::into_inner);
    let Some(target) = map.get(collection) else {
      return Ok(None);
    };
    if vector.len() != target.dimension {
      return Err(Error::Dimension { expected: target.dimension, actual: vector.len() });
    }

    let mut hits: Vec<ScoredPoint> = target
      .points
      .iter()
      .map(|p| ScoredPoint { id: p.id, score: dot(&p.vector, vector), payload: p.payload })
      .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
    hits.truncate(limit);
    Ok(Some(hits))
  }

  async fn promote(&self, staging: &str, target: &str) -> Result<()> {
    let mut map = self.collections.write().unwrap_or_else(PoisonError::into_inner);
    let built = map
      .remove(staging)
      .ok_or_else(|| Error::CollectionNotFound(staging.to_owned()))?;
    map.insert(target.to_owned(), built);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use statesearch_core::vector::Payload;

  use super::*;

  fn point(id: u64, theorem_id: i64, vector: Vec<f32>) -> Point {
    Point { id, vector, payload: Payload { id: theorem_id } }
  }

  #[tokio::test]
  async fn query_ranks_by_dot_product() {
    let store = MemoryVectorStore::new();
    store.create_collection("v1", 2).await.unwrap();
    store
      .upload_points("v1", vec![
        point(0, 10, vec![1.0, 0.0]),
        point(1, 11, vec![0.0, 1.0]),
        point(2, 12, vec![0.6, 0.8]),
      ])
      .await
      .unwrap();

    let hits = store.query("v1", &[0.0, 1.0], 2).await.unwrap().unwrap();

    assert_eq!(hits.iter().map(|h| h.payload.id).collect::<Vec<_>>(), [11, 12]);
    assert!(hits[0].score >= hits[1].score);
  }

  #[tokio::test]
  async fn missing_collection_queries_as_none() {
    let store = MemoryVectorStore::new();
    assert!(store.query("nope", &[1.0], 5).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn upload_checks_dimension() {
    let store = MemoryVectorStore::new();
    store.create_collection("v1", 3).await.unwrap();
    let err = store
      .upload_points("v1", vec![point(0, 1, vec![1.0])])
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Dimension { expected: 3, actual: 1 }));
  }

  #[tokio::test]
  async fn create_twice_is_an_error_and_delete_is_idempotent() {
    let store = MemoryVectorStore::new();
    store.create_collection("v1", 3).await.unwrap();
    assert!(matches!(
      store.create_collection("v1", 3).await,
      Err(Error::CollectionExists(_))
    ));
    store.delete_collection("v1").await.unwrap();
    store.delete_collection("v1").await.unwrap();
    assert!(store.collection_names().is_empty());
  }

  #[tokio::test]
  async fn promote_replaces_the_target_generation() {
    let store = MemoryVectorStore::new();
    store.create_collection("v1", 1).await.unwrap();
    store.upload_points("v1", vec![point(0, 1, vec![1.0])]).await.unwrap();

    store.create_collection("v1__next", 1).await.unwrap();
    store.upload_points("v1__next", vec![point(0, 2, vec![1.0])]).await.unwrap();
    store.promote("v1__next", "v1").await.unwrap();

    assert_eq!(store.collection_names(), vec!["v1".to_string()]);
    let points = store.points("v1").unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].payload.id, 2);
  }
}
