//! Search, indexing and signal recording for statesearch.
//!
//! The engine is generic over its three collaborators: an
//! [`Embedder`](statesearch_core::embed::Embedder), a
//! [`VectorStore`](statesearch_core::vector::VectorStore) and a relational
//! store implementing the repository traits of [`statesearch_core::store`].
//! Callers construct them and hand them in; [`Engine::new`] wires the
//! components together around one shared [`RevisionLocks`].

mod guard;
mod indexer;
mod recorder;
mod retrieval;

pub mod error;

use std::sync::Arc;

pub use error::{Error, Result};
pub use guard::{ReadGuard, RevisionGuard, RevisionLocks, WriteGuard};
pub use indexer::{CorpusIndexer, IndexReport};
pub use recorder::{Recorder, RevisionRegistry};
pub use retrieval::{
  MAX_RESULTS, MIN_RESULTS, QueryEmbedding, Retriever, RetrieverConfig, SearchRequest,
  clamp_nresult,
};
use statesearch_core::{
  embed::Embedder,
  store::{ActivityStore, FeedbackStore, TheoremStore},
  vector::VectorStore,
};

/// All engine components over one set of collaborators.
pub struct Engine<E, V, S> {
  pub retriever: Retriever<E, V, S>,
  pub indexer:   CorpusIndexer<E, V, S>,
  pub registry:  RevisionRegistry<S>,
  pub recorder:  Recorder<S>,
  locks:         Arc<RevisionLocks>,
}

impl<E, V, S> Engine<E, V, S>
where
  E: Embedder,
  V: VectorStore,
  S: TheoremStore + FeedbackStore + ActivityStore,
{
  pub fn new(embedder: Arc<E>, vectors: Arc<V>, store: Arc<S>, config: RetrieverConfig) -> Self {
    let locks = Arc::new(RevisionLocks::new());
    Self {
      retriever: Retriever::new(
        embedder.clone(),
        vectors.clone(),
        store.clone(),
        locks.clone(),
        config,
      ),
      indexer: CorpusIndexer::new(embedder, vectors, store.clone(), locks.clone()),
      registry: RevisionRegistry::new(store.clone()),
      recorder: Recorder::new(store),
      locks,
    }
  }

  /// The guard registry shared by the retriever and the indexer.
  pub fn locks(&self) -> &Arc<RevisionLocks> { &self.locks }
}
