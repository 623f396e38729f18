//! Feedback, click and call recording, plus the revision registry.

use std::sync::Arc;

use statesearch_core::{
  Revision,
  signal::{Call, Click, Feedback, NewCall, NewClick, NewFeedback},
  store::{ActivityStore, FeedbackStore, TheoremStore},
};

use crate::{Error, Result, error::store};

pub struct Recorder<S> {
  store: Arc<S>,
}

impl<S> Recorder<S>
where
  S: FeedbackStore + ActivityStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Record a relevance judgment.
  ///
  /// With `update`, the most recent row for `(query, theorem_id)` is
  /// overwritten and [`Error::FeedbackNotFound`] is returned if there is
  /// none. Without it a new row is always appended.
  pub async fn feedback(&self, input: NewFeedback, update: bool) -> Result<Feedback> {
    if !update {
      return self.store.record_feedback(input).await.map_err(store);
    }

    let (query, theorem_id) = (input.query.clone(), input.theorem_id);
    match self.store.update_latest_feedback(input).await.map_err(store)? {
      Some(row) => Ok(row),
      None => {
        tracing::debug!(theorem_id, "feedback update without a prior row");
        Err(Error::FeedbackNotFound { query, theorem_id })
      }
    }
  }

  pub async fn click(&self, input: NewClick) -> Result<Click> {
    self.store.record_click(input).await.map_err(store)
  }

  pub async fn call(&self, input: NewCall) -> Result<Call> {
    self.store.record_call(input).await.map_err(store)
  }
}

/// Lists the revisions that can be searched.
pub struct RevisionRegistry<S> {
  store: Arc<S>,
}

impl<S: TheoremStore> RevisionRegistry<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Distinct revision tags among theorem rows, ascending.
  pub async fn all_revisions(&self) -> Result<Vec<Revision>> {
    self.store.revisions().await.map_err(store)
  }
}
