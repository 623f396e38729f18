//! Repository traits for the relational store.
//!
//! One trait per owner: theorem rows are written by ingest and read by the
//! retrieval engine and indexer; feedback, clicks and calls are written by
//! the recorder. Backends (e.g. `statesearch-store-sqlite`) implement all of
//! them; higher layers depend only on the traits they need.

use std::future::Future;

use crate::{
  revision::Revision,
  signal::{Call, Click, Feedback, NewCall, NewClick, NewFeedback},
  theorem::{NewTheorem, Theorem, TheoremId},
};

// ─── Theorems ────────────────────────────────────────────────────────────────

pub trait TheoremStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert `theorems` under `rev` in one transaction and return the stored
  /// rows, in input order, with their assigned ids.
  fn insert_theorems<'a>(
    &'a self,
    rev: &'a Revision,
    theorems: Vec<NewTheorem>,
  ) -> impl Future<Output = Result<Vec<Theorem>, Self::Error>> + Send + 'a;

  /// All theorems of `rev`, ordered by id.
  fn theorems_in_revision<'a>(
    &'a self,
    rev: &'a Revision,
  ) -> impl Future<Output = Result<Vec<Theorem>, Self::Error>> + Send + 'a;

  /// Theorems whose id is in `ids`. The order of the returned rows is
  /// unspecified and ids with no row are silently absent.
  fn theorems_by_ids<'a>(
    &'a self,
    ids: &'a [TheoremId],
  ) -> impl Future<Output = Result<Vec<Theorem>, Self::Error>> + Send + 'a;

  /// Replace every theorem of `rev` with `theorems` in one transaction.
  /// Returns the number of rows removed and the stored rows, in input order.
  /// On failure the revision keeps its previous rows.
  fn replace_revision<'a>(
    &'a self,
    rev: &'a Revision,
    theorems: Vec<NewTheorem>,
  ) -> impl Future<Output = Result<(usize, Vec<Theorem>), Self::Error>> + Send + 'a;

  /// Delete every theorem of `rev`; returns the number of rows removed.
  fn delete_revision<'a>(
    &'a self,
    rev: &'a Revision,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Distinct revision tags present among theorem rows, ascending.
  ///
  /// A backend whose theorem table does not exist yet returns an empty list.
  fn revisions(&self) -> impl Future<Output = Result<Vec<Revision>, Self::Error>> + Send + '_;
}

// ─── Feedback ────────────────────────────────────────────────────────────────

pub trait FeedbackStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append a new feedback row.
  fn record_feedback(
    &self,
    input: NewFeedback,
  ) -> impl Future<Output = Result<Feedback, Self::Error>> + Send + '_;

  /// Overwrite `relevant` and `rank` of the most recent row matching
  /// `(input.query, input.theorem_id)`.
  ///
  /// Returns `None` if no such row exists. The lookup and the write happen
  /// atomically with respect to other calls on the same store.
  fn update_latest_feedback(
    &self,
    input: NewFeedback,
  ) -> impl Future<Output = Result<Option<Feedback>, Self::Error>> + Send + '_;

  /// Every feedback row, ordered by id.
  fn list_feedback(&self) -> impl Future<Output = Result<Vec<Feedback>, Self::Error>> + Send + '_;
}

// ─── Clicks and calls ────────────────────────────────────────────────────────

pub trait ActivityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn record_click(
    &self,
    input: NewClick,
  ) -> impl Future<Output = Result<Click, Self::Error>> + Send + '_;

  fn record_call(
    &self,
    input: NewCall,
  ) -> impl Future<Output = Result<Call, Self::Error>> + Send + '_;
}
