//! JSON HTTP API for statesearch.
//!
//! Exposes an axum [`Router`] over a [`statesearch_engine::Engine`]. Tracing
//! middleware, binding and configuration are the caller's responsibility.
//!
//! | Method | Path        | Body                                              |
//! |--------|-------------|---------------------------------------------------|
//! | POST   | `/search`   | `{query, rev, nresult}` → `{results}`             |
//! | POST   | `/feedback` | `{query, theorem_id, relevant, rank, update?}`    |
//! | POST   | `/click`    | `{query, theorem_id, rank}`                       |
//! | POST   | `/call`     | `{call_type, query?}`                             |
//! | GET    | `/revs`     | → `{revs}`                                        |

pub mod error;
pub mod revs;
pub mod search;
pub mod signals;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use statesearch_core::{
  embed::Embedder,
  store::{ActivityStore, FeedbackStore, TheoremStore},
  vector::VectorStore,
};
use statesearch_engine::Engine;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct AppState<E, V, S> {
  pub engine:          Arc<Engine<E, V, S>>,
  /// Budget for one search, end to end. `None` disables the deadline.
  pub request_timeout: Option<Duration>,
}

impl<E, V, S> Clone for AppState<E, V, S> {
  fn clone(&self) -> Self {
    Self { engine: self.engine.clone(), request_timeout: self.request_timeout }
  }
}

/// Build the API router for `state`.
pub fn api_router<E, V, S>(state: AppState<E, V, S>) -> Router<()>
where
  E: Embedder + 'static,
  V: VectorStore + 'static,
  S: TheoremStore + FeedbackStore + ActivityStore + 'static,
{
  Router::new()
    .route("/search", post(search::handler::<E, V, S>))
    .route("/feedback", post(signals::feedback::<E, V, S>))
    .route("/click", post(signals::click::<E, V, S>))
    .route("/call", post(signals::call::<E, V, S>))
    .route("/revs", get(revs::handler::<E, V, S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
