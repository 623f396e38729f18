//! statesearch server: configuration, HTTP assembly and the offline
//! ingest/export commands used by the `statesearch` binary.

pub mod config;
pub mod error;
pub mod export;
pub mod ingest;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use crate::config::{EmbeddingConfig, ServerConfig, VectorConfig};
pub use error::{Error, Result};

/// Wrap the API router with request tracing.
pub fn app(api: Router) -> Router { api.layer(TraceLayer::new_for_http()) }
