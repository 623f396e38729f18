//! Embedding gateway adapters implementing [`statesearch_core::embed::Embedder`].
//!
//! - [`HttpEmbedder`] talks to an OpenAI-compatible `/embeddings` endpoint
//!   serving the deployed model.
//! - [`HashedEmbedder`] is a deterministic, model-free feature-hashing
//!   embedder for tests and offline development.

mod hashed;
mod http;

pub mod error;

pub use error::{Error, Result};
pub use hashed::HashedEmbedder;
pub use http::{HttpEmbedder, HttpEmbedderConfig};
