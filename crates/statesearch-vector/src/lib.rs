//! Vector-store adapters implementing [`statesearch_core::vector::VectorStore`].
//!
//! - [`QdrantStore`] speaks Qdrant's REST API. Revision names are served
//!   through collection aliases so a rebuilt collection can be swapped in
//!   atomically.
//! - [`MemoryVectorStore`] keeps every collection in process and answers
//!   queries by brute-force dot product.

mod memory;
mod qdrant;

pub mod error;

pub use error::{Error, Result};
pub use memory::MemoryVectorStore;
pub use qdrant::{QdrantConfig, QdrantStore};
