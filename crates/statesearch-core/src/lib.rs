//! Core types and trait definitions for the statesearch theorem-search
//! backend.
//!
//! This crate is deliberately free of HTTP, database and model dependencies.
//! All other crates depend on it; the relational store, the vector store and
//! the embedding model are reached only through the traits defined here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod embed;
pub mod error;
pub mod query;
pub mod revision;
pub mod signal;
pub mod store;
pub mod theorem;
pub mod vector;

pub use error::{Error, Result};
pub use revision::Revision;
