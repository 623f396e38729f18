//! Runtime configuration, read from a TOML file layered with
//! `STATESEARCH_*` environment variables.
//!
//! Nested keys use `__` in the environment, e.g.
//! `STATESEARCH_EMBEDDING__URL`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use statesearch_embed::HttpEmbedderConfig;
use statesearch_engine::{QueryEmbedding, RetrieverConfig};
use statesearch_vector::QdrantConfig;

fn default_host() -> String { "0.0.0.0".into() }

fn default_port() -> u16 { 7720 }

fn default_store_path() -> PathBuf { PathBuf::from("statesearch.db") }

fn default_request_timeout_ms() -> u64 { 30_000 }

fn default_max_query_bytes() -> usize { 16 * 1024 }

fn default_hashed_dimension() -> usize { 256 }

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  /// Deadline for one search request; `0` disables it.
  #[serde(default = "default_request_timeout_ms")]
  pub request_timeout_ms: u64,
  #[serde(default = "default_max_query_bytes")]
  pub max_query_bytes:    usize,
  #[serde(default)]
  pub query_embedding:    QueryEmbedding,
  /// Index every known revision before accepting requests.
  #[serde(default)]
  pub index_on_startup:   bool,
  #[serde(default)]
  pub embedding:          EmbeddingConfig,
  #[serde(default)]
  pub vector:             VectorConfig,
}

/// Which embedder to construct.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum EmbeddingConfig {
  Http(HttpEmbedderConfig),
  /// Feature hashing; no model needed. For tests and local development.
  Hashed {
    #[serde(default = "default_hashed_dimension")]
    dimension: usize,
  },
}

impl Default for EmbeddingConfig {
  fn default() -> Self { EmbeddingConfig::Hashed { dimension: default_hashed_dimension() } }
}

/// Which vector store to construct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum VectorConfig {
  Qdrant(QdrantConfig),
  /// Process-local; contents are lost on exit.
  #[default]
  Memory,
}

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(
        Environment::with_prefix("STATESEARCH")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn retriever(&self) -> RetrieverConfig {
    RetrieverConfig {
      max_query_bytes: self.max_query_bytes,
      query_embedding: self.query_embedding,
    }
  }

  pub fn request_timeout(&self) -> Option<Duration> {
    (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
  }
}
