//! Error type for `squadron-ingest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("could not fetch dataset: {0}")]
  Fetch(#[from] reqwest::Error),

  #[error("dataset source {url} returned {status}")]
  SourceStatus { url: String, status: u16 },

  #[error("dataset is not a JSON array")]
  NotAnArray,

  #[error(transparent)]
  Record(#[from] squadron_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
