//! Error type for `squadron-enrich`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("AI provider returned {status}: {body}")]
  Api { status: u16, body: String },

  #[error("invalid AI provider response: {0}")]
  InvalidResponse(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
