//! AI enrichment adapters for the Squadron catalog.
//!
//! Three narrow interfaces sit between the ingestion pipeline and the model
//! provider: [`BiographyAdapter`], [`EvilnessAdapter`] and [`Embedder`]. The
//! bundled implementations talk to any OpenAI-compatible HTTP API through
//! [`OpenAiClient`]. Semantic search ranks stored embeddings by cosine
//! similarity against an embedded query.

pub mod biography;
pub mod config;
pub mod embedding;
pub mod error;
pub mod evilness;
pub mod openai;
pub mod search;

use std::sync::Arc;

pub use biography::{BiographyAdapter, LlmBiographer};
pub use config::AiConfig;
pub use embedding::{Embedder, OpenAiEmbedder, cosine_similarity, embed_character, embedding_text};
pub use error::{Error, Result};
pub use evilness::{EvilnessAdapter, EvilnessVerdict, LlmEvilnessClassifier};
pub use openai::OpenAiClient;
pub use search::{ScoredCharacter, ScoredSummary, SearchError, semantic_search};

/// The full set of enrichment adapters, sharing one HTTP client.
#[derive(Clone)]
pub struct AiServices {
  pub biographer: Arc<dyn BiographyAdapter>,
  pub classifier: Arc<dyn EvilnessAdapter>,
  pub embedder:   Arc<dyn Embedder>,
}

impl AiServices {
  /// Build the OpenAI-backed adapters.
  ///
  /// Returns `Ok(None)` when no API key is configured.
  pub fn from_config(config: &AiConfig) -> Result<Option<Self>> {
    let Some(api_key) = config.resolved_api_key() else {
      return Ok(None);
    };
    let client = Arc::new(OpenAiClient::new(config, api_key)?);
    Ok(Some(Self {
      biographer: Arc::new(LlmBiographer::new(client.clone())),
      classifier: Arc::new(LlmEvilnessClassifier::new(client.clone())),
      embedder:   Arc::new(OpenAiEmbedder::new(client)),
    }))
  }
}

#[cfg(test)]
pub(crate) mod testing;
