//! Semantic search over stored character embeddings.

use serde::Serialize;
use squadron_core::{
  character::{Character, CharacterSummary},
  store::CharacterStore,
};
use thiserror::Error;

use crate::{Embedder, cosine_similarity};

#[derive(Debug, Error)]
pub enum SearchError {
  #[error("search query must not be empty")]
  EmptyQuery,

  #[error("could not embed query: {0}")]
  Embedding(#[from] crate::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// One search hit.
#[derive(Debug, Clone)]
pub struct ScoredCharacter {
  pub character: Character,
  pub score:     f32,
}

/// The wire shape of a [`ScoredCharacter`].
#[derive(Debug, Clone, Serialize)]
pub struct ScoredSummary {
  pub character: CharacterSummary,
  pub score:     f32,
}

impl ScoredCharacter {
  pub fn summary(&self) -> ScoredSummary {
    ScoredSummary { character: self.character.summary(), score: self.score }
  }
}

/// Rank active characters by cosine similarity to `query`, best first,
/// keeping at most `limit` hits. Characters without an embedding are never
/// returned.
pub async fn semantic_search<S: CharacterStore>(
  embedder: &dyn Embedder,
  store: &S,
  query: &str,
  limit: usize,
) -> Result<Vec<ScoredCharacter>, SearchError> {
  let query = query.trim();
  if query.is_empty() {
    return Err(SearchError::EmptyQuery);
  }

  let needle = embedder.embed(query).await?;
  let candidates = store
    .characters_with_embeddings()
    .await
    .map_err(|e| SearchError::Store(Box::new(e)))?;

  let mut hits: Vec<ScoredCharacter> = candidates
    .into_iter()
    .map(|character| {
      let score = cosine_similarity(&needle, &character.embedding);
      ScoredCharacter { character, score }
    })
    .collect();
  hits.sort_by(|a, b| b.score.total_cmp(&a.score));
  hits.truncate(limit);

  tracing::debug!(query, hits = hits.len(), "semantic search");
  Ok(hits)
}
