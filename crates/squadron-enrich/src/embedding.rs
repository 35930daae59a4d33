//! Text embeddings and vector similarity.

use std::sync::Arc;

use async_trait::async_trait;
use squadron_core::character::Character;

use crate::{OpenAiClient, Result};

/// Trait for text-to-vector embedding clients.
#[async_trait]
pub trait Embedder: Send + Sync {
  async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// [`Embedder`] backed by the embeddings endpoint.
pub struct OpenAiEmbedder {
  client: Arc<OpenAiClient>,
}

impl OpenAiEmbedder {
  pub fn new(client: Arc<OpenAiClient>) -> Self { Self { client } }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
  async fn embed(&self, text: &str) -> Result<Vec<f32>> { self.client.embed(text).await }
}

/// The text embedded for a character: its descriptive attributes joined into
/// one line per attribute. Absent attributes are left out.
pub fn embedding_text(character: &Character) -> String {
  let mut lines = vec![format!("Name: {}", character.name)];
  if let Some(species) = &character.species {
    lines.push(format!("Species: {species}"));
  }
  if let Some(homeworld) = &character.homeworld {
    lines.push(format!("Homeworld: {homeworld}"));
  }
  if !character.affiliations.is_empty() {
    lines.push(format!("Affiliations: {}", character.affiliations.join(", ")));
  }
  if let Some(bio) = &character.biography {
    lines.push(format!("Biography: {bio}"));
  }
  if let Some(why) = &character.evilness_explanation {
    lines.push(format!("Alignment: {why}"));
  }
  lines.join("\n")
}

/// Embed a character's [`embedding_text`].
pub async fn embed_character(embedder: &dyn Embedder, character: &Character) -> Result<Vec<f32>> {
  embedder.embed(&embedding_text(character)).await
}

/// Compute cosine similarity between two vectors.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or
/// zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() || a.is_empty() {
    return 0.0;
  }

  let mut dot = 0.0f32;
  let mut norm_a = 0.0f32;
  let mut norm_b = 0.0f32;

  for (x, y) in a.iter().zip(b) {
    dot += x * y;
    norm_a += x * x;
    norm_b += y * y;
  }

  let denom = norm_a.sqrt() * norm_b.sqrt();
  if denom < f32::EPSILON {
    return 0.0;
  }

  dot / denom
}
