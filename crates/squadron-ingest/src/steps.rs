//! Enrichment steps run during reconciliation.
//!
//! Each step fills in one group of AI-derived fields. A step whose field is
//! already present skips itself, so re-ingesting a character never calls the
//! provider again for it.

use std::sync::Arc;

use async_trait::async_trait;
use squadron_core::{character::Character, record::CharacterRecord};
use squadron_enrich::{
  AiServices, BiographyAdapter, Embedder, EvilnessAdapter, embed_character,
};

/// What a step may look at besides the evolving character.
pub struct StepContext<'a> {
  pub record:  &'a CharacterRecord,
  /// Normalised master names, sorted.
  pub masters: &'a [String],
}

#[async_trait]
pub trait EnrichmentStep: Send + Sync {
  /// Short name used in logs.
  fn name(&self) -> &'static str;

  /// Returns the enriched character, or `None` if the step had nothing to
  /// do. An error leaves the character as it was.
  async fn apply(
    &self,
    ctx: &StepContext<'_>,
    character: &Character,
  ) -> squadron_enrich::Result<Option<Character>>;
}

/// The ordered steps shared by every task of one run.
pub type Steps = Arc<[Box<dyn EnrichmentStep>]>;

/// Evilness, then biography, then embedding. The embedding comes last
/// because its text includes the other two.
pub fn standard_steps(ai: &AiServices) -> Steps {
  Arc::from(vec![
    Box::new(EvilnessStep(ai.classifier.clone())) as Box<dyn EnrichmentStep>,
    Box::new(BiographyStep(ai.biographer.clone())),
    Box::new(EmbeddingStep(ai.embedder.clone())),
  ])
}

/// No enrichment at all.
pub fn no_steps() -> Steps { Arc::from(Vec::new()) }

// ─── Steps ───────────────────────────────────────────────────────────────────

pub struct EvilnessStep(pub Arc<dyn EvilnessAdapter>);

#[async_trait]
impl EnrichmentStep for EvilnessStep {
  fn name(&self) -> &'static str { "evilness" }

  async fn apply(
    &self,
    ctx: &StepContext<'_>,
    character: &Character,
  ) -> squadron_enrich::Result<Option<Character>> {
    if character.is_classified() {
      return Ok(None);
    }
    let verdict = self.0.classify_evilness(ctx.record, ctx.masters).await;
    Ok(Some(Character {
      is_evil: verdict.is_evil,
      evilness_score: Some(verdict.evilness_score),
      evilness_explanation: Some(verdict.explanation),
      ..character.clone()
    }))
  }
}

pub struct BiographyStep(pub Arc<dyn BiographyAdapter>);

#[async_trait]
impl EnrichmentStep for BiographyStep {
  fn name(&self) -> &'static str { "biography" }

  async fn apply(
    &self,
    ctx: &StepContext<'_>,
    character: &Character,
  ) -> squadron_enrich::Result<Option<Character>> {
    if character.has_biography() {
      return Ok(None);
    }
    let biography = self.0.generate_biography(ctx.record).await;
    Ok(Some(Character { biography: Some(biography), ..character.clone() }))
  }
}

pub struct EmbeddingStep(pub Arc<dyn Embedder>);

#[async_trait]
impl EnrichmentStep for EmbeddingStep {
  fn name(&self) -> &'static str { "embedding" }

  async fn apply(
    &self,
    _ctx: &StepContext<'_>,
    character: &Character,
  ) -> squadron_enrich::Result<Option<Character>> {
    if character.has_embedding() {
      return Ok(None);
    }
    let embedding = embed_character(self.0.as_ref(), character).await?;
    Ok(Some(Character { embedding, ..character.clone() }))
  }
}
