//! Evilness classification.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use squadron_core::record::CharacterRecord;

use crate::{Error, OpenAiClient, Result};

/// The outcome of classifying one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvilnessVerdict {
  pub is_evil:        bool,
  /// 0 (good) to 100 (evil).
  pub evilness_score: u8,
  pub explanation:    String,
}

impl EvilnessVerdict {
  /// The verdict recorded when classification fails.
  pub fn unclassifiable() -> Self {
    Self { is_evil: false, evilness_score: 0, explanation: "unable to classify".into() }
  }
}

#[async_trait]
pub trait EvilnessAdapter: Send + Sync {
  /// Classify `record`, taking its masters into account. Never fails:
  /// implementations fall back to [`EvilnessVerdict::unclassifiable`].
  async fn classify_evilness(
    &self,
    record: &CharacterRecord,
    master_names: &[String],
  ) -> EvilnessVerdict;
}

const SYSTEM_PROMPT: &str = "You classify Star Wars characters by how evil they are. \
  Respond with a JSON object with the keys \"is_evil\" (boolean), \
  \"evilness_score\" (integer from 0 for good to 100 for evil) and \
  \"evilness_explanation\" (string).";

fn user_prompt(record: &CharacterRecord, master_names: &[String]) -> String {
  let list = |items: &[String]| {
    if items.is_empty() { "None known".to_owned() } else { items.join(", ") }
  };
  format!(
    "Character: {}\nSpecies: {}\nHomeworld: {}\nAffiliations: {}\nMasters: {}",
    record.name,
    record.species.as_deref().unwrap_or("Unknown"),
    record.homeworld.as_deref().unwrap_or("Unknown"),
    list(&record.affiliations),
    list(master_names),
  )
}

/// The provider's raw answer; the score may arrive out of range.
#[derive(Deserialize)]
struct RawVerdict {
  is_evil:              bool,
  evilness_score:       i64,
  evilness_explanation: String,
}

fn parse_verdict(content: &str) -> Result<EvilnessVerdict> {
  let raw: RawVerdict = serde_json::from_str(content)?;
  let explanation = raw.evilness_explanation.trim().to_owned();
  if explanation.is_empty() {
    return Err(Error::InvalidResponse("empty evilness_explanation".into()));
  }
  Ok(EvilnessVerdict {
    is_evil: raw.is_evil,
    evilness_score: raw.evilness_score.clamp(0, 100) as u8,
    explanation,
  })
}

/// [`EvilnessAdapter`] backed by a JSON-mode chat completion.
pub struct LlmEvilnessClassifier {
  client: Arc<OpenAiClient>,
}

impl LlmEvilnessClassifier {
  pub fn new(client: Arc<OpenAiClient>) -> Self { Self { client } }

  async fn try_classify(
    &self,
    record: &CharacterRecord,
    master_names: &[String],
  ) -> Result<EvilnessVerdict> {
    let content = self
      .client
      .chat(SYSTEM_PROMPT, &user_prompt(record, master_names), 0.0, true)
      .await?;
    parse_verdict(&content)
  }
}

#[async_trait]
impl EvilnessAdapter for LlmEvilnessClassifier {
  async fn classify_evilness(
    &self,
    record: &CharacterRecord,
    master_names: &[String],
  ) -> EvilnessVerdict {
    match self.try_classify(record, master_names).await {
      Ok(verdict) => verdict,
      Err(e) => {
        tracing::warn!(character = %record.name, error = %e, "evilness classification failed");
        EvilnessVerdict::unclassifiable()
      }
    }
  }
}
