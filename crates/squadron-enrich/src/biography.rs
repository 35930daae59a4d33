//! Biography generation.

use std::sync::Arc;

use async_trait::async_trait;
use squadron_core::record::CharacterRecord;

use crate::OpenAiClient;

#[async_trait]
pub trait BiographyAdapter: Send + Sync {
  /// A short biography for `record`. Never fails: implementations fall back
  /// to [`fallback_biography`] when the provider is unavailable.
  async fn generate_biography(&self, record: &CharacterRecord) -> String;
}

/// The templated sentence used when generation fails.
pub fn fallback_biography(record: &CharacterRecord) -> String {
  format!(
    "A {} from {}, {} is a character of interest.",
    record.species.as_deref().unwrap_or("Unknown Species"),
    record.homeworld.as_deref().unwrap_or("Unknown Homeworld"),
    record.name,
  )
}

const SYSTEM_PROMPT: &str =
  "You write short, engaging biographies of Star Wars characters. Answer with the biography only.";

fn user_prompt(record: &CharacterRecord) -> String {
  let affiliations = if record.affiliations.is_empty() {
    "None known".to_owned()
  } else {
    record.affiliations.join(", ")
  };
  format!(
    "Write a short biography (2-3 sentences) for the Star Wars character {}.\n\n\
     Known details:\n\
     - Species: {}\n\
     - Homeworld: {}\n\
     - Affiliations: {affiliations}\n\n\
     Keep it concise and true to the Star Wars universe. Focus on their role and significance.",
    record.name,
    record.species.as_deref().unwrap_or("Unknown Species"),
    record.homeworld.as_deref().unwrap_or("Unknown Homeworld"),
  )
}

/// [`BiographyAdapter`] backed by a chat completion.
pub struct LlmBiographer {
  client: Arc<OpenAiClient>,
}

impl LlmBiographer {
  pub fn new(client: Arc<OpenAiClient>) -> Self { Self { client } }
}

#[async_trait]
impl BiographyAdapter for LlmBiographer {
  async fn generate_biography(&self, record: &CharacterRecord) -> String {
    match self.client.chat(SYSTEM_PROMPT, &user_prompt(record), 0.7, false).await {
      Ok(text) if !text.is_empty() => text,
      Ok(_) => {
        tracing::warn!(character = %record.name, "empty biography from provider; using fallback");
        fallback_biography(record)
      }
      Err(e) => {
        tracing::warn!(character = %record.name, error = %e, "biography generation failed; using fallback");
        fallback_biography(record)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::{Json, Router, http::StatusCode, routing::post};
  use serde_json::json;
  use squadron_core::record::FieldPolicy;

  use super::*;
  use crate::testing::{config_for, spawn};

  fn record(payload: serde_json::Value) -> CharacterRecord {
    CharacterRecord::from_payload(&payload, FieldPolicy::Lenient).unwrap()
  }

  fn biographer(base: &str) -> LlmBiographer {
    LlmBiographer::new(Arc::new(OpenAiClient::new(&config_for(base), "test-key".into()).unwrap()))
  }

  #[test]
  fn fallback_fills_unknown_values() {
    let r = record(json!({ "id": 1, "name": "Mystery" }));
    assert_eq!(
      fallback_biography(&r),
      "A Unknown Species from Unknown Homeworld, Mystery is a character of interest."
    );
  }

  #[tokio::test]
  async fn returns_provider_text() {
    let router = Router::new().route(
      "/chat/completions",
      post(|| async {
        Json(json!({ "choices": [{ "message": { "content": "  A farm boy turned Jedi.  " } }] }))
      }),
    );
    let base = spawn(router).await;

    let r = record(json!({ "id": 1, "name": "Luke Skywalker", "species": "human" }));
    assert_eq!(biographer(&base).generate_biography(&r).await, "A farm boy turned Jedi.");
  }

  #[tokio::test]
  async fn falls_back_when_provider_fails() {
    let router =
      Router::new().route("/chat/completions", post(|| async { StatusCode::BAD_REQUEST }));
    let base = spawn(router).await;

    let r = record(json!({ "id": 2, "name": "Yoda", "species": "Yoda's species", "homeworld": "unknown" }));
    assert_eq!(
      biographer(&base).generate_biography(&r).await,
      fallback_biography(&r)
    );
  }
}
