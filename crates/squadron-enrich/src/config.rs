//! Configuration for the OpenAI-compatible provider.

use serde::Deserialize;

/// The `ai` section of the server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
  /// Falls back to the `OPENAI_API_KEY` environment variable when unset.
  pub api_key:         Option<String>,
  pub base_url:        String,
  pub chat_model:      String,
  pub embedding_model: String,
  pub timeout_secs:    u64,
  pub max_retries:     u32,
  /// First backoff delay; doubled on each retry.
  pub retry_base_ms:   u64,
}

impl Default for AiConfig {
  fn default() -> Self {
    Self {
      api_key:         None,
      base_url:        "https://api.openai.com/v1".into(),
      chat_model:      "gpt-4o-mini".into(),
      embedding_model: "text-embedding-3-small".into(),
      timeout_secs:    30,
      max_retries:     3,
      retry_base_ms:   1_000,
    }
  }
}

impl AiConfig {
  /// The configured key, or `OPENAI_API_KEY`. Blank values count as unset.
  pub fn resolved_api_key(&self) -> Option<String> {
    non_blank(self.api_key.as_deref())
      .or_else(|| non_blank(std::env::var("OPENAI_API_KEY").ok().as_deref()))
  }
}

fn non_blank(key: Option<&str>) -> Option<String> {
  key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_owned)
}
