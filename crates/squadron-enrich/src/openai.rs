//! Minimal client for an OpenAI-compatible HTTP API.
//!
//! Only the two endpoints the adapters need are covered:
//! `POST {base_url}/chat/completions` and `POST {base_url}/embeddings`.
//!
//! Retry strategy:
//! - HTTP 429 or 5xx → retry with exponential backoff
//! - other HTTP 4xx → fail immediately
//! - transport error → retry

use std::time::Duration;

use serde_json::{Value, json};

use crate::{AiConfig, Error, Result};

pub struct OpenAiClient {
  http:            reqwest::Client,
  api_key:         String,
  base_url:        String,
  chat_model:      String,
  embedding_model: String,
  max_retries:     u32,
  retry_base:      Duration,
}

impl OpenAiClient {
  pub fn new(config: &AiConfig, api_key: String) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      http,
      api_key,
      base_url: config.base_url.trim_end_matches('/').to_owned(),
      chat_model: config.chat_model.clone(),
      embedding_model: config.embedding_model.clone(),
      max_retries: config.max_retries,
      retry_base: Duration::from_millis(config.retry_base_ms),
    })
  }

  /// Run one chat completion and return the first choice's content.
  ///
  /// With `json_mode` the provider is asked for a JSON object response.
  pub async fn chat(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
    json_mode: bool,
  ) -> Result<String> {
    let mut body = json!({
      "model": self.chat_model,
      "temperature": temperature,
      "messages": [
        { "role": "system", "content": system },
        { "role": "user", "content": user },
      ],
    });
    if json_mode {
      body["response_format"] = json!({ "type": "json_object" });
    }

    let response = self.post_json("chat/completions", &body).await?;
    response
      .pointer("/choices/0/message/content")
      .and_then(Value::as_str)
      .map(|s| s.trim().to_owned())
      .ok_or_else(|| Error::InvalidResponse("missing choices[0].message.content".into()))
  }

  /// Embed a single input text.
  pub async fn embed(&self, input: &str) -> Result<Vec<f32>> {
    let body = json!({ "model": self.embedding_model, "input": input });
    let response = self.post_json("embeddings", &body).await?;
    parse_embedding(&response)
  }

  async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
    let url = format!("{}/{path}", self.base_url);
    let mut last_err = None;

    for attempt in 0..=self.max_retries {
      if attempt > 0 {
        let delay = self.retry_base * (1 << (attempt - 1).min(5));
        tracing::debug!(%url, attempt, ?delay, "retrying AI provider request");
        tokio::time::sleep(delay).await;
      }

      let outcome = self
        .http
        .post(&url)
        .bearer_auth(&self.api_key)
        .json(body)
        .send()
        .await;

      match outcome {
        Ok(response) => {
          let status = response.status();
          if status.is_success() {
            return Ok(response.json().await?);
          }

          let body_text = response.text().await.unwrap_or_default();
          let err = Error::Api { status: status.as_u16(), body: body_text };
          if status.as_u16() == 429 || status.is_server_error() {
            tracing::warn!(%url, %status, "transient AI provider error");
            last_err = Some(err);
            continue;
          }
          return Err(err);
        }
        Err(e) => {
          tracing::warn!(%url, error = %e, "AI provider request failed");
          last_err = Some(e.into());
        }
      }
    }

    Err(last_err.unwrap_or_else(|| Error::InvalidResponse("no attempt was made".into())))
  }
}

/// Extract `data[0].embedding` from an embeddings response.
fn parse_embedding(response: &Value) -> Result<Vec<f32>> {
  let values = response
    .pointer("/data/0/embedding")
    .and_then(Value::as_array)
    .ok_or_else(|| Error::InvalidResponse("missing data[0].embedding".into()))?;

  values
    .iter()
    .map(|v| {
      v.as_f64()
        .map(|f| f as f32)
        .ok_or_else(|| Error::InvalidResponse(format!("non-numeric embedding value {v}")))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  use axum::{Json, Router, http::StatusCode, routing::post};

  use super::*;
  use crate::testing::{config_for, spawn};

  #[tokio::test]
  async fn retries_transient_errors_then_succeeds() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
      "/embeddings",
      post(move || {
        let counter = counter.clone();
        async move {
          if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(StatusCode::SERVICE_UNAVAILABLE)
          } else {
            Ok(Json(json!({ "data": [{ "embedding": [0.5, 0.25] }] })))
          }
        }
      }),
    );
    let base = spawn(router).await;

    let client = OpenAiClient::new(&config_for(&base), "test-key".into()).unwrap();
    let embedding = client.embed("hello").await.unwrap();

    assert_eq!(embedding, vec![0.5, 0.25]);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn client_errors_fail_immediately() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
      "/chat/completions",
      post(move || {
        let counter = counter.clone();
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          (StatusCode::UNAUTHORIZED, "bad key")
        }
      }),
    );
    let base = spawn(router).await;

    let client = OpenAiClient::new(&config_for(&base), "test-key".into()).unwrap();
    let err = client.chat("sys", "user", 0.0, false).await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 401, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn gives_up_after_max_retries() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
      "/embeddings",
      post(move || {
        let counter = counter.clone();
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          StatusCode::TOO_MANY_REQUESTS
        }
      }),
    );
    let base = spawn(router).await;

    let client = OpenAiClient::new(&config_for(&base), "test-key".into()).unwrap();
    let err = client.embed("hello").await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 429, .. }));
    // One initial attempt plus `max_retries` retries.
    assert_eq!(hits.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn malformed_embedding_response_is_rejected() {
    assert!(parse_embedding(&json!({ "data": [] })).is_err());
    assert!(parse_embedding(&json!({ "data": [{ "embedding": ["x"] }] })).is_err());
  }
}
