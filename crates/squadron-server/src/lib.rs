//! Configuration and wiring for the `squadron` binary.
//!
//! Settings come from a TOML file (default `squadron.toml`, optional) and
//! are overridden by `SQUADRON_*` environment variables. Nested keys use a
//! double underscore, e.g. `SQUADRON_AI__API_KEY` or
//! `SQUADRON_INGEST__MAX_WORKERS`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use squadron_api::{AppState, Store, api_router};
use squadron_core::record::FieldPolicy;
use squadron_enrich::AiConfig;
use squadron_ingest::{IngestOptions, Source};
use tower_http::trace::TraceLayer;

pub const DEFAULT_SOURCE_URL: &str = "https://akabab.github.io/starwars-api/api/all.json";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub source_url:         String,
  pub fetch_timeout_secs: u64,
  pub ingest:             IngestConfig,
  pub ai:                 AiConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8000,
      store_path:         PathBuf::from("squadron.db"),
      source_url:         DEFAULT_SOURCE_URL.to_string(),
      fetch_timeout_secs: 30,
      ingest:             IngestConfig::default(),
      ai:                 AiConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
  pub max_workers:   usize,
  /// Reject records carrying fields the catalog does not know.
  pub strict_fields: bool,
}

impl Default for IngestConfig {
  fn default() -> Self { Self { max_workers: 8, strict_fields: false } }
}

impl ServerConfig {
  /// Read `path` (if it exists) and the `SQUADRON_*` environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let builder = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(environment());
    builder
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn source(&self) -> Source {
    Source {
      url:     self.source_url.clone(),
      timeout: Duration::from_secs(self.fetch_timeout_secs),
    }
  }

  /// Ingestion options from config; command-line flags are applied on top.
  pub fn ingest_options(&self) -> IngestOptions {
    IngestOptions {
      max_workers: self.ingest.max_workers,
      field_policy: if self.ingest.strict_fields {
        FieldPolicy::Strict
      } else {
        FieldPolicy::Lenient
      },
      ..IngestOptions::default()
    }
  }
}

fn environment() -> config::Environment {
  config::Environment::with_prefix("SQUADRON")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ─────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn app<S: Store>(state: AppState<S>) -> Router {
  api_router(state).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{body::Body, http::Request};
  use config::{Config, File, FileFormat};
  use squadron_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.address(), "127.0.0.1:8000");
    assert_eq!(cfg.store_path, PathBuf::from("squadron.db"));
    assert_eq!(cfg.source_url, DEFAULT_SOURCE_URL);
    assert_eq!(cfg.ingest.max_workers, 8);
    assert!(!cfg.ingest.strict_fields);
    assert_eq!(cfg.ai.max_retries, AiConfig::default().max_retries);
    assert!(cfg.ai.api_key.is_none());
  }

  #[test]
  fn nested_sections_override_defaults() {
    let cfg = from_toml(
      r#"
        port = 9000
        fetch_timeout_secs = 5

        [ingest]
        max_workers = 2
        strict_fields = true

        [ai]
        api_key = "sk-test"
        chat_model = "gpt-test"
      "#,
    );
    assert_eq!(cfg.address(), "127.0.0.1:9000");
    assert_eq!(cfg.source().timeout, Duration::from_secs(5));

    let options = cfg.ingest_options();
    assert_eq!(options.max_workers, 2);
    assert_eq!(options.field_policy, FieldPolicy::Strict);
    assert!(!options.skip_ai);
    assert_eq!(options.limit, None);

    assert_eq!(cfg.ai.api_key.as_deref(), Some("sk-test"));
    assert_eq!(cfg.ai.chat_model, "gpt-test");
    assert_eq!(cfg.ai.embedding_model, AiConfig::default().embedding_model);
  }

  #[test]
  fn missing_config_file_is_not_an_error() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/squadron.toml")).unwrap();
    assert_eq!(cfg.ingest.max_workers, IngestConfig::default().max_workers);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(expand_tilde(Path::new("~/data/squadron.db")), PathBuf::from(home).join("data/squadron.db"));
    assert_eq!(expand_tilde(Path::new("/var/squadron.db")), PathBuf::from("/var/squadron.db"));
  }

  #[tokio::test]
  async fn app_serves_health() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let response = app(AppState::new(store, None))
      .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(response.status(), 200);
  }
}
