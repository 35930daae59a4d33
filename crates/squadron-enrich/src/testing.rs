//! Test helpers: a throwaway local HTTP server standing in for the provider.

use axum::Router;

use crate::AiConfig;

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn(router: Router) -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });
  format!("http://{addr}")
}

/// Provider config pointing at `base_url` with fast retries.
pub fn config_for(base_url: &str) -> AiConfig {
  AiConfig {
    api_key: Some("test-key".into()),
    base_url: base_url.into(),
    timeout_secs: 5,
    max_retries: 2,
    retry_base_ms: 1,
    ..AiConfig::default()
  }
}
