//! JSON REST API for Squadron.
//!
//! Exposes an axum [`Router`] backed by any [`Store`]. Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = squadron_api::api_router(AppState::new(store, embedder));
//! ```

pub mod characters;
pub mod error;
pub mod teams;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post},
};
use serde_json::{Value, json};
use squadron_core::{
  store::{CharacterStore, SoftDeleteRepository, TeamStore},
  team::Team,
};
use squadron_enrich::Embedder;

pub use error::ApiError;

// ─── Store bound ─────────────────────────────────────────────────────────────

/// Everything the handlers need from a backend.
pub trait Store: CharacterStore + TeamStore + SoftDeleteRepository<Team> + 'static {}

impl<T> Store for T where T: CharacterStore + TeamStore + SoftDeleteRepository<Team> + 'static {}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  /// `None` when no AI provider is configured; semantic search then answers
  /// 503.
  pub embedder: Option<Arc<dyn Embedder>>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, embedder: Option<Arc<dyn Embedder>>) -> Self {
    Self { store, embedder }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), embedder: self.embedder.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested or layered by the caller.
pub fn api_router<S: Store>(state: AppState<S>) -> Router<()> {
  Router::new()
    // Characters
    .route("/api/characters/", get(characters::list::<S>))
    .route("/api/characters/search/", get(characters::search::<S>))
    .route("/api/characters/{id}/", get(characters::get_one::<S>))
    // Teams
    .route("/api/teams/", get(teams::list::<S>).post(teams::create::<S>))
    .route(
      "/api/teams/{id}/",
      get(teams::get_one::<S>).put(teams::update::<S>).delete(teams::delete::<S>),
    )
    .route("/api/teams/{id}/add-member/", post(teams::add_member::<S>))
    .route("/api/teams/{id}/remove-member/", post(teams::remove_member::<S>))
    // Liveness
    .route("/health", get(health))
    .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests;
