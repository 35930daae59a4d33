//! Handlers for `/api/characters` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/characters/` | Filters plus `page` / `page_size` |
//! | `GET`  | `/api/characters/search/` | `?query=<text>&limit=<1..=50>` |
//! | `GET`  | `/api/characters/:id/` | 404 if unknown or deleted |

use std::str::FromStr;

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{PathRejection, QueryRejection},
  },
};
use serde::{Deserialize, Serialize};
use squadron_core::{
  character::{CharacterDetail, CharacterSummary},
  store::CharacterQuery,
};
use squadron_enrich::{ScoredSummary, SearchError, semantic_search};

use crate::{AppState, Store, error::ApiError};

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;
const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;

// ─── List ────────────────────────────────────────────────────────────────────

/// Every parameter arrives as a raw string: blank values count as absent and
/// bad values produce the usual JSON error body.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub search:             Option<String>,
  pub name:               Option<String>,
  pub species:            Option<String>,
  pub homeworld:          Option<String>,
  pub is_evil:            Option<String>,
  pub min_evilness_score: Option<String>,
  pub max_evilness_score: Option<String>,
  /// 1-based.
  pub page:               Option<String>,
  pub page_size:          Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CharacterList {
  pub count:     usize,
  pub page:      usize,
  pub page_size: usize,
  pub results:   Vec<CharacterSummary>,
}

/// Blank filter values are treated as absent.
fn filter(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>, ApiError> {
  filter(value)
    .map(|v| {
      v.parse::<T>()
        .map_err(|_| ApiError::BadRequest(format!("{name}: invalid value {v:?}")))
    })
    .transpose()
}

fn parse_bool(name: &str, value: Option<String>) -> Result<Option<bool>, ApiError> {
  filter(value)
    .map(|v| match v.to_ascii_lowercase().as_str() {
      "true" | "1" => Ok(true),
      "false" | "0" => Ok(false),
      _ => Err(ApiError::BadRequest(format!("{name}: invalid value {v:?}"))),
    })
    .transpose()
}

/// `GET /api/characters/`
pub async fn list<S: Store>(
  State(state): State<AppState<S>>,
  query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<CharacterList>, ApiError> {
  let Query(params) = query?;
  let page = parse::<usize>("page", params.page)?.unwrap_or(1);
  if page == 0 {
    return Err(ApiError::BadRequest("page must be at least 1".into()));
  }
  let page_size = parse::<usize>("page_size", params.page_size)?
    .unwrap_or(DEFAULT_PAGE_SIZE)
    .min(MAX_PAGE_SIZE);
  if page_size == 0 {
    return Err(ApiError::BadRequest("page_size must be at least 1".into()));
  }

  let query = CharacterQuery {
    search:             filter(params.search),
    name:               filter(params.name),
    species:            filter(params.species),
    homeworld:          filter(params.homeworld),
    is_evil:            parse_bool("is_evil", params.is_evil)?,
    min_evilness_score: parse("min_evilness_score", params.min_evilness_score)?,
    max_evilness_score: parse("max_evilness_score", params.max_evilness_score)?,
    limit:              Some(page_size),
    offset:             Some((page - 1) * page_size),
  };

  let found = state.store.list_characters(&query).await.map_err(ApiError::from_store)?;
  Ok(Json(CharacterList {
    count: found.total,
    page,
    page_size,
    results: found.items.iter().map(|c| c.summary()).collect(),
  }))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /api/characters/:id/`
pub async fn get_one<S: Store>(
  State(state): State<AppState<S>>,
  path: Result<Path<i64>, PathRejection>,
) -> Result<Json<CharacterDetail>, ApiError> {
  let Path(id) = path?;
  let character = state
    .store
    .get_character(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound("Character not found.".into()))?;
  let masters = state.store.masters_of(id).await.map_err(ApiError::from_store)?;
  Ok(Json(character.detail(masters)))
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// Both parameters arrive as raw strings so that bad values produce the
/// usual JSON error body.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub query: Option<String>,
  pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
  pub query:   String,
  pub results: Vec<ScoredSummary>,
}

fn search_limit(raw: Option<&str>) -> Result<usize, ApiError> {
  let Some(raw) = raw else {
    return Ok(DEFAULT_SEARCH_LIMIT);
  };
  match raw.trim().parse::<usize>() {
    Ok(limit) if (1..=MAX_SEARCH_LIMIT).contains(&limit) => Ok(limit),
    _ => Err(ApiError::BadRequest(format!(
      "limit must be an integer between 1 and {MAX_SEARCH_LIMIT}"
    ))),
  }
}

/// `GET /api/characters/search/?query=<text>&limit=<n>`
pub async fn search<S: Store>(
  State(state): State<AppState<S>>,
  query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResults>, ApiError> {
  let Query(params) = query?;
  let query = params.query.as_deref().map(str::trim).unwrap_or_default().to_owned();
  if query.is_empty() {
    return Err(ApiError::BadRequest("query parameter is required".into()));
  }
  let limit = search_limit(params.limit.as_deref())?;

  let Some(embedder) = state.embedder.as_deref() else {
    return Err(ApiError::Unavailable("semantic search is not configured".into()));
  };

  let hits = semantic_search(embedder, state.store.as_ref(), &query, limit)
    .await
    .map_err(|e| match e {
      SearchError::EmptyQuery => ApiError::BadRequest(e.to_string()),
      other => ApiError::Internal(Box::new(other)),
    })?;

  Ok(Json(SearchResults { query, results: hits.iter().map(|h| h.summary()).collect() }))
}
