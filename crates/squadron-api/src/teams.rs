//! Handlers for `/api/teams` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/teams/` | Newest first |
//! | `POST`   | `/api/teams/` | Body: `{"name":"...","owner":1}` |
//! | `GET`    | `/api/teams/:id/` | 404 if unknown or deleted |
//! | `PUT`    | `/api/teams/:id/` | Same body as `POST` |
//! | `DELETE` | `/api/teams/:id/` | Soft delete |
//! | `POST`   | `/api/teams/:id/add-member/` | Body: `{"character_id":1}` |
//! | `POST`   | `/api/teams/:id/remove-member/` | Body: `{"character_id":1}` |

use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use squadron_core::{
  store::SoftDeleteRepository,
  team::{NewTeam, Team, TeamDetail, TeamSummary},
};

use crate::{AppState, Store, error::ApiError};

/// Load the detail view of an active team, or 404.
async fn detail<S: Store>(state: &AppState<S>, id: i64) -> Result<TeamDetail, ApiError> {
  let roster = state
    .store
    .roster(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound("Team not found.".into()))?;
  Ok(roster.detail())
}

// ─── CRUD ────────────────────────────────────────────────────────────────────

/// `GET /api/teams/`
pub async fn list<S: Store>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<TeamSummary>>, ApiError> {
  let rosters = state.store.list_rosters().await.map_err(ApiError::from_store)?;
  Ok(Json(rosters.iter().map(|r| r.summary()).collect()))
}

/// `POST /api/teams/`
pub async fn create<S: Store>(
  State(state): State<AppState<S>>,
  body: Result<Json<NewTeam>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Json(input) = body?;
  let team = state.store.create_team(input).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(detail(&state, team.id).await?)))
}

/// `GET /api/teams/:id/`
pub async fn get_one<S: Store>(
  State(state): State<AppState<S>>,
  path: Result<Path<i64>, PathRejection>,
) -> Result<Json<TeamDetail>, ApiError> {
  let Path(id) = path?;
  Ok(Json(detail(&state, id).await?))
}

/// `PUT /api/teams/:id/`
pub async fn update<S: Store>(
  State(state): State<AppState<S>>,
  path: Result<Path<i64>, PathRejection>,
  body: Result<Json<NewTeam>, JsonRejection>,
) -> Result<Json<TeamDetail>, ApiError> {
  let Path(id) = path?;
  let Json(input) = body?;
  state
    .store
    .update_team(id, input)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound("Team not found.".into()))?;
  Ok(Json(detail(&state, id).await?))
}

/// `DELETE /api/teams/:id/`
pub async fn delete<S: Store>(
  State(state): State<AppState<S>>,
  path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
  let Path(id) = path?;
  let deleted = SoftDeleteRepository::<Team>::soft_delete(state.store.as_ref(), id)
    .await
    .map_err(ApiError::from_store)?;
  if !deleted {
    return Err(ApiError::NotFound("Team not found.".into()));
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Membership ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MemberBody {
  pub character_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MembershipChange {
  pub message: String,
  pub team:    TeamDetail,
}

/// `POST /api/teams/:id/add-member/`
///
/// The eligibility check runs inside the store's write transaction; its
/// reason is returned verbatim on rejection.
pub async fn add_member<S: Store>(
  State(state): State<AppState<S>>,
  path: Result<Path<i64>, PathRejection>,
  body: Result<Json<MemberBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let Path(id) = path?;
  let Json(MemberBody { character_id }) = body?;
  state.store.add_member(id, character_id).await.map_err(ApiError::from_store)?;

  let team = detail(&state, id).await?;
  let name = team
    .members
    .iter()
    .find(|m| m.character.id == character_id)
    .map(|m| m.character.name.clone())
    .unwrap_or_default();

  tracing::info!(team_id = id, character_id, "member added");
  Ok((
    StatusCode::CREATED,
    Json(MembershipChange { message: format!("{name} added to team successfully."), team }),
  ))
}

/// `POST /api/teams/:id/remove-member/`
pub async fn remove_member<S: Store>(
  State(state): State<AppState<S>>,
  path: Result<Path<i64>, PathRejection>,
  body: Result<Json<MemberBody>, JsonRejection>,
) -> Result<Json<MembershipChange>, ApiError> {
  let Path(id) = path?;
  let Json(MemberBody { character_id }) = body?;

  let removed = state.store.remove_member(id, character_id).await.map_err(ApiError::from_store)?;
  let character = state
    .store
    .get_character(character_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound("Character not found.".into()))?;

  if !removed {
    return Err(ApiError::BadRequest(format!(
      "{} is not a member of this team.",
      character.name
    )));
  }

  tracing::info!(team_id = id, character_id, "member removed");
  Ok(Json(MembershipChange {
    message: format!("{} removed from team successfully.", character.name),
    team:    detail(&state, id).await?,
  }))
}
