//! Router tests against an in-memory store.

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::{Value, json};
use squadron_core::{
  character::Character,
  store::{CharacterStore, SoftDeleteRepository},
};
use squadron_enrich::Embedder;
use squadron_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use crate::{AppState, api_router};

// ─── Fixtures ────────────────────────────────────────────────────────────────

struct AxisEmbedder;

#[async_trait]
impl Embedder for AxisEmbedder {
  async fn embed(&self, text: &str) -> squadron_enrich::Result<Vec<f32>> {
    Ok(if text.contains("dark") { vec![0.0, 1.0] } else { vec![1.0, 0.0] })
  }
}

struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
  async fn embed(&self, _text: &str) -> squadron_enrich::Result<Vec<f32>> {
    Err(squadron_enrich::Error::InvalidResponse("provider down".into()))
  }
}

fn character(id: i64, name: &str, score: u8, is_evil: bool, embedding: Vec<f32>) -> Character {
  let now = Utc::now();
  Character {
    id,
    name: name.into(),
    height: Some(1.72),
    mass: None,
    gender: None,
    homeworld: Some("Tatooine".into()),
    species: Some("Human".into()),
    image_url: None,
    affiliations: vec![],
    biography: Some(format!("{name} is someone.")),
    is_evil,
    evilness_score: Some(score),
    evilness_explanation: Some("judged".into()),
    embedding,
    is_deleted: false,
    created_at: now,
    updated_at: now,
  }
}

async fn seeded() -> Arc<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let cast = [
    character(1, "Luke Skywalker", 10, false, vec![1.0, 0.0]),
    character(2, "Leia Organa", 20, false, vec![0.9, 0.1]),
    character(3, "Han Solo", 90, false, vec![]),
    character(4, "Darth Vader", 95, true, vec![0.0, 1.0]),
    character(5, "Chewbacca", 5, false, vec![]),
    character(6, "Obi-Wan Kenobi", 0, false, vec![]),
    character(7, "Lando Calrissian", 30, false, vec![]),
  ];
  for c in cast {
    let masters: BTreeSet<String> =
      if c.id == 1 { ["Obi-Wan Kenobi".to_owned(), "Yoda".to_owned()].into() } else { BTreeSet::new() };
    store.commit_reconciliation(c, masters).await.unwrap();
  }
  Arc::new(store)
}

async fn state_with(embedder: Option<Arc<dyn Embedder>>) -> AppState<SqliteStore> {
  AppState::new(seeded().await, embedder)
}

async fn state() -> AppState<SqliteStore> { state_with(None).await }

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = api_router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, json)
}

async fn create_team(state: &AppState<SqliteStore>, name: &str) -> i64 {
  let (status, body) = send(state, "POST", "/api/teams/", Some(json!({ "name": name }))).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["id"].as_i64().unwrap()
}

async fn add(state: &AppState<SqliteStore>, team: i64, character: i64) -> (StatusCode, Value) {
  send(
    state,
    "POST",
    &format!("/api/teams/{team}/add-member/"),
    Some(json!({ "character_id": character })),
  )
  .await
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_ok() {
  let (status, body) = send(&state().await, "GET", "/health", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "status": "ok" }));
}

// ─── Characters ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_characters_paginates() {
  let s = state().await;
  let (status, body) = send(&s, "GET", "/api/characters/?page=2&page_size=3", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["count"], 7);
  assert_eq!(body["page"], 2);
  assert_eq!(body["page_size"], 3);
  let names: Vec<_> = body["results"].as_array().unwrap().iter().map(|c| c["name"].clone()).collect();
  assert_eq!(names, vec![json!("Lando Calrissian"), json!("Leia Organa"), json!("Luke Skywalker")]);
}

#[tokio::test]
async fn list_characters_filters() {
  let s = state().await;
  let (_, body) = send(&s, "GET", "/api/characters/?is_evil=true", None).await;
  assert_eq!(body["count"], 1);
  assert_eq!(body["results"][0]["name"], "Darth Vader");

  let (_, body) = send(&s, "GET", "/api/characters/?search=solo", None).await;
  assert_eq!(body["count"], 1);

  let (_, body) = send(&s, "GET", "/api/characters/?max_evilness_score=10", None).await;
  assert_eq!(body["count"], 3);

  let (status, _) = send(&s, "GET", "/api/characters/?page=0", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_filters_are_ignored() {
  let s = state().await;
  let (status, body) = send(
    &s,
    "GET",
    "/api/characters/?search=&name=&species=&homeworld=&is_evil=&min_evilness_score=\
     &max_evilness_score=&page=&page_size=",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["count"], 7);
  assert_eq!(body["page"], 1);
  assert_eq!(body["page_size"], 20);
}

#[tokio::test]
async fn malformed_parameters_are_json_400s() {
  let s = state().await;
  for uri in [
    "/api/characters/?min_evilness_score=abc",
    "/api/characters/?max_evilness_score=500",
    "/api/characters/?is_evil=maybe",
    "/api/characters/?page_size=-1",
    "/api/characters/luke/",
    "/api/teams/rogue/",
  ] {
    let (status, body) = send(&s, "GET", uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    assert!(body["error"].is_string(), "{uri}: {body}");
  }

  let (_, body) = send(&s, "GET", "/api/characters/?is_evil=1&min_evilness_score=90", None).await;
  assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn character_detail_includes_masters() {
  let s = state().await;
  let (status, body) = send(&s, "GET", "/api/characters/1/", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Luke Skywalker");
  assert_eq!(body["masters"], json!(["Obi-Wan Kenobi", "Yoda"]));
  assert_eq!(body["biography"], "Luke Skywalker is someone.");
  assert!(body.get("embedding").is_none());
}

#[tokio::test]
async fn deleted_or_unknown_character_is_404() {
  let s = state().await;
  SoftDeleteRepository::<Character>::soft_delete(s.store.as_ref(), 5).await.unwrap();

  let (status, body) = send(&s, "GET", "/api/characters/5/", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "Character not found.");

  let (status, _) = send(&s, "GET", "/api/characters/999/", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_ranks_by_similarity() {
  let s = state_with(Some(Arc::new(AxisEmbedder))).await;
  let (status, body) = send(&s, "GET", "/api/characters/search/?query=hero&limit=2", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["query"], "hero");
  let results = body["results"].as_array().unwrap();
  assert_eq!(results.len(), 2);
  assert_eq!(results[0]["character"]["name"], "Luke Skywalker");
  assert_eq!(results[1]["character"]["name"], "Leia Organa");

  let (_, body) = send(&s, "GET", "/api/characters/search/?query=dark%20side&limit=1", None).await;
  assert_eq!(body["results"][0]["character"]["name"], "Darth Vader");
}

#[tokio::test]
async fn search_validates_parameters() {
  let s = state_with(Some(Arc::new(AxisEmbedder))).await;
  for uri in [
    "/api/characters/search/",
    "/api/characters/search/?query=%20%20",
    "/api/characters/search/?query=x&limit=0",
    "/api/characters/search/?query=x&limit=51",
    "/api/characters/search/?query=x&limit=many",
  ] {
    let (status, body) = send(&s, "GET", uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    assert!(body["error"].is_string());
  }
}

#[tokio::test]
async fn search_without_embedder_is_unavailable() {
  let (status, _) = send(&state().await, "GET", "/api/characters/search/?query=x", None).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn search_adapter_failure_is_500() {
  let s = state_with(Some(Arc::new(DownEmbedder))).await;
  let (status, _) = send(&s, "GET", "/api/characters/search/?query=x", None).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ─── Teams ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn team_crud() {
  let s = state().await;
  let id = create_team(&s, "Rogue Squadron").await;

  let (status, body) = send(&s, "GET", &format!("/api/teams/{id}/"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["member_count"], 0);
  assert_eq!(body["average_evilness_score"], 0);
  assert_eq!(body["is_full"], false);

  let (status, body) = send(
    &s,
    "PUT",
    &format!("/api/teams/{id}/"),
    Some(json!({ "name": "Red Squadron", "owner": 3 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Red Squadron");
  assert_eq!(body["owner"], 3);

  let (status, body) = send(&s, "GET", "/api/teams/", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);

  let (status, _) = send(&s, "DELETE", &format!("/api/teams/{id}/"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, body) = send(&s, "GET", &format!("/api/teams/{id}/"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "Team not found.");
  let (status, _) = send(&s, "DELETE", &format!("/api/teams/{id}/"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn team_names_are_validated() {
  let s = state().await;
  create_team(&s, "Alpha").await;

  let (status, _) = send(&s, "POST", "/api/teams/", Some(json!({ "name": "Alpha" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(&s, "POST", "/api/teams/", Some(json!({ "name": "  " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send(&s, "POST", "/api/teams/", Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn add_member_returns_team_and_reports_derived_values() {
  let s = state().await;
  let team = create_team(&s, "Heroes").await;

  for id in [1, 2, 3] {
    let (status, _) = add(&s, team, id).await;
    assert_eq!(status, StatusCode::CREATED);
  }
  let (status, body) = add(&s, team, 5).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["message"], "Chewbacca added to team successfully.");

  let team_body = &body["team"];
  assert_eq!(team_body["member_count"], 4);
  // (10 + 20 + 90 + 5) / 4 = 31.25
  assert_eq!(team_body["average_evilness_score"], 31);
  assert_eq!(team_body["team_stats"]["species_distribution"]["Human"], 4);
  assert_eq!(team_body["members"][0]["character"]["name"], "Luke Skywalker");
}

#[tokio::test]
async fn average_evilness_of_three_members() {
  let s = state().await;
  let team = create_team(&s, "Mixed").await;
  add(&s, team, 1).await;
  add(&s, team, 2).await;
  add(&s, team, 3).await;
  let (_, body) = send(&s, "GET", &format!("/api/teams/{team}/"), None).await;
  assert_eq!(body["average_evilness_score"], 40);
}

#[tokio::test]
async fn add_member_rejections_carry_reasons() {
  let s = state().await;
  let team = create_team(&s, "Strict").await;

  let (status, body) = add(&s, team, 4).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Darth Vader is evil and cannot join the team.");

  add(&s, team, 1).await;
  let (status, body) = add(&s, team, 1).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Luke Skywalker is already a member of the team.");

  for id in [2, 3, 5, 6] {
    assert_eq!(add(&s, team, id).await.0, StatusCode::CREATED);
  }
  let (status, body) = add(&s, team, 7).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Team is full (5 members max).");

  let (_, detail) = send(&s, "GET", &format!("/api/teams/{team}/"), None).await;
  assert_eq!(detail["member_count"], 5);
  assert_eq!(detail["is_full"], true);
}

#[tokio::test]
async fn add_member_unknown_ids_are_404() {
  let s = state().await;
  let team = create_team(&s, "Lonely").await;

  let (status, body) = add(&s, team, 999).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "Character not found.");

  let (status, body) = add(&s, 999, 1).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "Team not found.");

  let (status, _) =
    send(&s, "POST", &format!("/api/teams/{team}/add-member/"), Some(json!({ "id": 1 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remove_member_signals_non_members() {
  let s = state().await;
  let team = create_team(&s, "Pair").await;
  add(&s, team, 1).await;

  let uri = format!("/api/teams/{team}/remove-member/");
  let (status, body) = send(&s, "POST", &uri, Some(json!({ "character_id": 2 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Leia Organa is not a member of this team.");

  let (status, body) = send(&s, "POST", &uri, Some(json!({ "character_id": 1 }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Luke Skywalker removed from team successfully.");
  assert_eq!(body["team"]["member_count"], 0);

  let (status, _) = send(&s, "POST", &uri, Some(json!({ "character_id": 999 }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
