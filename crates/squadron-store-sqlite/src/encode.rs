//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings with microsecond precision,
//! so they sort lexically. Affiliations are stored as a compact JSON array and
//! embeddings as a BLOB of little-endian `f32`s.
//!
//! The `*_from_row` decoders run inside `Connection::call` closures, so they
//! report failures as [`rusqlite::Error::FromSqlConversionFailure`].

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Row, types::Type};
use squadron_core::{
  character::Character,
  team::{Team, TeamMember},
};

use crate::Result;

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_dt(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
  let s: String = row.get(idx)?;
  DateTime::parse_from_rfc3339(&s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ─── Affiliations ────────────────────────────────────────────────────────────

pub fn encode_affiliations(affiliations: &[String]) -> Result<String> {
  Ok(serde_json::to_string(affiliations)?)
}

fn decode_affiliations(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
  let s: String = row.get(idx)?;
  serde_json::from_str(&s)
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ─── Embedding ───────────────────────────────────────────────────────────────

/// Encode an embedding as a BLOB. An empty vector is stored as `NULL`.
pub fn vec_to_blob(vec: &[f32]) -> Option<Vec<u8>> {
  if vec.is_empty() {
    return None;
  }
  Some(vec.iter().flat_map(|f| f.to_le_bytes()).collect())
}

pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
  blob
    .chunks_exact(4)
    .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    .collect()
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Column list matching [`character_from_row`]; expects the table alias `c`.
pub const CHARACTER_COLUMNS: &str = "c.id, c.name, c.height, c.mass, c.gender, \
   c.homeworld, c.species, c.image_url, c.affiliations, c.biography, c.is_evil, \
   c.evilness_score, c.evilness_explanation, c.embedding, c.is_deleted, \
   c.created_at, c.updated_at";

/// Decode a character whose columns start at `offset`.
pub fn character_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Character> {
  let embedding: Option<Vec<u8>> = row.get(offset + 13)?;
  Ok(Character {
    id:                   row.get(offset)?,
    name:                 row.get(offset + 1)?,
    height:               row.get(offset + 2)?,
    mass:                 row.get(offset + 3)?,
    gender:               row.get(offset + 4)?,
    homeworld:            row.get(offset + 5)?,
    species:              row.get(offset + 6)?,
    image_url:            row.get(offset + 7)?,
    affiliations:         decode_affiliations(row, offset + 8)?,
    biography:            row.get(offset + 9)?,
    is_evil:              row.get(offset + 10)?,
    evilness_score:       row.get(offset + 11)?,
    evilness_explanation: row.get(offset + 12)?,
    embedding:            embedding.as_deref().map(blob_to_vec).unwrap_or_default(),
    is_deleted:           row.get(offset + 14)?,
    created_at:           decode_dt(row, offset + 15)?,
    updated_at:           decode_dt(row, offset + 16)?,
  })
}

/// Column list matching [`team_from_row`]; expects the table alias `t`.
pub const TEAM_COLUMNS: &str =
  "t.id, t.name, t.owner, t.is_deleted, t.created_at, t.updated_at";

pub fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
  Ok(Team {
    id:         row.get(0)?,
    name:       row.get(1)?,
    owner:      row.get(2)?,
    is_deleted: row.get(3)?,
    created_at: decode_dt(row, 4)?,
    updated_at: decode_dt(row, 5)?,
  })
}

/// Column list matching [`member_from_row`]; expects the table alias `tm`.
/// The member's character columns follow at offset 4.
pub const MEMBER_COLUMNS: &str = "tm.id, tm.team_id, tm.character_id, tm.joined_at";

pub fn member_from_row(row: &Row<'_>) -> rusqlite::Result<TeamMember> {
  Ok(TeamMember {
    id:           row.get(0)?,
    team_id:      row.get(1)?,
    character_id: row.get(2)?,
    joined_at:    decode_dt(row, 3)?,
  })
}
