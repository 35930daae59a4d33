//! Character: the catalog entity synced from the external source.
//!
//! Plain attributes are owned by the external source and overwritten on every
//! sync. AI-derived attributes are owned by the enrichment steps and are only
//! ever filled in, never replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::CharacterRecord;

// ─── Character ───────────────────────────────────────────────────────────────

/// A catalog character, keyed by the external source's numeric id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
  /// External id; stable across syncs and never generated locally.
  pub id:                   i64,
  pub name:                 String,
  pub height:               Option<f64>,
  pub mass:                 Option<f64>,
  pub gender:               Option<String>,
  pub homeworld:            Option<String>,
  pub species:              Option<String>,
  pub image_url:            Option<String>,
  pub affiliations:         Vec<String>,
  pub biography:            Option<String>,
  pub is_evil:              bool,
  /// 0 (good) to 100 (evil). `None` until classified.
  pub evilness_score:       Option<u8>,
  pub evilness_explanation: Option<String>,
  #[serde(skip)]
  pub embedding:            Vec<f32>,
  pub is_deleted:           bool,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

impl Character {
  /// Build the next state of a character from a freshly mapped record.
  ///
  /// Plain attributes come from `record` (last write wins). AI-derived
  /// fields, the soft-delete flag and `created_at` are carried over from
  /// `existing` when there is one.
  pub fn from_record(
    record: &CharacterRecord,
    existing: Option<&Character>,
    now: DateTime<Utc>,
  ) -> Self {
    let mut next = Self {
      id:                   record.id,
      name:                 record.name.clone(),
      height:               record.height,
      mass:                 record.mass,
      gender:               record.gender.clone(),
      homeworld:            record.homeworld.clone(),
      species:              record.species.clone(),
      image_url:            record.image_url.clone(),
      affiliations:         record.affiliations.clone(),
      biography:            None,
      is_evil:              false,
      evilness_score:       None,
      evilness_explanation: None,
      embedding:            Vec::new(),
      is_deleted:           false,
      created_at:           now,
      updated_at:           now,
    };

    if let Some(prev) = existing {
      next.biography = prev.biography.clone();
      next.is_evil = prev.is_evil;
      next.evilness_score = prev.evilness_score;
      next.evilness_explanation = prev.evilness_explanation.clone();
      next.embedding = prev.embedding.clone();
      next.is_deleted = prev.is_deleted;
      next.created_at = prev.created_at;
    }

    next
  }

  /// Whether the evilness classification has already run.
  pub fn is_classified(&self) -> bool { self.evilness_score.is_some() }

  pub fn has_biography(&self) -> bool {
    self.biography.as_deref().is_some_and(|b| !b.trim().is_empty())
  }

  pub fn has_embedding(&self) -> bool { !self.embedding.is_empty() }

  pub fn summary(&self) -> CharacterSummary {
    CharacterSummary {
      id:             self.id,
      name:           self.name.clone(),
      image_url:      self.image_url.clone(),
      species:        self.species.clone(),
      homeworld:      self.homeworld.clone(),
      is_evil:        self.is_evil,
      evilness_score: self.evilness_score,
    }
  }

  pub fn detail(&self, masters: Vec<String>) -> CharacterDetail {
    CharacterDetail {
      id: self.id,
      name: self.name.clone(),
      height: self.height,
      mass: self.mass,
      gender: self.gender.clone(),
      homeworld: self.homeworld.clone(),
      species: self.species.clone(),
      image_url: self.image_url.clone(),
      affiliations: self.affiliations.clone(),
      masters,
      biography: self.biography.clone(),
      is_evil: self.is_evil,
      evilness_score: self.evilness_score,
      evilness_explanation: self.evilness_explanation.clone(),
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

// ─── Master ──────────────────────────────────────────────────────────────────

/// A master-apprentice edge owned by the apprentice.
/// `(character_id, master_name)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Master {
  pub id:           i64,
  pub character_id: i64,
  pub master_name:  String,
  pub is_deleted:   bool,
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// The list projection of a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSummary {
  pub id:             i64,
  pub name:           String,
  pub image_url:      Option<String>,
  pub species:        Option<String>,
  pub homeworld:      Option<String>,
  pub is_evil:        bool,
  pub evilness_score: Option<u8>,
}

/// The detail projection of a character, including its masters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDetail {
  pub id:                   i64,
  pub name:                 String,
  pub height:               Option<f64>,
  pub mass:                 Option<f64>,
  pub gender:               Option<String>,
  pub homeworld:            Option<String>,
  pub species:              Option<String>,
  pub image_url:            Option<String>,
  pub affiliations:         Vec<String>,
  pub masters:              Vec<String>,
  pub biography:            Option<String>,
  pub is_evil:              bool,
  pub evilness_score:       Option<u8>,
  pub evilness_explanation: Option<String>,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;
  use crate::record::FieldPolicy;

  fn record(name: &str) -> CharacterRecord {
    CharacterRecord::from_payload(
      &json!({ "id": 1, "name": name, "species": "human", "height": "1,72" }),
      FieldPolicy::Lenient,
    )
    .unwrap()
  }

  #[test]
  fn new_character_has_empty_ai_fields() {
    let now = Utc.timestamp_opt(1_000, 0).unwrap();
    let c = Character::from_record(&record("Luke Skywalker"), None, now);

    assert_eq!(c.id, 1);
    assert_eq!(c.height, Some(1.72));
    assert!(!c.is_classified());
    assert!(!c.has_biography());
    assert!(!c.has_embedding());
    assert_eq!(c.created_at, now);
  }

  #[test]
  fn refresh_overwrites_plain_fields_and_keeps_ai_fields() {
    let t0 = Utc.timestamp_opt(1_000, 0).unwrap();
    let t1 = Utc.timestamp_opt(2_000, 0).unwrap();

    let mut prev = Character::from_record(&record("Luke"), None, t0);
    prev.biography = Some("A farm boy.".into());
    prev.evilness_score = Some(5);
    prev.embedding = vec![0.1, 0.2];
    prev.is_deleted = true;

    let next = Character::from_record(&record("Luke Skywalker"), Some(&prev), t1);

    assert_eq!(next.name, "Luke Skywalker");
    assert_eq!(next.biography.as_deref(), Some("A farm boy."));
    assert_eq!(next.evilness_score, Some(5));
    assert_eq!(next.embedding, vec![0.1, 0.2]);
    assert!(next.is_deleted);
    assert_eq!(next.created_at, t0);
    assert_eq!(next.updated_at, t1);
  }
}
