//! Teams and their membership edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, character::CharacterSummary};

/// Maximum number of members a team may hold.
pub const TEAM_CAPACITY: usize = 5;

/// A named roster of characters, optionally owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
  pub id:         i64,
  pub name:       String,
  /// Opaque id of the owning user; `None` for anonymous teams.
  pub owner:      Option<i64>,
  pub is_deleted: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// The join edge between a team and a character.
/// `(team_id, character_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
  pub id:           i64,
  pub team_id:      i64,
  pub character_id: i64,
  pub joined_at:    DateTime<Utc>,
}

/// Input to [`crate::store::TeamStore::create_team`] and
/// [`crate::store::TeamStore::update_team`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTeam {
  pub name:  String,
  #[serde(default)]
  pub owner: Option<i64>,
}

impl NewTeam {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), owner: None }
  }

  /// Trim the name and reject a blank one.
  pub fn normalized(self) -> Result<Self> {
    let name = self.name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::BlankTeamName);
    }
    Ok(Self { name, owner: self.owner })
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// The list projection of a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
  pub id:           i64,
  pub name:         String,
  pub owner:        Option<i64>,
  pub member_count: usize,
  pub is_full:      bool,
  pub created_at:   DateTime<Utc>,
}

/// One member as shown in a team's detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberView {
  pub id:        i64,
  pub character: CharacterSummary,
  pub joined_at: DateTime<Utc>,
}

/// Species and homeworld distribution across a roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStats {
  pub species_distribution:   std::collections::BTreeMap<String, usize>,
  pub homeworld_distribution: std::collections::BTreeMap<String, usize>,
}

/// The detail projection of a team, with derived values computed on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDetail {
  pub id:                     i64,
  pub name:                   String,
  pub owner:                  Option<i64>,
  pub members:                Vec<MemberView>,
  pub member_count:           usize,
  pub is_full:                bool,
  pub average_evilness_score: u32,
  pub team_stats:             TeamStats,
  pub created_at:             DateTime<Utc>,
  pub updated_at:             DateTime<Utc>,
}
