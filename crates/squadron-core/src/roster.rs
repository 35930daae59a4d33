//! Team roster engine: capacity, evil-member exclusion and derived values.
//!
//! A [`Roster`] is a team together with its current members. It is a pure
//! value; stores load one inside a transaction, ask it whether a character
//! may join, and only then write the membership edge.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  character::Character,
  team::{MemberView, TEAM_CAPACITY, Team, TeamDetail, TeamMember, TeamStats, TeamSummary},
};

// ─── Eligibility ─────────────────────────────────────────────────────────────

/// Why a character may not join a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ineligibility {
  TeamFull { capacity: usize },
  Evil { name: String },
  AlreadyMember { name: String },
}

impl fmt::Display for Ineligibility {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TeamFull { capacity } => {
        write!(f, "Team is full ({capacity} members max).")
      }
      Self::Evil { name } => write!(f, "{name} is evil and cannot join the team."),
      Self::AlreadyMember { name } => {
        write!(f, "{name} is already a member of the team.")
      }
    }
  }
}

/// The `(eligible, reason)` answer of a pre-flight check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
  pub eligible: bool,
  pub reason:   String,
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// A broken roster invariant found by [`Roster::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
  OverCapacity { count: usize, capacity: usize },
  EvilMembers { names: Vec<String> },
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::OverCapacity { count, capacity } => write!(
        f,
        "Team cannot have more than {capacity} members. Current members: {count}"
      ),
      Self::EvilMembers { names } => {
        write!(f, "Team cannot contain evil members: {}", names.join(", "))
      }
    }
  }
}

// ─── Roster ──────────────────────────────────────────────────────────────────

/// A membership edge together with the member character.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
  pub membership: TeamMember,
  pub character:  Character,
}

/// A team and its members, ordered by `joined_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
  pub team:    Team,
  pub members: Vec<RosterEntry>,
}

impl Roster {
  pub fn new(team: Team, members: Vec<RosterEntry>) -> Self { Self { team, members } }

  pub fn member_count(&self) -> usize { self.members.len() }

  pub fn is_full(&self) -> bool { self.member_count() >= TEAM_CAPACITY }

  pub fn contains(&self, character_id: i64) -> bool {
    self.members.iter().any(|m| m.character.id == character_id)
  }

  /// Pre-flight check for adding `character`.
  ///
  /// Checked in order: capacity, evilness, existing membership.
  pub fn can_add(&self, character: &Character) -> Result<(), Ineligibility> {
    if self.is_full() {
      return Err(Ineligibility::TeamFull { capacity: TEAM_CAPACITY });
    }
    if character.is_evil {
      return Err(Ineligibility::Evil { name: character.name.clone() });
    }
    if self.contains(character.id) {
      return Err(Ineligibility::AlreadyMember { name: character.name.clone() });
    }
    Ok(())
  }

  pub fn eligibility(&self, character: &Character) -> Eligibility {
    match self.can_add(character) {
      Ok(()) => Eligibility {
        eligible: true,
        reason:   format!("{} can join the team.", character.name),
      },
      Err(why) => Eligibility { eligible: false, reason: why.to_string() },
    }
  }

  /// Audit the roster invariants. Not run on every mutation.
  pub fn validate(&self) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    if self.member_count() > TEAM_CAPACITY {
      violations.push(Violation::OverCapacity {
        count:    self.member_count(),
        capacity: TEAM_CAPACITY,
      });
    }

    let evil: Vec<String> = self
      .members
      .iter()
      .filter(|m| m.character.is_evil)
      .map(|m| m.character.name.clone())
      .collect();
    if !evil.is_empty() {
      violations.push(Violation::EvilMembers { names: evil });
    }

    if violations.is_empty() { Ok(()) } else { Err(violations) }
  }

  /// Mean member evilness, rounded half-to-even. An unclassified member
  /// counts as 0; an empty roster scores 0.
  pub fn average_evilness_score(&self) -> u32 {
    if self.members.is_empty() {
      return 0;
    }
    let total: u32 = self
      .members
      .iter()
      .map(|m| u32::from(m.character.evilness_score.unwrap_or(0)))
      .sum();
    (f64::from(total) / self.members.len() as f64).round_ties_even() as u32
  }

  pub fn stats(&self) -> TeamStats {
    let mut stats = TeamStats::default();
    for m in &self.members {
      let species = m.character.species.clone().unwrap_or_else(|| "Unknown".into());
      let homeworld = m.character.homeworld.clone().unwrap_or_else(|| "Unknown".into());
      *stats.species_distribution.entry(species).or_default() += 1;
      *stats.homeworld_distribution.entry(homeworld).or_default() += 1;
    }
    stats
  }

  pub fn summary(&self) -> TeamSummary {
    TeamSummary {
      id:           self.team.id,
      name:         self.team.name.clone(),
      owner:        self.team.owner,
      member_count: self.member_count(),
      is_full:      self.is_full(),
      created_at:   self.team.created_at,
    }
  }

  pub fn detail(&self) -> TeamDetail {
    TeamDetail {
      id:                     self.team.id,
      name:                   self.team.name.clone(),
      owner:                  self.team.owner,
      members:                self
        .members
        .iter()
        .map(|m| MemberView {
          id:        m.membership.id,
          character: m.character.summary(),
          joined_at: m.membership.joined_at,
        })
        .collect(),
      member_count:           self.member_count(),
      is_full:                self.is_full(),
      average_evilness_score: self.average_evilness_score(),
      team_stats:             self.stats(),
      created_at:             self.team.created_at,
      updated_at:             self.team.updated_at,
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
