//! Repository traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g.
//! `squadron-store-sqlite`). Higher layers (`squadron-api`,
//! `squadron-ingest`) depend on these abstractions, not on any concrete
//! backend.

use std::{collections::BTreeSet, future::Future};

use crate::{
  character::Character,
  roster::Roster,
  team::{NewTeam, Team, TeamMember},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A backend error that may wrap a domain-level [`crate::Error`].
///
/// Lets the HTTP layer tell "team is full" apart from "disk is full" without
/// knowing the concrete backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&crate::Error>;
}

// ─── Soft delete ─────────────────────────────────────────────────────────────

/// Explicit soft-delete scoping. There is no implicit default scope: callers
/// pick [`active`](Self::active) or
/// [`all_including_deleted`](Self::all_including_deleted).
pub trait SoftDeleteRepository<T>: Send + Sync {
  type Error: StoreError;

  /// Rows whose `is_deleted` flag is clear.
  fn active(&self) -> impl Future<Output = Result<Vec<T>, Self::Error>> + Send + '_;

  /// Every physical row, deleted or not.
  fn all_including_deleted(
    &self,
  ) -> impl Future<Output = Result<Vec<T>, Self::Error>> + Send + '_;

  /// Set the `is_deleted` flag. Returns `false` if no active row matched.
  fn soft_delete(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Physically remove the row. Returns `false` if no row matched.
  fn hard_delete(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Characters ──────────────────────────────────────────────────────────────

/// Parameters for [`CharacterStore::list_characters`].
#[derive(Debug, Clone, Default)]
pub struct CharacterQuery {
  /// Case-insensitive substring over name, species and homeworld.
  pub search:             Option<String>,
  pub name:               Option<String>,
  pub species:            Option<String>,
  pub homeworld:          Option<String>,
  pub is_evil:            Option<bool>,
  pub min_evilness_score: Option<u8>,
  pub max_evilness_score: Option<u8>,
  pub limit:              Option<usize>,
  pub offset:             Option<usize>,
}

/// One page of [`CharacterStore::list_characters`] results.
#[derive(Debug, Clone, Default)]
pub struct CharacterPage {
  /// Number of matching rows ignoring `limit`/`offset`.
  pub total: usize,
  pub items: Vec<Character>,
}

/// What [`CharacterStore::commit_reconciliation`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
  /// `true` if the character row did not exist before.
  pub created:         bool,
  pub masters_added:   usize,
  pub masters_removed: usize,
}

pub trait CharacterStore: Send + Sync {
  type Error: StoreError;

  /// An active character by id.
  fn get_character(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Character>, Self::Error>> + Send + '_;

  /// A character by id whether or not it is soft-deleted. Ingestion uses
  /// this so that a deleted row is refreshed rather than duplicated.
  fn get_character_any(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Character>, Self::Error>> + Send + '_;

  /// Active characters matching `query`, ordered by name.
  fn list_characters<'a>(
    &'a self,
    query: &'a CharacterQuery,
  ) -> impl Future<Output = Result<CharacterPage, Self::Error>> + Send + 'a;

  /// Master names of a character, sorted.
  fn masters_of(
    &self,
    character_id: i64,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Upsert `character` by id and replace its master set with `masters`,
  /// in one transaction.
  ///
  /// Only changed master names are written: names missing from `masters`
  /// are deleted, new names are inserted, common names are left alone.
  fn commit_reconciliation(
    &self,
    character: Character,
    masters: BTreeSet<String>,
  ) -> impl Future<Output = Result<Reconciliation, Self::Error>> + Send + '_;

  /// Active characters that carry an embedding.
  fn characters_with_embeddings(
    &self,
  ) -> impl Future<Output = Result<Vec<Character>, Self::Error>> + Send + '_;
}

// ─── Teams ───────────────────────────────────────────────────────────────────

pub trait TeamStore: Send + Sync {
  type Error: StoreError;

  /// Returns a `DuplicateTeamName` or `BlankTeamName` domain error on bad
  /// input.
  fn create_team(
    &self,
    input: NewTeam,
  ) -> impl Future<Output = Result<Team, Self::Error>> + Send + '_;

  /// An active team by id.
  fn get_team(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Team>, Self::Error>> + Send + '_;

  /// Rename / re-own an active team. Returns `None` if it does not exist.
  fn update_team(
    &self,
    id: i64,
    input: NewTeam,
  ) -> impl Future<Output = Result<Option<Team>, Self::Error>> + Send + '_;

  /// All active teams with their members, newest first.
  fn list_rosters(
    &self,
  ) -> impl Future<Output = Result<Vec<Roster>, Self::Error>> + Send + '_;

  /// An active team with its members. Returns `None` if it does not exist.
  fn roster(
    &self,
    team_id: i64,
  ) -> impl Future<Output = Result<Option<Roster>, Self::Error>> + Send + '_;

  /// Add `character_id` to the team after re-running the eligibility check.
  ///
  /// The check and the insert happen in one write-locking transaction, so
  /// concurrent adds can never push a team past its capacity. An ineligible
  /// character yields an `Ineligible` domain error and writes nothing.
  fn add_member(
    &self,
    team_id: i64,
    character_id: i64,
  ) -> impl Future<Output = Result<TeamMember, Self::Error>> + Send + '_;

  /// Remove `character_id` from the team.
  ///
  /// Returns `false` (not an error) if the character was not a member.
  fn remove_member(
    &self,
    team_id: i64,
    character_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
