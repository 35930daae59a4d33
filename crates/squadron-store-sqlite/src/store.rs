//! [`SqliteStore`], the SQLite implementation of the Squadron repositories.

use std::{collections::BTreeSet, path::Path};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};

use squadron_core::{
  character::Character,
  masters::MasterDiff,
  roster::{Roster, RosterEntry},
  store::{
    CharacterPage, CharacterQuery, CharacterStore, Reconciliation, SoftDeleteRepository,
    TeamStore,
  },
  team::{NewTeam, Team, TeamMember},
};

use crate::{
  Error, Result,
  encode::{
    CHARACTER_COLUMNS, MEMBER_COLUMNS, TEAM_COLUMNS, character_from_row, encode_affiliations,
    encode_dt, member_from_row, team_from_row, vec_to_blob,
  },
  schema::SCHEMA,
};

/// Outcome of a closure that may reject its input on domain grounds after
/// the database work succeeded. A rejection rolls the transaction back.
type Checked<T> = std::result::Result<T, squadron_core::Error>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Squadron store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Shared queries ──────────────────────────────────────────────────────────
//
// Plain functions over a borrowed connection so they can run both directly
// and inside a transaction (which derefs to `Connection`).

fn load_character(
  conn: &Connection,
  id: i64,
  include_deleted: bool,
) -> rusqlite::Result<Option<Character>> {
  conn
    .query_row(
      &format!(
        "SELECT {CHARACTER_COLUMNS} FROM characters c
         WHERE c.id = ?1 AND (?2 OR c.is_deleted = 0)"
      ),
      params![id, include_deleted],
      |row| character_from_row(row, 0),
    )
    .optional()
}

fn load_characters(conn: &Connection, filter: &str) -> rusqlite::Result<Vec<Character>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {CHARACTER_COLUMNS} FROM characters c {filter} ORDER BY c.name"
  ))?;
  let rows = stmt.query_map([], |row| character_from_row(row, 0))?;
  rows.collect()
}

fn load_team(conn: &Connection, id: i64) -> rusqlite::Result<Option<Team>> {
  conn
    .query_row(
      &format!("SELECT {TEAM_COLUMNS} FROM teams t WHERE t.id = ?1 AND t.is_deleted = 0"),
      params![id],
      team_from_row,
    )
    .optional()
}

fn load_teams(conn: &Connection, filter: &str) -> rusqlite::Result<Vec<Team>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {TEAM_COLUMNS} FROM teams t {filter} ORDER BY t.created_at DESC, t.id DESC"
  ))?;
  let rows = stmt.query_map([], team_from_row)?;
  rows.collect()
}

fn load_members(conn: &Connection, team_id: i64) -> rusqlite::Result<Vec<RosterEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {MEMBER_COLUMNS}, {CHARACTER_COLUMNS}
     FROM team_members tm
     JOIN characters c ON c.id = tm.character_id
     WHERE tm.team_id = ?1 AND tm.is_deleted = 0
     ORDER BY tm.joined_at, tm.id"
  ))?;
  let rows = stmt.query_map(params![team_id], |row| {
    Ok(RosterEntry { membership: member_from_row(row)?, character: character_from_row(row, 4)? })
  })?;
  rows.collect()
}

fn load_roster(conn: &Connection, team_id: i64) -> rusqlite::Result<Option<Roster>> {
  let Some(team) = load_team(conn, team_id)? else {
    return Ok(None);
  };
  let members = load_members(conn, team_id)?;
  Ok(Some(Roster::new(team, members)))
}

/// Whether a team other than `except` already uses `name`, deleted or not.
fn team_name_taken(conn: &Connection, name: &str, except: Option<i64>) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM teams WHERE name = ?1 AND (?2 IS NULL OR id != ?2)",
        params![name, except],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

// ─── Characters ──────────────────────────────────────────────────────────────

/// `WHERE` clause shared by the count and page queries of
/// [`CharacterStore::list_characters`]. `LIKE` is case-insensitive for ASCII.
const CHARACTER_FILTER: &str = "WHERE c.is_deleted = 0
  AND (?1 IS NULL OR (c.name LIKE '%' || ?1 || '%'
                      OR c.species LIKE '%' || ?1 || '%'
                      OR c.homeworld LIKE '%' || ?1 || '%'))
  AND (?2 IS NULL OR c.name LIKE '%' || ?2 || '%')
  AND (?3 IS NULL OR c.species LIKE '%' || ?3 || '%')
  AND (?4 IS NULL OR c.homeworld LIKE '%' || ?4 || '%')
  AND (?5 IS NULL OR c.is_evil = ?5)
  AND (?6 IS NULL OR c.evilness_score >= ?6)
  AND (?7 IS NULL OR c.evilness_score <= ?7)";

impl CharacterStore for SqliteStore {
  type Error = Error;

  async fn get_character(&self, id: i64) -> Result<Option<Character>> {
    Ok(self.conn.call(move |conn| Ok(load_character(conn, id, false)?)).await?)
  }

  async fn get_character_any(&self, id: i64) -> Result<Option<Character>> {
    Ok(self.conn.call(move |conn| Ok(load_character(conn, id, true)?)).await?)
  }

  async fn list_characters<'a>(&'a self, query: &'a CharacterQuery) -> Result<CharacterPage> {
    let q = query.clone();
    let limit = q.limit.map_or(-1, |l| l as i64);
    let offset = q.offset.unwrap_or(0) as i64;

    let page = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM characters c {CHARACTER_FILTER}"),
          params![
            q.search,
            q.name,
            q.species,
            q.homeworld,
            q.is_evil,
            q.min_evilness_score,
            q.max_evilness_score
          ],
          |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {CHARACTER_COLUMNS} FROM characters c {CHARACTER_FILTER}
           ORDER BY c.name LIMIT ?8 OFFSET ?9"
        ))?;
        let items = stmt
          .query_map(
            params![
              q.search,
              q.name,
              q.species,
              q.homeworld,
              q.is_evil,
              q.min_evilness_score,
              q.max_evilness_score,
              limit,
              offset
            ],
            |row| character_from_row(row, 0),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(CharacterPage { total: total as usize, items })
      })
      .await?;

    Ok(page)
  }

  async fn masters_of(&self, character_id: i64) -> Result<Vec<String>> {
    let names = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT master_name FROM masters
           WHERE character_id = ?1 AND is_deleted = 0
           ORDER BY master_name",
        )?;
        let rows = stmt.query_map(params![character_id], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
      })
      .await?;
    Ok(names)
  }

  async fn commit_reconciliation(
    &self,
    character: Character,
    masters: BTreeSet<String>,
  ) -> Result<Reconciliation> {
    let affiliations = encode_affiliations(&character.affiliations)?;
    let embedding = vec_to_blob(&character.embedding);
    // A blank biography is stored as NULL so a later sync can still fill it.
    let biography = character.biography.clone().filter(|b| !b.trim().is_empty());
    let created_at = encode_dt(character.created_at);
    let updated_at = encode_dt(character.updated_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created = tx
          .query_row("SELECT 1 FROM characters WHERE id = ?1", params![character.id], |_| {
            Ok(())
          })
          .optional()?
          .is_none();

        // Plain attributes are last-write-wins. AI-derived attributes are
        // only filled in where still absent; the evilness triple moves as a
        // unit. The soft-delete flag and `created_at` are never touched by
        // a sync.
        tx.execute(
          "INSERT INTO characters (
             id, name, height, mass, gender, homeworld, species, image_url,
             affiliations, biography, is_evil, evilness_score,
             evilness_explanation, embedding, is_deleted, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
           ON CONFLICT(id) DO UPDATE SET
             name         = excluded.name,
             height       = excluded.height,
             mass         = excluded.mass,
             gender       = excluded.gender,
             homeworld    = excluded.homeworld,
             species      = excluded.species,
             image_url    = excluded.image_url,
             affiliations = excluded.affiliations,
             biography    = COALESCE(characters.biography, excluded.biography),
             is_evil      = CASE WHEN characters.evilness_score IS NULL
                                 THEN excluded.is_evil ELSE characters.is_evil END,
             evilness_explanation = CASE WHEN characters.evilness_score IS NULL
                                 THEN excluded.evilness_explanation
                                 ELSE characters.evilness_explanation END,
             evilness_score = COALESCE(characters.evilness_score, excluded.evilness_score),
             embedding    = COALESCE(characters.embedding, excluded.embedding),
             updated_at   = excluded.updated_at",
          params![
            character.id,
            character.name,
            character.height,
            character.mass,
            character.gender,
            character.homeworld,
            character.species,
            character.image_url,
            affiliations,
            biography,
            character.is_evil,
            character.evilness_score,
            character.evilness_explanation,
            embedding,
            character.is_deleted,
            created_at,
            updated_at,
          ],
        )?;

        let existing: BTreeSet<String> = {
          let mut stmt = tx.prepare("SELECT master_name FROM masters WHERE character_id = ?1")?;
          let rows = stmt.query_map(params![character.id], |row| row.get(0))?;
          rows.collect::<rusqlite::Result<_>>()?
        };
        let diff = MasterDiff::compute(&existing, &masters);

        {
          let mut delete =
            tx.prepare("DELETE FROM masters WHERE character_id = ?1 AND master_name = ?2")?;
          for name in &diff.to_remove {
            delete.execute(params![character.id, name])?;
          }
          let mut insert =
            tx.prepare("INSERT INTO masters (character_id, master_name) VALUES (?1, ?2)")?;
          for name in &diff.to_add {
            insert.execute(params![character.id, name])?;
          }
        }

        tx.commit()?;

        Ok(Reconciliation {
          created,
          masters_added: diff.to_add.len(),
          masters_removed: diff.to_remove.len(),
        })
      })
      .await?;

    Ok(outcome)
  }

  async fn characters_with_embeddings(&self) -> Result<Vec<Character>> {
    Ok(
      self
        .conn
        .call(|conn| {
          Ok(load_characters(conn, "WHERE c.is_deleted = 0 AND c.embedding IS NOT NULL")?)
        })
        .await?,
    )
  }
}

impl SoftDeleteRepository<Character> for SqliteStore {
  type Error = Error;

  async fn active(&self) -> Result<Vec<Character>> {
    Ok(self.conn.call(|conn| Ok(load_characters(conn, "WHERE c.is_deleted = 0")?)).await?)
  }

  async fn all_including_deleted(&self) -> Result<Vec<Character>> {
    Ok(self.conn.call(|conn| Ok(load_characters(conn, "")?)).await?)
  }

  async fn soft_delete(&self, id: i64) -> Result<bool> {
    let now = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE characters SET is_deleted = 1, updated_at = ?2
           WHERE id = ?1 AND is_deleted = 0",
          params![id, now],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn hard_delete(&self, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM characters WHERE id = ?1", params![id])?))
      .await?;
    Ok(changed > 0)
  }
}

// ─── Teams ───────────────────────────────────────────────────────────────────

impl TeamStore for SqliteStore {
  type Error = Error;

  async fn create_team(&self, input: NewTeam) -> Result<Team> {
    let input = input.normalized()?;
    let now = Utc::now();
    let now_str = encode_dt(now);

    let outcome: Checked<Team> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if team_name_taken(&tx, &input.name, None)? {
          return Ok(Err(squadron_core::Error::DuplicateTeamName(input.name)));
        }
        tx.execute(
          "INSERT INTO teams (name, owner, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
          params![input.name, input.owner, now_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Ok(Team {
          id,
          name: input.name,
          owner: input.owner,
          is_deleted: false,
          created_at: now,
          updated_at: now,
        }))
      })
      .await?;

    let team = outcome?;
    tracing::debug!(team_id = team.id, name = %team.name, "created team");
    Ok(team)
  }

  async fn get_team(&self, id: i64) -> Result<Option<Team>> {
    Ok(self.conn.call(move |conn| Ok(load_team(conn, id)?)).await?)
  }

  async fn update_team(&self, id: i64, input: NewTeam) -> Result<Option<Team>> {
    let input = input.normalized()?;
    let now_str = encode_dt(Utc::now());

    let outcome: Checked<Option<Team>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if load_team(&tx, id)?.is_none() {
          return Ok(Ok(None));
        }
        if team_name_taken(&tx, &input.name, Some(id))? {
          return Ok(Err(squadron_core::Error::DuplicateTeamName(input.name)));
        }
        tx.execute(
          "UPDATE teams SET name = ?2, owner = ?3, updated_at = ?4 WHERE id = ?1",
          params![id, input.name, input.owner, now_str],
        )?;
        let team = load_team(&tx, id)?;
        tx.commit()?;
        Ok(Ok(team))
      })
      .await?;

    Ok(outcome?)
  }

  async fn list_rosters(&self) -> Result<Vec<Roster>> {
    let rosters = self
      .conn
      .call(|conn| {
        let teams = load_teams(conn, "WHERE t.is_deleted = 0")?;
        let mut rosters = Vec::with_capacity(teams.len());
        for team in teams {
          let members = load_members(conn, team.id)?;
          rosters.push(Roster::new(team, members));
        }
        Ok(rosters)
      })
      .await?;
    Ok(rosters)
  }

  async fn roster(&self, team_id: i64) -> Result<Option<Roster>> {
    Ok(self.conn.call(move |conn| Ok(load_roster(conn, team_id)?)).await?)
  }

  async fn add_member(&self, team_id: i64, character_id: i64) -> Result<TeamMember> {
    let joined_at = Utc::now();
    let joined_at_str = encode_dt(joined_at);

    // The write lock is taken before the roster is read, so no other add can
    // slip in between the capacity check and the insert.
    let outcome: Checked<TeamMember> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(roster) = load_roster(&tx, team_id)? else {
          return Ok(Err(squadron_core::Error::TeamNotFound(team_id)));
        };
        let Some(character) = load_character(&tx, character_id, false)? else {
          return Ok(Err(squadron_core::Error::CharacterNotFound(character_id)));
        };
        if let Err(why) = roster.can_add(&character) {
          return Ok(Err(squadron_core::Error::Ineligible(why)));
        }

        tx.execute(
          "INSERT INTO team_members (team_id, character_id, joined_at) VALUES (?1, ?2, ?3)",
          params![team_id, character_id, joined_at_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Ok(TeamMember { id, team_id, character_id, joined_at }))
      })
      .await?;

    let member = outcome?;
    tracing::debug!(team_id, character_id, "added team member");
    Ok(member)
  }

  async fn remove_member(&self, team_id: i64, character_id: i64) -> Result<bool> {
    let outcome: Checked<bool> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if load_team(&tx, team_id)?.is_none() {
          return Ok(Err(squadron_core::Error::TeamNotFound(team_id)));
        }
        if load_character(&tx, character_id, false)?.is_none() {
          return Ok(Err(squadron_core::Error::CharacterNotFound(character_id)));
        }
        let removed = tx.execute(
          "DELETE FROM team_members WHERE team_id = ?1 AND character_id = ?2",
          params![team_id, character_id],
        )?;
        tx.commit()?;
        Ok(Ok(removed > 0))
      })
      .await?;

    Ok(outcome?)
  }
}

impl SoftDeleteRepository<Team> for SqliteStore {
  type Error = Error;

  async fn active(&self) -> Result<Vec<Team>> {
    Ok(self.conn.call(|conn| Ok(load_teams(conn, "WHERE t.is_deleted = 0")?)).await?)
  }

  async fn all_including_deleted(&self) -> Result<Vec<Team>> {
    Ok(self.conn.call(|conn| Ok(load_teams(conn, "")?)).await?)
  }

  async fn soft_delete(&self, id: i64) -> Result<bool> {
    let now = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE teams SET is_deleted = 1, updated_at = ?2 WHERE id = ?1 AND is_deleted = 0",
          params![id, now],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn hard_delete(&self, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM teams WHERE id = ?1", params![id])?))
      .await?;
    Ok(changed > 0)
  }
}
