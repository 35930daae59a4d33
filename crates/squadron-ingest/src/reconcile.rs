//! Reconciliation of one external record with the store.

use chrono::Utc;
use serde_json::Value;
use squadron_core::{
  character::Character,
  masters::normalize_masters,
  record::{CharacterRecord, FieldPolicy},
  store::CharacterStore,
};

use crate::{Error, Result, steps::StepContext, steps::Steps};

/// What reconciling one record did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
  pub id:              i64,
  pub name:            String,
  pub created:         bool,
  pub masters_added:   usize,
  pub masters_removed: usize,
}

/// Upsert one external record, enrich it and replace its masters.
///
/// Enrichment runs on the in-memory value first; the row and its master diff
/// are then written in one transaction, so a failure anywhere leaves the
/// stored character exactly as it was.
pub async fn reconcile<S: CharacterStore>(
  store: &S,
  steps: &Steps,
  payload: &Value,
  policy: FieldPolicy,
) -> Result<ReconcileOutcome> {
  let record = CharacterRecord::from_payload(payload, policy)?;
  if !record.ignored_fields.is_empty() {
    tracing::debug!(
      character = %record.name,
      fields = ?record.ignored_fields,
      "ignoring unknown record fields"
    );
  }

  let masters = normalize_masters(&record.masters);
  let master_list: Vec<String> = masters.iter().cloned().collect();

  let existing = store
    .get_character_any(record.id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  let mut character = Character::from_record(&record, existing.as_ref(), Utc::now());

  let ctx = StepContext { record: &record, masters: &master_list };
  for step in steps.iter() {
    match step.apply(&ctx, &character).await {
      Ok(Some(next)) => character = next,
      Ok(None) => {}
      Err(e) => tracing::warn!(
        character = %record.name,
        step = step.name(),
        error = %e,
        "enrichment step failed; keeping previous value"
      ),
    }
  }

  let name = character.name.clone();
  let reconciliation = store
    .commit_reconciliation(character, masters)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  Ok(ReconcileOutcome {
    id: record.id,
    name,
    created: reconciliation.created,
    masters_added: reconciliation.masters_added,
    masters_removed: reconciliation.masters_removed,
  })
}
