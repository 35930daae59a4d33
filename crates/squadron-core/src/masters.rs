//! Master-list normalisation and set-difference diffing.
//!
//! The stored master rows for a character are replaced by the freshly parsed
//! list on every sync, but only the rows that actually change are touched.

use std::collections::BTreeSet;

use serde_json::Value;

/// Normalise the raw `masters` value into a deduplicated set.
///
/// A single string is a one-element list. Entries are trimmed; empty,
/// `null` and non-string entries are dropped.
pub fn normalize_masters(raw: &Value) -> BTreeSet<String> {
  let items: Vec<&Value> = match raw {
    Value::Array(items) => items.iter().collect(),
    other => vec![other],
  };

  items
    .into_iter()
    .filter_map(Value::as_str)
    .map(str::trim)
    .filter(|name| !name.is_empty())
    .map(str::to_owned)
    .collect()
}

/// The row changes that turn `existing` into `incoming`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterDiff {
  pub to_add:    BTreeSet<String>,
  pub to_remove: BTreeSet<String>,
}

impl MasterDiff {
  pub fn compute(existing: &BTreeSet<String>, incoming: &BTreeSet<String>) -> Self {
    Self {
      to_add:    incoming.difference(existing).cloned().collect(),
      to_remove: existing.difference(incoming).cloned().collect(),
    }
  }

  pub fn is_empty(&self) -> bool { self.to_add.is_empty() && self.to_remove.is_empty() }
}
