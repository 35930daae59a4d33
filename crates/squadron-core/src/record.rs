//! Mapping from the loosely-typed external payload to a typed record.
//!
//! Every field is read explicitly with its own default; nothing from the
//! payload reaches the domain model without passing through
//! [`CharacterRecord::from_payload`].

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Keys the mapping understands. Anything else is "unknown".
const KNOWN_FIELDS: &[&str] = &[
  "id",
  "name",
  "height",
  "mass",
  "gender",
  "homeworld",
  "species",
  "image",
  "affiliations",
  "masters",
];

/// What to do with payload keys the mapping does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldPolicy {
  /// Ignore them (they are reported in [`CharacterRecord::ignored_fields`]).
  #[default]
  Lenient,
  /// Reject the whole record with [`Error::UnknownField`].
  Strict,
}

/// One external character record after field-by-field mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterRecord {
  pub id:             i64,
  pub name:           String,
  pub height:         Option<f64>,
  pub mass:           Option<f64>,
  pub gender:         Option<String>,
  pub homeworld:      Option<String>,
  pub species:        Option<String>,
  pub image_url:      Option<String>,
  pub affiliations:   Vec<String>,
  /// The raw `masters` value: a string, a list of strings, or absent.
  pub masters:        Value,
  /// Unknown keys skipped under [`FieldPolicy::Lenient`], sorted.
  pub ignored_fields: Vec<String>,
}

impl CharacterRecord {
  pub fn from_payload(payload: &Value, policy: FieldPolicy) -> Result<Self> {
    let obj = payload.as_object().ok_or_else(|| Error::InvalidField {
      field:  "<record>".into(),
      reason: "expected a JSON object".into(),
    })?;

    let mut ignored_fields: Vec<String> = obj
      .keys()
      .filter(|k| !KNOWN_FIELDS.contains(&k.as_str()))
      .cloned()
      .collect();
    ignored_fields.sort();

    if policy == FieldPolicy::Strict
      && let Some(first) = ignored_fields.first()
    {
      return Err(Error::UnknownField(first.clone()));
    }

    Ok(Self {
      id: required_id(obj)?,
      name: required_name(obj)?,
      height: obj.get("height").and_then(parse_lenient_float),
      mass: obj.get("mass").and_then(parse_lenient_float),
      gender: optional_text(obj, "gender"),
      homeworld: optional_text(obj, "homeworld"),
      species: optional_text(obj, "species"),
      image_url: optional_text(obj, "image"),
      affiliations: text_list(obj, "affiliations"),
      masters: obj.get("masters").cloned().unwrap_or(Value::Null),
      ignored_fields,
    })
  }
}

fn required_id(obj: &Map<String, Value>) -> Result<i64> {
  match obj.get("id") {
    None | Some(Value::Null) => Err(Error::MissingField("id")),
    Some(v) => v.as_i64().ok_or_else(|| Error::InvalidField {
      field:  "id".into(),
      reason: format!("expected an integer, got {v}"),
    }),
  }
}

fn required_name(obj: &Map<String, Value>) -> Result<String> {
  match obj.get("name") {
    None | Some(Value::Null) => Err(Error::MissingField("name")),
    Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_owned()),
    Some(v) => Err(Error::InvalidField {
      field:  "name".into(),
      reason: format!("expected a non-empty string, got {v}"),
    }),
  }
}

/// A free-text attribute. The upstream data occasionally lists several
/// values (e.g. two homeworlds); the first one wins.
fn optional_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
  let text = match obj.get(key)? {
    Value::String(s) => s.as_str(),
    Value::Array(items) => items.iter().find_map(Value::as_str)?,
    _ => return None,
  };
  let text = text.trim();
  (!text.is_empty()).then(|| text.to_owned())
}

fn text_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
  match obj.get(key) {
    Some(Value::Array(items)) => items
      .iter()
      .filter_map(Value::as_str)
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_owned)
      .collect(),
    Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_owned()],
    _ => Vec::new(),
  }
}

/// Permissive numeric conversion; never fails.
///
/// `null`, `"unknown"` and `""` are absent. Strings use `,` as the decimal
/// separator. Anything unparseable, and any non-finite result, is absent.
pub fn parse_lenient_float(value: &Value) -> Option<f64> {
  let parsed = match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => {
      let s = s.trim();
      if s.is_empty() || s.eq_ignore_ascii_case("unknown") {
        return None;
      }
      s.replace(',', ".").parse::<f64>().ok()
    }
    _ => None,
  };
  parsed.filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn lenient_float_accepts_comma_decimal() {
    assert_eq!(parse_lenient_float(&json!("1,75")), Some(1.75));
    assert_eq!(parse_lenient_float(&json!("1.75")), Some(1.75));
    assert_eq!(parse_lenient_float(&json!(172)), Some(172.0));
    assert_eq!(parse_lenient_float(&json!(0.5)), Some(0.5));
  }

  #[test]
  fn lenient_float_absent_values() {
    assert_eq!(parse_lenient_float(&json!("unknown")), None);
    assert_eq!(parse_lenient_float(&Value::Null), None);
    assert_eq!(parse_lenient_float(&json!("")), None);
    assert_eq!(parse_lenient_float(&json!("abc")), None);
    assert_eq!(parse_lenient_float(&json!("NaN")), None);
    assert_eq!(parse_lenient_float(&json!(true)), None);
    assert_eq!(parse_lenient_float(&json!([1])), None);
  }

  fn yoda() -> Value {
    json!({
      "id": 20,
      "name": "Yoda",
      "height": 0.66,
      "mass": "17",
      "gender": "male",
      "homeworld": null,
      "species": "yoda's species",
      "image": "https://example.org/yoda.png",
      "affiliations": ["Jedi Order", "Galactic Republic", 7],
      "masters": "N'Kata Del Gormo",
      "wiki": "https://example.org/wiki/Yoda",
      "born": -896
    })
  }

  #[test]
  fn maps_known_fields() {
    let r = CharacterRecord::from_payload(&yoda(), FieldPolicy::Lenient).unwrap();
    assert_eq!(r.id, 20);
    assert_eq!(r.name, "Yoda");
    assert_eq!(r.height, Some(0.66));
    assert_eq!(r.mass, Some(17.0));
    assert_eq!(r.homeworld, None);
    assert_eq!(r.image_url.as_deref(), Some("https://example.org/yoda.png"));
    assert_eq!(r.affiliations, ["Jedi Order", "Galactic Republic"]);
    assert_eq!(r.masters, json!("N'Kata Del Gormo"));
    assert_eq!(r.ignored_fields, ["born", "wiki"]);
  }

  #[test]
  fn strict_policy_rejects_unknown_fields() {
    let err = CharacterRecord::from_payload(&yoda(), FieldPolicy::Strict).unwrap_err();
    assert!(matches!(err, Error::UnknownField(ref f) if f == "born"));
  }

  #[test]
  fn homeworld_list_takes_first_entry() {
    let r = CharacterRecord::from_payload(
      &json!({ "id": 1, "name": "Padmé", "homeworld": ["naboo", "coruscant"] }),
      FieldPolicy::Strict,
    )
    .unwrap();
    assert_eq!(r.homeworld.as_deref(), Some("naboo"));
  }

  #[test]
  fn missing_or_bad_identity_is_rejected() {
    let err = CharacterRecord::from_payload(&json!({ "name": "X" }), FieldPolicy::Lenient)
      .unwrap_err();
    assert!(matches!(err, Error::MissingField("id")));

    let err = CharacterRecord::from_payload(&json!({ "id": "7", "name": "X" }), FieldPolicy::Lenient)
      .unwrap_err();
    assert!(matches!(err, Error::InvalidField { ref field, .. } if field == "id"));

    let err = CharacterRecord::from_payload(&json!({ "id": 7, "name": "  " }), FieldPolicy::Lenient)
      .unwrap_err();
    assert!(matches!(err, Error::InvalidField { ref field, .. } if field == "name"));

    let err = CharacterRecord::from_payload(&json!([1, 2]), FieldPolicy::Lenient).unwrap_err();
    assert!(matches!(err, Error::InvalidField { .. }));
  }
}
