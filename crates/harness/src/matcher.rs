//! Matcher evaluation against a flattened row. A matcher is a small map of
//! field -> expected value; a row matches when every field in the matcher
//! agrees. `*_like` fields wildcard-match the field with the suffix
//! stripped (`target_literal_like` matches against `target_literal`);
//! `*_contains` fields substring-match; an `any` value matches any row that
//! has the field at all; everything else is case-insensitive equality.

use std::collections::BTreeMap;

use crate::fixture::Matcher;

pub type Row = BTreeMap<String, serde_json::Value>;

pub fn row_matches(matcher: &Matcher, row: &Row) -> bool {
  matcher.iter().all(|(key, expected)| field_matches(key, expected, row))
}

fn field_matches(key: &str, expected: &serde_yaml::Value, row: &Row) -> bool {
  let expected_str = yaml_scalar_to_string(expected);

  if expected_str.as_deref() == Some("any") {
    let base = key.strip_suffix("_like").unwrap_or(key);
    return row.contains_key(base);
  }

  if let Some(base) = key.strip_suffix("_like") {
    let Some(pattern) = expected_str else { return false };
    let Some(actual) = row.get(base).and_then(json_scalar_to_string) else {
      return false;
    };
    return wildcard_match(&pattern, &actual);
  }

  if let Some(base) = key.strip_suffix("_contains") {
    let Some(needle) = expected_str else { return false };
    let Some(actual) = row.get(base).and_then(json_scalar_to_string) else {
      return false;
    };
    return actual.to_lowercase().contains(&needle.to_lowercase());
  }

  let Some(actual) = row.get(key).and_then(json_scalar_to_string) else {
    return false;
  };
  match expected_str {
    Some(expected_str) => actual.eq_ignore_ascii_case(&expected_str),
    None => false,
  }
}

/// `%` at the start and/or end means prefix/suffix/contains wildcard;
/// no `%` at all means exact (case-insensitive) equality.
fn wildcard_match(pattern: &str, actual: &str) -> bool {
  let actual = actual.to_lowercase();
  let starts = pattern.starts_with('%');
  let ends = pattern.ends_with('%');
  let core = pattern.trim_matches('%').to_lowercase();

  match (starts, ends) {
    (true, true) => actual.contains(&core),
    (true, false) => actual.ends_with(&core),
    (false, true) => actual.starts_with(&core),
    (false, false) => actual == core,
  }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
  match value {
    serde_yaml::Value::String(s) => Some(s.clone()),
    serde_yaml::Value::Bool(b) => Some(b.to_string()),
    serde_yaml::Value::Number(n) => Some(n.to_string()),
    serde_yaml::Value::Null => None,
    _ => None,
  }
}

fn json_scalar_to_string(value: &serde_json::Value) -> Option<String> {
  match value {
    serde_json::Value::String(s) => Some(s.clone()),
    serde_json::Value::Bool(b) => Some(b.to_string()),
    serde_json::Value::Number(n) => Some(n.to_string()),
    serde_json::Value::Null => None,
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(pairs: &[(&str, &str)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string()))).collect()
  }

  #[test]
  fn exact_match_is_case_insensitive() {
    let mut m = Matcher::new();
    m.insert("name".to_owned(), serde_yaml::Value::String("Tyler".to_owned()));
    assert!(row_matches(&m, &row(&[("name", "tyler")])));
  }

  #[test]
  fn like_suffix_matches_contains_wildcard() {
    let mut m = Matcher::new();
    m.insert(
      "target_literal_like".to_owned(),
      serde_yaml::Value::String("%anthropic%".to_owned()),
    );
    assert!(row_matches(&m, &row(&[("target_literal", "Works at Anthropic Inc")])));
    assert!(!row_matches(&m, &row(&[("target_literal", "Works at Intent")])));
  }

  #[test]
  fn any_wildcard_only_checks_presence() {
    let mut m = Matcher::new();
    m.insert("entity_type".to_owned(), serde_yaml::Value::String("any".to_owned()));
    assert!(row_matches(&m, &row(&[("entity_type", "person")])));
    assert!(!row_matches(&m, &row(&[("name", "Tyler")])));
  }
}
