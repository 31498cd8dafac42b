//! C2: pure, total, idempotent normalization of alias surface forms.
//!
//! `normalize(normalize(x, t), t) == normalize(x, t)` for every alias type
//! `t` and every input `x` — each branch below only trims, lowercases, or
//! strips characters that can't reappear once stripped.

use crate::types::AliasType;

pub fn normalize(raw: &str, alias_type: AliasType) -> String {
  match alias_type {
    AliasType::Email => normalize_email(raw),
    AliasType::Phone => normalize_phone(raw),
    AliasType::Handle => normalize_handle(raw),
    AliasType::Username | AliasType::Nickname | AliasType::Name => normalize_plain(raw),
  }
}

fn normalize_email(raw: &str) -> String {
  raw.trim().to_lowercase()
}

fn normalize_phone(raw: &str) -> String {
  let trimmed = raw.trim();
  let has_plus = trimmed.starts_with('+');
  let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
  if has_plus { format!("+{digits}") } else { digits }
}

fn normalize_handle(raw: &str) -> String {
  let trimmed = raw.trim();
  let has_at = trimmed.starts_with('@');
  let lowered = trimmed.trim_start_matches('@').to_lowercase();
  if has_at { format!("@{lowered}") } else { lowered }
}

fn normalize_plain(raw: &str) -> String {
  raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn all_types() -> [AliasType; 6] {
    [
      AliasType::Email,
      AliasType::Phone,
      AliasType::Handle,
      AliasType::Username,
      AliasType::Nickname,
      AliasType::Name,
    ]
  }

  #[test]
  fn idempotent_for_every_alias_type() {
    let samples = [
      " Jane.Doe@Example.com ",
      "+1 (555) 123-4567",
      "  @JaneDoe ",
      "  JaneDoe  ",
      "",
      "   ",
      "+",
      "@",
    ];
    for t in all_types() {
      for s in samples {
        let once = normalize(s, t);
        let twice = normalize(&once, t);
        assert_eq!(once, twice, "not idempotent for {t:?} on {s:?}");
      }
    }
  }

  #[test]
  fn email_trims_and_lowercases() {
    assert_eq!(normalize(" Jane.Doe@Example.COM ", AliasType::Email), "jane.doe@example.com");
  }

  #[test]
  fn phone_strips_separators_and_preserves_leading_plus() {
    assert_eq!(normalize("+1 (555) 123-4567", AliasType::Phone), "+15551234567");
    assert_eq!(normalize("555-123-4567", AliasType::Phone), "5551234567");
  }

  #[test]
  fn handle_lowercases_and_preserves_leading_at() {
    assert_eq!(normalize(" @JaneDoe ", AliasType::Handle), "@janedoe");
    assert_eq!(normalize("JaneDoe", AliasType::Handle), "janedoe");
  }

  #[test]
  fn username_and_nickname_and_name_trim_and_lowercase() {
    for t in [AliasType::Username, AliasType::Nickname, AliasType::Name] {
      assert_eq!(normalize("  Jane Doe  ", t), "jane doe");
    }
  }
}
