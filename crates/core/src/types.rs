//! C1: the closed lexicons of entity types, relation types, and alias
//! types. Nothing here touches the database — it's the static vocabulary
//! every other component validates against.

use std::fmt;

/// Entity type identifiers. Stored verbatim in `entity.entity_type_id`.
pub const ENTITY_TYPES: &[&str] = &["person", "organization", "location", "product", "event", "other"];

pub fn is_known_entity_type(entity_type_id: &str) -> bool {
  ENTITY_TYPES.contains(&entity_type_id)
}

/// Which bucket of the relation-type lexicon a relation type falls into.
/// Drives downstream dispatch: identity types never become edges (see the
/// identity promoter); exclusive types invalidate prior live edges on the
/// same source (see the contradiction detector); temporal and general
/// types are ordinary edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationCategory {
  Identity,
  Exclusive,
  Temporal,
  General,
}

impl fmt::Display for RelationCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Identity => "identity",
      Self::Exclusive => "exclusive",
      Self::Temporal => "temporal",
      Self::General => "general",
    };
    write!(f, "{s}")
  }
}

const IDENTITY_RELATION_TYPES: &[&str] = &["HAS_EMAIL", "HAS_PHONE", "HAS_HANDLE", "HAS_USERNAME", "ALSO_KNOWN_AS"];

const EXCLUSIVE_RELATION_TYPES: &[&str] = &["WORKS_AT", "LIVES_IN", "SPOUSE_OF", "MARRIED_TO", "DATING"];

const TEMPORAL_RELATION_TYPES: &[&str] = &["BORN_ON"];

/// Returns the category a relation type belongs to. Unrecognized relation
/// types fall into `General` rather than being rejected — the closed
/// lexicon governs identity/exclusive/temporal behavior specifically, but
/// the extractor is free to surface any other factual predicate.
pub fn categorize_relation_type(relation_type: &str) -> RelationCategory {
  if IDENTITY_RELATION_TYPES.contains(&relation_type) {
    RelationCategory::Identity
  } else if EXCLUSIVE_RELATION_TYPES.contains(&relation_type) {
    RelationCategory::Exclusive
  } else if TEMPORAL_RELATION_TYPES.contains(&relation_type) {
    RelationCategory::Temporal
  } else {
    RelationCategory::General
  }
}

pub fn is_identity_relation_type(relation_type: &str) -> bool {
  categorize_relation_type(relation_type) == RelationCategory::Identity
}

pub fn is_exclusive_relation_type(relation_type: &str) -> bool {
  categorize_relation_type(relation_type) == RelationCategory::Exclusive
}

/// Alias type identifiers. Stored verbatim in `alias.alias_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasType {
  Email,
  Phone,
  Handle,
  Username,
  Nickname,
  Name,
}

impl AliasType {
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Email => "email",
      Self::Phone => "phone",
      Self::Handle => "handle",
      Self::Username => "username",
      Self::Nickname => "nickname",
      Self::Name => "name",
    }
  }

  /// The alias type an identity relation type promotes to, if any.
  pub fn from_identity_relation_type(relation_type: &str) -> Option<Self> {
    match relation_type {
      "HAS_EMAIL" => Some(Self::Email),
      "HAS_PHONE" => Some(Self::Phone),
      "HAS_HANDLE" => Some(Self::Handle),
      "HAS_USERNAME" => Some(Self::Username),
      "ALSO_KNOWN_AS" => Some(Self::Nickname),
      _ => None,
    }
  }
}

impl fmt::Display for AliasType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identity_types_never_categorize_as_exclusive() {
    for &t in IDENTITY_RELATION_TYPES {
      assert_eq!(categorize_relation_type(t), RelationCategory::Identity);
    }
  }

  #[test]
  fn unknown_relation_type_is_general() {
    assert_eq!(categorize_relation_type("LIKES"), RelationCategory::General);
  }

  #[test]
  fn identity_relation_types_map_to_alias_types() {
    assert_eq!(AliasType::from_identity_relation_type("HAS_EMAIL"), Some(AliasType::Email));
    assert_eq!(AliasType::from_identity_relation_type("ALSO_KNOWN_AS"), Some(AliasType::Nickname));
    assert_eq!(AliasType::from_identity_relation_type("WORKS_AT"), None);
  }
}
