//! C8: batch scan over stored facts proposing merge candidates, distinct
//! from the per-mention flagging `entity_resolver` does inline. Four
//! collision shapes, highest confidence wins when a pair matches more than
//! one:
//!
//! - one shared hard identifier (email/phone/handle) -> 0.95, auto
//! - two or more shared hard identifiers -> 0.99, auto
//! - same name + same `BORN_ON` date -> 0.90, auto (built as specified: the
//!   extractor's date precision is trusted here, not re-verified)
//! - same name + same `WORKS_AT` target -> 0.85, needs review
//!
//! Upserts never revive a `resolved`/`rejected` candidate, and only ever
//! raise confidence/reason, never lower them.

use std::collections::HashMap;

use epigraph_entities::{alias, entity, merge_candidate, relationship};
use epigraph_shared::AppError;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

const HARD_IDENTIFIER_ALIAS_TYPES: [&str; 3] = ["email", "phone", "handle"];

const HARD_IDENTIFIER_CONFIDENCE: f32 = 0.95;
const MULTIPLE_HARD_IDENTIFIERS_CONFIDENCE: f32 = 0.99;
const NAME_AND_BIRTHDATE_CONFIDENCE: f32 = 0.90;
const NAME_AND_EMPLOYER_CONFIDENCE: f32 = 0.85;

/// Run a full collision scan and upsert every proposal found. Returns the
/// number of pairs touched (inserted or raised).
pub async fn scan<C: ConnectionTrait>(db: &C) -> Result<usize, AppError> {
  let mut touched = 0usize;
  touched += scan_hard_identifiers(db).await?;
  touched += scan_name_and_relation(db, "BORN_ON", NAME_AND_BIRTHDATE_CONFIDENCE, true, "name_and_birthdate").await?;
  touched += scan_name_and_relation(db, "WORKS_AT", NAME_AND_EMPLOYER_CONFIDENCE, false, "name_and_employer").await?;
  Ok(touched)
}

/// Group live, non-shared aliases by `(alias_type, normalized)`. Any group
/// spanning two or more distinct entities is a hard-identifier collision;
/// pairs that collide on more than one identifier type get upgraded.
/// `is_shared=true` aliases are excluded — intentional sharing (a household
/// phone, a team inbox) is exempt from collision signaling.
async fn scan_hard_identifiers<C: ConnectionTrait>(db: &C) -> Result<usize, AppError> {
  let rows = alias::Entity::find()
    .filter(alias::Column::AliasType.is_in(HARD_IDENTIFIER_ALIAS_TYPES))
    .filter(alias::Column::IsShared.eq(false))
    .find_also_related(entity::Entity)
    .all(db)
    .await
    .map_err(AppError::new)?;

  let mut groups: HashMap<(String, String), Vec<Uuid>> = HashMap::new();
  for (alias_row, entity_row) in rows {
    let Some(entity_row) = entity_row else { continue };
    if entity_row.merged_into.is_some() {
      continue;
    }
    groups
      .entry((alias_row.alias_type.clone(), alias_row.normalized.clone()))
      .or_default()
      .push(entity_row.id);
  }

  // Count, per pair, how many distinct identifier-type groups collide.
  let mut pair_hits: HashMap<(Uuid, Uuid), Vec<String>> = HashMap::new();
  for ((alias_type, normalized), mut entity_ids) in groups {
    entity_ids.sort();
    entity_ids.dedup();
    if entity_ids.len() < 2 {
      continue;
    }
    for (a, b) in pairs(&entity_ids) {
      pair_hits.entry((a, b)).or_default().push(format!("{alias_type}:{normalized}"));
    }
  }

  let mut touched = 0usize;
  for ((a, b), identifiers) in pair_hits {
    let (confidence, reason) = if identifiers.len() >= 2 {
      (MULTIPLE_HARD_IDENTIFIERS_CONFIDENCE, "multiple_hard_identifiers")
    } else {
      (HARD_IDENTIFIER_CONFIDENCE, "hard_identifier_collision")
    };
    let matching_facts = serde_json::json!({ "shared_identifiers": identifiers });
    if upsert_candidate(db, a, b, confidence, true, reason, matching_facts).await? {
      touched += 1;
    }
  }

  Ok(touched)
}

/// Group live entities sharing `relation_type` by `(canonical_name lowercase,
/// target key)`. A group spanning two or more distinct entities proposes a
/// merge candidate at `confidence`/`auto_eligible`.
async fn scan_name_and_relation<C: ConnectionTrait>(
  db: &C,
  relation_type: &str,
  confidence: f32,
  auto_eligible: bool,
  reason: &str,
) -> Result<usize, AppError> {
  let rows = relationship::Entity::find()
    .filter(relationship::Column::RelationType.eq(relation_type))
    .all(db)
    .await
    .map_err(AppError::new)?;

  let entities: HashMap<Uuid, entity::Model> = entity::Entity::find()
    .all(db)
    .await
    .map_err(AppError::new)?
    .into_iter()
    .map(|e| (e.id, e))
    .collect();

  let mut groups: HashMap<(String, String), Vec<Uuid>> = HashMap::new();
  for rel in rows {
    let Some(source_entity) = entities.get(&rel.source_entity_id) else { continue };
    if source_entity.merged_into.is_some() {
      continue;
    }
    let target_key = match (&rel.target_entity_id, &rel.target_literal) {
      (Some(id), _) => id.to_string(),
      (None, Some(lit)) => lit.to_lowercase(),
      (None, None) => continue,
    };
    let name_key = source_entity.canonical_name.to_lowercase();
    groups.entry((name_key, target_key)).or_default().push(source_entity.id);
  }

  let mut touched = 0usize;
  for ((name_key, target_key), mut entity_ids) in groups {
    entity_ids.sort();
    entity_ids.dedup();
    if entity_ids.len() < 2 {
      continue;
    }
    let matching_facts = serde_json::json!({
      "relation_type": relation_type,
      "name": name_key,
      "target": target_key,
    });
    for (a, b) in pairs(&entity_ids) {
      if upsert_candidate(db, a, b, confidence, auto_eligible, reason, matching_facts.clone()).await? {
        touched += 1;
      }
    }
  }

  Ok(touched)
}

fn pairs(ids: &[Uuid]) -> Vec<(Uuid, Uuid)> {
  let mut out = Vec::new();
  for i in 0..ids.len() {
    for j in (i + 1)..ids.len() {
      out.push(order(ids[i], ids[j]));
    }
  }
  out
}

fn order(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
  if a < b { (a, b) } else { (b, a) }
}

/// The raise-only merge rule behind `upsert_candidate`, factored out so it
/// can be tested without a database: `None` means a terminal
/// (`resolved`/`rejected`) row stays untouched, `Some` carries the new
/// `(confidence, auto_eligible, reason)` to persist.
fn raise(
  existing_status: &str,
  existing_confidence: f32,
  existing_auto_eligible: bool,
  existing_reason: &str,
  incoming_confidence: f32,
  incoming_auto_eligible: bool,
  incoming_reason: &str,
) -> Option<(f32, bool, String)> {
  if existing_status == "resolved" || existing_status == "rejected" {
    return None;
  }
  let raise_reason = incoming_confidence > existing_confidence;
  Some((
    incoming_confidence.max(existing_confidence),
    incoming_auto_eligible || existing_auto_eligible,
    if raise_reason { incoming_reason.to_owned() } else { existing_reason.to_owned() },
  ))
}

/// Insert a new pending candidate, or raise an existing non-terminal one.
/// See `raise` for the merge rule. A `resolved`/`rejected` row is left
/// untouched — returns `false` in that case.
async fn upsert_candidate<C: ConnectionTrait>(
  db: &C,
  entity_a_id: Uuid,
  entity_b_id: Uuid,
  confidence: f32,
  auto_eligible: bool,
  reason: &str,
  matching_facts: serde_json::Value,
) -> Result<bool, AppError> {
  let existing = merge_candidate::Entity::find()
    .filter(merge_candidate::Column::EntityAId.eq(entity_a_id))
    .filter(merge_candidate::Column::EntityBId.eq(entity_b_id))
    .one(db)
    .await
    .map_err(AppError::new)?;

  match existing {
    Some(row) => {
      let Some((new_confidence, new_auto_eligible, new_reason)) =
        raise(&row.status, row.confidence, row.auto_eligible, &row.reason, confidence, auto_eligible, reason)
      else {
        return Ok(false);
      };
      let mut active: merge_candidate::ActiveModel = row.into();
      active.confidence = Set(new_confidence);
      active.auto_eligible = Set(new_auto_eligible);
      active.reason = Set(new_reason);
      active.matching_facts = Set(matching_facts);
      active.updated_at = Set(chrono::Utc::now().into());
      active.update(db).await.map_err(AppError::new)?;
      Ok(true)
    }
    None => {
      let now = chrono::Utc::now().into();
      let active = merge_candidate::ActiveModel {
        id: Set(Uuid::now_v7()),
        entity_a_id: Set(entity_a_id),
        entity_b_id: Set(entity_b_id),
        confidence: Set(confidence),
        auto_eligible: Set(auto_eligible),
        reason: Set(reason.to_owned()),
        matching_facts: Set(matching_facts),
        context: Set(serde_json::json!({"source": "collision_detector"})),
        status: Set("pending".to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
      };
      active.insert(db).await.map_err(AppError::new)?;
      Ok(true)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pairs_enumerates_all_combinations_ordered() {
    let a = Uuid::now_v7();
    let b = Uuid::now_v7();
    let c = Uuid::now_v7();
    let got = pairs(&[a, b, c]);
    assert_eq!(got.len(), 3);
    for (x, y) in got {
      assert!(x < y);
    }
  }

  #[test]
  fn hard_identifier_collision_is_raised_to_multiple_on_second_match() {
    // "John Smith" and "J. Smith" both carry a non-shared john@example.com
    // alias: the first scan proposes 0.95/hard_identifier_collision.
    let (confidence, auto_eligible, reason) =
      raise("pending", 0.0, false, "", HARD_IDENTIFIER_CONFIDENCE, true, "hard_identifier_collision").unwrap_or((
        HARD_IDENTIFIER_CONFIDENCE,
        true,
        "hard_identifier_collision".to_owned(),
      ));
    assert_eq!(confidence, HARD_IDENTIFIER_CONFIDENCE);
    assert_eq!(reason, "hard_identifier_collision");
    assert!(auto_eligible);

    // A matching phone added to both entities re-runs the scan and finds a
    // second hard-identifier hit for the same pair: the reason upgrades to
    // `multiple_hard_identifiers` at 0.99, in place.
    let (confidence, auto_eligible, reason) = raise(
      "pending",
      confidence,
      auto_eligible,
      &reason,
      MULTIPLE_HARD_IDENTIFIERS_CONFIDENCE,
      true,
      "multiple_hard_identifiers",
    )
    .expect("pending row is not terminal");
    assert_eq!(confidence, MULTIPLE_HARD_IDENTIFIERS_CONFIDENCE);
    assert_eq!(reason, "multiple_hard_identifiers");
    assert!(auto_eligible);
  }

  #[test]
  fn resolved_candidate_is_never_revived() {
    assert_eq!(raise("resolved", 0.95, true, "hard_identifier_collision", 0.99, true, "multiple_hard_identifiers"), None);
    assert_eq!(raise("rejected", 0.95, true, "hard_identifier_collision", 0.99, true, "multiple_hard_identifiers"), None);
  }

  #[test]
  fn lower_incoming_confidence_keeps_existing_reason() {
    let (confidence, _, reason) = raise("pending", 0.95, true, "hard_identifier_collision", 0.85, false, "name_and_employer")
      .expect("pending row accepts the OR/max merge");
    // Confidence never drops below what was already recorded...
    assert_eq!(confidence, 0.95);
    // ...and since it didn't strictly increase, the reason text describing
    // it is left alone too.
    assert_eq!(reason, "hard_identifier_collision");
  }
}
