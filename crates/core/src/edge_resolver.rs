//! C6: create-or-reuse edges. Dedup key is
//! `(source, target_entity_id, target_literal, relation_type, valid_at)`
//! with NULL == NULL semantics — two edges missing the same optional field
//! are the same edge, not distinct ones. Every resolution, new row or
//! reused, gets a provenance mention row.

use epigraph_entities::{episode_relationship_mention, relationship};
use epigraph_shared::AppError;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

pub struct ResolveEdgeInput<'a> {
  pub source_entity_id: Uuid,
  pub target_entity_id: Option<Uuid>,
  pub target_literal: Option<&'a str>,
  pub relation_type: &'a str,
  pub fact: &'a str,
  pub valid_at: Option<&'a str>,
  pub confidence: f32,
  pub self_disclosed: bool,
  pub episode_id: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
  Created,
  Reused,
}

#[derive(Debug, Clone)]
pub struct ResolveEdgeResult {
  pub relationship_id: Uuid,
  pub outcome: EdgeOutcome,
}

pub async fn resolve_edge<C: ConnectionTrait>(
  db: &C,
  input: ResolveEdgeInput<'_>,
) -> Result<ResolveEdgeResult, AppError> {
  if !is_xor_target(input.target_entity_id, input.target_literal) {
    return Err(AppError::validation(anyhow::anyhow!(
      "edge target must be exactly one of target_entity_id / target_literal"
    )));
  }

  let existing = find_existing(db, &input).await?;

  let (relationship_id, outcome) = if let Some(existing) = existing {
    (existing.id, EdgeOutcome::Reused)
  } else {
    let id = create_edge(db, &input).await?;
    (id, EdgeOutcome::Created)
  };

  append_mention(db, &input, relationship_id).await?;

  Ok(ResolveEdgeResult {
    relationship_id,
    outcome,
  })
}

async fn find_existing<C: ConnectionTrait>(
  db: &C,
  input: &ResolveEdgeInput<'_>,
) -> Result<Option<relationship::Model>, AppError> {
  let mut query = relationship::Entity::find()
    .filter(relationship::Column::SourceEntityId.eq(input.source_entity_id))
    .filter(relationship::Column::RelationType.eq(input.relation_type));

  query = match input.target_entity_id {
    Some(id) => query.filter(relationship::Column::TargetEntityId.eq(id)),
    None => query.filter(relationship::Column::TargetEntityId.is_null()),
  };

  query = match input.target_literal {
    Some(lit) => query.filter(relationship::Column::TargetLiteral.eq(lit)),
    None => query.filter(relationship::Column::TargetLiteral.is_null()),
  };

  query = match input.valid_at {
    Some(v) => query.filter(relationship::Column::ValidAt.eq(v)),
    None => query.filter(relationship::Column::ValidAt.is_null()),
  };

  query.one(db).await.map_err(AppError::new)
}

async fn create_edge<C: ConnectionTrait>(db: &C, input: &ResolveEdgeInput<'_>) -> Result<Uuid, AppError> {
  let now = chrono::Utc::now().into();
  let id = Uuid::now_v7();
  let active = relationship::ActiveModel {
    id: Set(id),
    source_entity_id: Set(input.source_entity_id),
    target_entity_id: Set(input.target_entity_id),
    target_literal: Set(input.target_literal.map(str::to_owned)),
    relation_type: Set(input.relation_type.to_owned()),
    fact: Set(input.fact.to_owned()),
    valid_at: Set(input.valid_at.map(str::to_owned)),
    invalid_at: Set(None),
    confidence: Set(input.confidence),
    created_at: Set(now),
    updated_at: Set(now),
  };
  active.insert(db).await.map_err(AppError::new)?;
  Ok(id)
}

async fn append_mention<C: ConnectionTrait>(
  db: &C,
  input: &ResolveEdgeInput<'_>,
  relationship_id: Uuid,
) -> Result<(), AppError> {
  let source_type = if input.self_disclosed { "self_disclosed" } else { "mentioned" };
  let active = episode_relationship_mention::ActiveModel {
    id: Set(Uuid::now_v7()),
    episode_id: Set(input.episode_id.to_owned()),
    relationship_id: Set(Some(relationship_id)),
    extracted_fact: Set(input.fact.to_owned()),
    asserted_by_entity_id: Set(None),
    source_type: Set(source_type.to_owned()),
    target_literal: Set(input.target_literal.map(str::to_owned)),
    alias_id: Set(None),
    confidence: Set(input.confidence),
    created_at: Set(chrono::Utc::now().into()),
  };
  active.insert(db).await.map_err(AppError::new)?;
  Ok(())
}

/// Exactly one of `target_entity_id` / `target_literal` must be set — the
/// XOR invariant every edge carries (§3, P3).
fn is_xor_target(target_entity_id: Option<Uuid>, target_literal: Option<&str>) -> bool {
  target_entity_id.is_some() != target_literal.is_some()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exactly_one_target_is_valid() {
    assert!(is_xor_target(Some(Uuid::now_v7()), None));
    assert!(is_xor_target(None, Some("literal")));
  }

  #[test]
  fn both_or_neither_target_is_invalid() {
    assert!(!is_xor_target(Some(Uuid::now_v7()), Some("literal")));
    assert!(!is_xor_target(None, None));
  }
}
