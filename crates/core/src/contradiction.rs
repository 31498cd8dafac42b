//! C7: exclusive relation types (WORKS_AT, LIVES_IN, SPOUSE_OF,
//! MARRIED_TO, DATING) admit only one live target per source at a time.
//! When a new edge of such a type commits, every other live edge with the
//! same source and type — but a different target — is invalidated.
//! Updates are CAS-guarded on `invalid_at IS NULL` so a concurrent
//! invalidation never double-applies.

use epigraph_entities::relationship;
use epigraph_shared::AppError;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::types::is_exclusive_relation_type;

/// Run the contradiction check for one freshly-created edge. `reference_time`
/// is the fallback `invalid_at` value used when the new edge itself carries
/// no `valid_at` (in which case "now" is the best available witness to when
/// the fact became true).
pub async fn check_and_invalidate<C: ConnectionTrait>(
  db: &C,
  new_edge: &relationship::Model,
  reference_time: &str,
) -> Result<usize, AppError> {
  if !is_exclusive_relation_type(&new_edge.relation_type) {
    return Ok(0);
  }

  let candidates = relationship::Entity::find()
    .filter(relationship::Column::SourceEntityId.eq(new_edge.source_entity_id))
    .filter(relationship::Column::RelationType.eq(new_edge.relation_type.clone()))
    .filter(relationship::Column::InvalidAt.is_null())
    .filter(relationship::Column::Id.ne(new_edge.id))
    .all(db)
    .await
    .map_err(AppError::contradiction_check)?;

  let invalid_at = new_edge.valid_at.clone().unwrap_or_else(|| reference_time.to_owned());

  let mut invalidated = 0usize;
  for candidate in candidates {
    if !targets_differ(&candidate, new_edge) {
      continue;
    }

    let candidate_id = candidate.id;
    let mut active: relationship::ActiveModel = candidate.into();
    active.invalid_at = Set(Some(invalid_at.clone()));
    active.updated_at = Set(chrono::Utc::now().into());

    let rows = relationship::Entity::update_many()
      .set(active)
      .filter(relationship::Column::Id.eq(candidate_id))
      .filter(relationship::Column::InvalidAt.is_null())
      .exec(db)
      .await
      .map_err(AppError::contradiction_check)?;

    invalidated += rows.rows_affected as usize;
  }

  Ok(invalidated)
}

fn targets_differ(a: &relationship::Model, b: &relationship::Model) -> bool {
  a.target_entity_id != b.target_entity_id || a.target_literal != b.target_literal
}
