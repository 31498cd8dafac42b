//! C5: identity relation types (HAS_EMAIL, HAS_PHONE, HAS_HANDLE,
//! HAS_USERNAME, ALSO_KNOWN_AS) never become edges. Self-disclosed facts
//! promote to alias rows and re-trigger the shared-alias scan;
//! non-self-disclosed facts are a read-only lookup. Either way, an
//! `EpisodeRelationshipMention` is appended with `relationship_id = NULL`.

use epigraph_entities::{alias, episode_relationship_mention};
use epigraph_shared::AppError;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, sea_query::OnConflict};
use uuid::Uuid;

use crate::alias_normalizer;
use crate::types::AliasType;

pub struct PromoteIdentityInput<'a> {
  pub source_entity_id: Uuid,
  pub relation_type: &'a str,
  pub target_literal: &'a str,
  pub fact: &'a str,
  pub self_disclosed: bool,
  pub confidence: f32,
  pub episode_id: &'a str,
}

pub async fn promote_identity<C: ConnectionTrait>(db: &C, input: PromoteIdentityInput<'_>) -> Result<(), AppError> {
  let alias_type = AliasType::from_identity_relation_type(input.relation_type).ok_or_else(|| {
    AppError::validation(anyhow::anyhow!(
      "relation type {} is not an identity relation type",
      input.relation_type
    ))
  })?;

  let normalized = alias_normalizer::normalize(input.target_literal, alias_type);

  let alias_id = if input.self_disclosed {
    let id = upsert_alias(db, input.source_entity_id, input.target_literal, alias_type, &normalized).await?;
    rescan_sharing(db, alias_type, &normalized).await?;
    Some(id)
  } else {
    find_alias(db, input.source_entity_id, alias_type, &normalized).await?
  };

  append_mention(db, &input, alias_id).await?;

  Ok(())
}

async fn upsert_alias<C: ConnectionTrait>(
  db: &C,
  entity_id: Uuid,
  raw_alias: &str,
  alias_type: AliasType,
  normalized: &str,
) -> Result<Uuid, AppError> {
  let id = Uuid::now_v7();
  let now = chrono::Utc::now().into();
  let active = alias::ActiveModel {
    id: Set(id),
    entity_id: Set(entity_id),
    alias: Set(raw_alias.to_owned()),
    alias_type: Set(alias_type.as_str().to_owned()),
    normalized: Set(normalized.to_owned()),
    is_shared: Set(false),
    created_at: Set(now),
  };

  alias::Entity::insert(active)
    .on_conflict(
      OnConflict::columns([alias::Column::EntityId, alias::Column::Normalized, alias::Column::AliasType])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(db)
    .await
    .map_err(AppError::new)?;

  // The insert may have been a no-op on conflict, so re-read the row that
  // actually owns this key rather than trusting the id we generated above.
  let row = alias::Entity::find()
    .filter(alias::Column::EntityId.eq(entity_id))
    .filter(alias::Column::Normalized.eq(normalized))
    .filter(alias::Column::AliasType.eq(alias_type.as_str()))
    .one(db)
    .await
    .map_err(AppError::new)?
    .ok_or_else(|| AppError::new(anyhow::anyhow!("alias row vanished immediately after upsert")))?;

  Ok(row.id)
}

/// Non-self-disclosed identity facts never mutate the alias table, but if an
/// alias already exists for this `(entity, type, normalized value)` — e.g.
/// self-disclosed in an earlier episode — its id still belongs on the
/// mention row as provenance.
async fn find_alias<C: ConnectionTrait>(
  db: &C,
  entity_id: Uuid,
  alias_type: AliasType,
  normalized: &str,
) -> Result<Option<Uuid>, AppError> {
  alias::Entity::find()
    .filter(alias::Column::EntityId.eq(entity_id))
    .filter(alias::Column::Normalized.eq(normalized))
    .filter(alias::Column::AliasType.eq(alias_type.as_str()))
    .one(db)
    .await
    .map(|row| row.map(|r| r.id))
    .map_err(AppError::new)
}

/// After a self-disclosed alias upsert, re-check whether this normalized
/// value is now attached to two or more distinct entities. If so, every
/// alias row carrying that value flips `is_shared = true` — a shared
/// household phone or team inbox stops being read as a strong identity
/// signal for any single entity.
async fn rescan_sharing<C: ConnectionTrait>(db: &C, alias_type: AliasType, normalized: &str) -> Result<(), AppError> {
  use epigraph_entities::entity;

  let rows = alias::Entity::find()
    .filter(alias::Column::AliasType.eq(alias_type.as_str()))
    .filter(alias::Column::Normalized.eq(normalized))
    .find_also_related(entity::Entity)
    .all(db)
    .await
    .map_err(AppError::new)?;

  let distinct_live_entities: std::collections::HashSet<Uuid> = rows
    .iter()
    .filter_map(|(_, e)| e.as_ref())
    .filter(|e| e.merged_into.is_none())
    .map(|e| e.id)
    .collect();

  if distinct_live_entities.len() < 2 {
    return Ok(());
  }

  for (row, _) in rows {
    if row.is_shared {
      continue;
    }
    let mut active: alias::ActiveModel = row.into();
    active.is_shared = Set(true);
    active.update(db).await.map_err(AppError::new)?;
  }

  Ok(())
}

// source_type: self-disclosed facts map directly; non-self-disclosed
// identity claims are always third-party reports here, since the extractor
// has no "inferred" affordance for identity relation types.
async fn append_mention<C: ConnectionTrait>(
  db: &C,
  input: &PromoteIdentityInput<'_>,
  alias_id: Option<Uuid>,
) -> Result<(), AppError> {
  let source_type = if input.self_disclosed { "self_disclosed" } else { "mentioned" };
  let active = episode_relationship_mention::ActiveModel {
    id: Set(Uuid::now_v7()),
    episode_id: Set(input.episode_id.to_owned()),
    relationship_id: Set(None),
    extracted_fact: Set(input.fact.to_owned()),
    asserted_by_entity_id: Set(None),
    source_type: Set(source_type.to_owned()),
    target_literal: Set(Some(input.target_literal.to_owned())),
    alias_id: Set(alias_id),
    confidence: Set(input.confidence),
    created_at: Set(chrono::Utc::now().into()),
  };
  active.insert(db).await.map_err(AppError::new)?;
  Ok(())
}
