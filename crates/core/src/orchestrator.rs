//! C9: the per-episode pipeline. One episode, one transaction: extract,
//! resolve, promote/link, check contradictions, refresh embeddings, record
//! provenance. Either all of it commits or none of it does — except
//! embedding refresh and contradiction checks, which are logged and
//! swallowed rather than aborting the episode (see `AppError::kind`).

use std::collections::HashSet;

use epigraph_entities::episode_entity_mention;
use epigraph_llm::{Embedder, EntityExtractor, ExtractedEntity, RelationshipExtractor};
use epigraph_shared::{AppError, Episode};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait, sea_query::OnConflict};
use tracing::warn;
use uuid::Uuid;

use crate::entity_resolver::{self, ResolveInput, ResolveOutcome};
use crate::identity_promoter::{self, PromoteIdentityInput};
use crate::edge_resolver::{self, ResolveEdgeInput};
use crate::embedding_store;
use crate::types::{self, RelationCategory};
use crate::{collision, contradiction};

/// Names the extractor sometimes reports for the assistant itself, which
/// never gets an entity row — it isn't someone the episode is about.
const ASSISTANT_NAMES: [&str; 3] = ["assistant", "ai", "bot"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
  /// A row already existed for this episode id; nothing was re-processed.
  AlreadyIngested,
  Processed { entities_resolved: usize, edges_touched: usize },
}

pub async fn ingest_episode(
  db: &DatabaseConnection,
  episode: &Episode,
  entity_extractor: &dyn EntityExtractor,
  relationship_extractor: &dyn RelationshipExtractor,
  embedder: &dyn Embedder,
) -> Result<IngestOutcome, AppError> {
  if !episode.is_valid() {
    return Err(AppError::validation(anyhow::anyhow!("episode id must be non-empty")));
  }

  if episode.content.is_empty() {
    return Ok(IngestOutcome::Processed {
      entities_resolved: 0,
      edges_touched: 0,
    });
  }

  if already_ingested(db, &episode.id).await? {
    return Ok(IngestOutcome::AlreadyIngested);
  }

  let prior_names = prior_co_mentioned_names(db, &episode.channel_id).await?;

  let extracted_entities = entity_extractor
    .extract_entities(&episode.content, &prior_names)
    .await?
    .into_iter()
    .filter(|e| !is_assistant_name(&e.name))
    .collect::<Vec<_>>();

  if extracted_entities.is_empty() {
    let txn = db.begin().await.map_err(AppError::new)?;
    txn.commit().await.map_err(AppError::new)?;
    return Ok(IngestOutcome::Processed {
      entities_resolved: 0,
      edges_touched: 0,
    });
  }

  let txn = db.begin().await.map_err(AppError::new)?;

  let mut resolved_names: Vec<String> = Vec::new();
  let mut resolved: Vec<(ExtractedEntity, Uuid, ResolveOutcome)> = Vec::new();

  for extracted in extracted_entities {
    if !types::is_known_entity_type(&extracted.entity_type_id) {
      continue;
    }
    let mut co_mentioned = prior_names.clone();
    co_mentioned.extend(resolved_names.iter().cloned());

    let result = entity_resolver::resolve(
      &txn,
      embedder,
      ResolveInput {
        name: &extracted.name,
        entity_type_id: &extracted.entity_type_id,
        channel_id: &episode.channel_id,
        co_mentioned_names: &co_mentioned,
      },
    )
    .await?;

    resolved_names.push(extracted.name.clone());
    resolved.push((extracted, result.entity_id, result.outcome));
  }

  if resolved.is_empty() {
    txn.commit().await.map_err(AppError::new)?;
    return Ok(IngestOutcome::Processed {
      entities_resolved: 0,
      edges_touched: 0,
    });
  }

  let known_entity_names: Vec<String> = resolved.iter().map(|(e, ..)| e.name.clone()).collect();
  let extracted_relationships = relationship_extractor
    .extract_relationships(&episode.content, &known_entity_names)
    .await?;

  let mut edges_touched = 0usize;
  let mut created_edge_ids: Vec<Uuid> = Vec::new();

  for rel in extracted_relationships {
    let Some(source_entity_id) = find_resolved(&resolved, &rel.source_name) else {
      continue;
    };

    if types::categorize_relation_type(&rel.relation_type) == RelationCategory::Identity {
      let Some(target_literal) = rel.target_literal.as_deref() else {
        continue;
      };
      identity_promoter::promote_identity(
        &txn,
        PromoteIdentityInput {
          source_entity_id,
          relation_type: &rel.relation_type,
          target_literal,
          fact: &rel.fact,
          self_disclosed: rel.self_disclosed,
          confidence: 1.0,
          episode_id: &episode.id,
        },
      )
      .await?;
      edges_touched += 1;
      continue;
    }

    let target_entity_id = rel.target_name.as_deref().and_then(|name| find_resolved(&resolved, name));
    if rel.target_name.is_some() && target_entity_id.is_none() {
      // The extractor named a target entity we never resolved this
      // episode; without a resolved id there's nothing to link to.
      continue;
    }

    let result = edge_resolver::resolve_edge(
      &txn,
      ResolveEdgeInput {
        source_entity_id,
        target_entity_id,
        target_literal: rel.target_literal.as_deref(),
        relation_type: &rel.relation_type,
        fact: &rel.fact,
        valid_at: rel.valid_at.as_deref(),
        confidence: 1.0,
        self_disclosed: rel.self_disclosed,
        episode_id: &episode.id,
      },
    )
    .await?;

    edges_touched += 1;
    if result.outcome == edge_resolver::EdgeOutcome::Created {
      created_edge_ids.push(result.relationship_id);
    }
  }

  for edge_id in &created_edge_ids {
    if let Some(edge) = epigraph_entities::relationship::Entity::find_by_id(*edge_id)
      .one(&txn)
      .await
      .map_err(AppError::new)?
    {
      let reference_time = episode.occurred_at.to_rfc3339();
      if let Err(err) = contradiction::check_and_invalidate(&txn, &edge, &reference_time).await {
        warn!(error = %err, relationship_id = %edge_id, "orchestrator: contradiction check failed, continuing");
      }
    }
  }

  for (extracted, entity_id, outcome) in &resolved {
    upsert_mention(&txn, &episode.id, &episode.channel_id, *entity_id).await?;

    if *outcome == ResolveOutcome::Created {
      match embedder.embed(&extracted.name).await {
        Ok(vector) => {
          if let Err(err) = embedding_store::upsert(&txn, "entity", *entity_id, embedder.model_name(), &vector, &extracted.name).await {
            warn!(error = %err, entity_id = %entity_id, "orchestrator: embedding refresh failed, continuing");
          }
        }
        Err(err) => {
          warn!(error = %err, entity_id = %entity_id, "orchestrator: embedding call failed, continuing");
        }
      }
    }
  }

  if let Err(err) = collision::scan(&txn).await {
    warn!(error = %err, "orchestrator: collision scan failed, continuing");
  }

  txn.commit().await.map_err(AppError::new)?;

  Ok(IngestOutcome::Processed {
    entities_resolved: resolved.len(),
    edges_touched,
  })
}

fn is_assistant_name(name: &str) -> bool {
  ASSISTANT_NAMES.iter().any(|a| a.eq_ignore_ascii_case(name.trim()))
}

fn find_resolved(resolved: &[(ExtractedEntity, Uuid, ResolveOutcome)], name: &str) -> Option<Uuid> {
  resolved
    .iter()
    .find(|(e, ..)| e.name.eq_ignore_ascii_case(name))
    .map(|(_, id, _)| *id)
}

async fn already_ingested(db: &DatabaseConnection, episode_id: &str) -> Result<bool, AppError> {
  episode_entity_mention::Entity::find()
    .filter(episode_entity_mention::Column::EpisodeId.eq(episode_id))
    .one(db)
    .await
    .map(|r| r.is_some())
    .map_err(AppError::new)
}

/// Canonical names of entities mentioned in this channel's prior episodes,
/// used to seed the extractor's own co-mention context and the resolver's
/// context score.
async fn prior_co_mentioned_names(db: &DatabaseConnection, channel_id: &str) -> Result<Vec<String>, AppError> {
  use epigraph_entities::entity;

  let rows = episode_entity_mention::Entity::find()
    .filter(episode_entity_mention::Column::ChannelId.eq(channel_id))
    .find_also_related(entity::Entity)
    .all(db)
    .await
    .map_err(AppError::new)?;

  let names: HashSet<String> = rows.into_iter().filter_map(|(_, e)| e.map(|e| e.canonical_name)).collect();
  Ok(names.into_iter().collect())
}

async fn upsert_mention(
  db: &impl sea_orm::ConnectionTrait,
  episode_id: &str,
  channel_id: &str,
  entity_id: Uuid,
) -> Result<(), AppError> {
  let existing = episode_entity_mention::Entity::find()
    .filter(episode_entity_mention::Column::EpisodeId.eq(episode_id))
    .filter(episode_entity_mention::Column::EntityId.eq(entity_id))
    .one(db)
    .await
    .map_err(AppError::new)?;

  if let Some(row) = existing {
    let mention_count = row.mention_count;
    let mut active: episode_entity_mention::ActiveModel = row.into();
    active.mention_count = Set(mention_count + 1);
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(db).await.map_err(AppError::new)?;
    return Ok(());
  }

  let now = chrono::Utc::now().into();
  let active = episode_entity_mention::ActiveModel {
    id: Set(Uuid::now_v7()),
    episode_id: Set(episode_id.to_owned()),
    channel_id: Set(channel_id.to_owned()),
    entity_id: Set(entity_id),
    mention_count: Set(1),
    created_at: Set(now),
    updated_at: Set(now),
  };

  episode_entity_mention::Entity::insert(active)
    .on_conflict(
      OnConflict::columns([episode_entity_mention::Column::EpisodeId, episode_entity_mention::Column::EntityId])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(db)
    .await
    .map_err(AppError::new)?;

  Ok(())
}
