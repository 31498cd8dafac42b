//! C4: resolve a mentioned name to an existing entity, or create a new
//! one. The single most load-bearing decision in the pipeline — biased
//! toward creating a duplicate over risking an incorrect merge (see
//! `DESIGN.md`).

use std::collections::HashMap;

use epigraph_entities::{alias, entity, episode_entity_mention, merge_candidate};
use epigraph_llm::Embedder;
use epigraph_shared::AppError;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;
use uuid::Uuid;

use crate::alias_normalizer;
use crate::embedding_store;
use crate::types::{self, AliasType};

const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.90;
const CLEAR_WINNER_FLOOR: f64 = 0.35;
const CLEAR_WINNER_GAP: f64 = 0.15;
const EMBEDDING_COSINE_THRESHOLD: f64 = 0.85;

const ALL_ALIAS_TYPES: [AliasType; 6] = [
  AliasType::Email,
  AliasType::Phone,
  AliasType::Handle,
  AliasType::Username,
  AliasType::Nickname,
  AliasType::Name,
];

pub struct ResolveInput<'a> {
  pub name: &'a str,
  pub entity_type_id: &'a str,
  pub channel_id: &'a str,
  /// Names of other entities resolved earlier in this same episode, used
  /// for the context overlap score.
  pub co_mentioned_names: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
  Picked,
  Created,
}

#[derive(Debug, Clone)]
pub struct ResolveResult {
  pub entity_id: Uuid,
  pub outcome: ResolveOutcome,
}

#[derive(Debug, Clone)]
struct Candidate {
  entity_id: Uuid,
  alias_score: f64,
  has_exact_alias_hit: bool,
  embedding_score: f64,
  context_score: f64,
}

impl Candidate {
  fn total(&self) -> f64 {
    0.5 * self.alias_score + 0.3 * self.embedding_score + 0.2 * self.context_score
  }
}

/// The outcome of the decision cascade over a sorted candidate list,
/// independent of any I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Cascade {
  CreateNew,
  Pick(Uuid),
  Ambiguous { top: Uuid, confidence: f64 },
}

/// Steps 4-5 of the resolution algorithm: sort by `total` descending and
/// decide in the documented order. `ranked` must already be sorted.
///
/// The exact-alias rule only fires when exactly one candidate carries the
/// exact hit — two entities tied on the same exact alias (e.g. two
/// people who both hold a name alias "Tyler") must fall through to the
/// gap-based rules below, which correctly call it ambiguous on a tie.
fn decide(ranked: &[Candidate]) -> Cascade {
  let Some(top) = ranked.first() else {
    return Cascade::CreateNew;
  };

  if top.total() >= HIGH_CONFIDENCE_THRESHOLD {
    return Cascade::Pick(top.entity_id);
  }

  let exact_hits: Vec<&Candidate> = ranked.iter().filter(|c| c.has_exact_alias_hit).collect();
  if exact_hits.len() == 1 {
    return Cascade::Pick(exact_hits[0].entity_id);
  }

  let above_floor = ranked.iter().filter(|c| c.total() >= CLEAR_WINNER_FLOOR).count();
  if above_floor == 1 {
    return Cascade::Pick(top.entity_id);
  }

  if ranked.len() >= 2 {
    let gap = top.total() - ranked[1].total();
    if gap >= CLEAR_WINNER_GAP && top.total() >= CLEAR_WINNER_FLOOR {
      return Cascade::Pick(top.entity_id);
    }
  }

  Cascade::Ambiguous {
    top: top.entity_id,
    confidence: top.total(),
  }
}

pub async fn resolve<C: ConnectionTrait>(
  db: &C,
  embedder: &dyn Embedder,
  input: ResolveInput<'_>,
) -> Result<ResolveResult, AppError> {
  let mut candidates = alias_candidates(db, input.name, input.entity_type_id).await?;
  merge_embedding_candidates(db, embedder, input.name, input.entity_type_id, &mut candidates).await?;

  for candidate in candidates.values_mut() {
    candidate.context_score =
      context_score(db, candidate.entity_id, input.channel_id, input.co_mentioned_names).await?;
  }

  let mut ranked: Vec<Candidate> = candidates.into_values().collect();
  ranked.sort_by(|a, b| b.total().partial_cmp(&a.total()).unwrap_or(std::cmp::Ordering::Equal));

  match decide(&ranked) {
    Cascade::CreateNew => {
      let entity_id = create_entity(db, input.name, input.entity_type_id).await?;
      debug!(entity_id = %entity_id, "entity_resolver: no candidates, created new entity");
      Ok(ResolveResult {
        entity_id,
        outcome: ResolveOutcome::Created,
      })
    }
    Cascade::Pick(entity_id) => {
      debug!(entity_id = %entity_id, "entity_resolver: picked existing entity");
      Ok(ResolveResult {
        entity_id,
        outcome: ResolveOutcome::Picked,
      })
    }
    Cascade::Ambiguous { top, confidence } => {
      let new_entity_id = create_entity(db, input.name, input.entity_type_id).await?;
      insert_ambiguous_merge_candidate(db, new_entity_id, top, confidence).await?;
      debug!(
        entity_id = %new_entity_id,
        candidate = %top,
        "entity_resolver: ambiguous resolution, created new entity and flagged merge candidate"
      );
      Ok(ResolveResult {
        entity_id: new_entity_id,
        outcome: ResolveOutcome::Created,
      })
    }
  }
}

async fn alias_candidates<C: ConnectionTrait>(
  db: &C,
  name: &str,
  entity_type_id: &str,
) -> Result<HashMap<Uuid, Candidate>, AppError> {
  let rows = alias::Entity::find()
    .find_also_related(entity::Entity)
    .filter(entity::Column::EntityTypeId.eq(entity_type_id))
    .filter(entity::Column::MergedInto.is_null())
    .all(db)
    .await
    .map_err(AppError::new)?;

  let mut by_entity: HashMap<Uuid, Candidate> = HashMap::new();

  for (alias_row, entity_row) in rows {
    let Some(entity_row) = entity_row else { continue };
    let Some((score, is_exact)) = score_alias_row(name, &alias_row) else {
      continue;
    };

    let slot = by_entity.entry(entity_row.id).or_insert_with(|| Candidate {
      entity_id: entity_row.id,
      alias_score: 0.0,
      has_exact_alias_hit: false,
      embedding_score: 0.0,
      context_score: 0.0,
    });
    if score > slot.alias_score {
      slot.alias_score = score;
    }
    slot.has_exact_alias_hit |= is_exact;
  }

  Ok(by_entity)
}

/// Score a single alias row against the mentioned name. Returns
/// `(score, is_exact_hit)`. `email`/`phone` never produce an "exact" hit —
/// they cap at the 0.95 surface tier even on a normalized match, so that
/// two entities tied on a shared hard identifier fall through to the
/// ambiguous decision rather than short-circuiting on the exact-alias
/// cascade rule. `name`/other types score 1.00 on a normalized match
/// (exact) or 0.85 on a case-insensitive surface match. `is_shared`
/// attenuates by `0.7`, applied per-alias before the max-across-aliases
/// combination happens in the caller.
fn score_alias_row(name: &str, row: &alias::Model) -> Option<(f64, bool)> {
  let attenuation = if row.is_shared { 0.7 } else { 1.0 };
  let is_hard_identifier = matches!(row.alias_type.as_str(), "email" | "phone");

  for alias_type in ALL_ALIAS_TYPES {
    if alias_type.as_str() != row.alias_type {
      continue;
    }
    let normalized_input = alias_normalizer::normalize(name, alias_type);
    if normalized_input == row.normalized {
      if is_hard_identifier {
        return Some((0.95 * attenuation, false));
      }
      return Some((1.00 * attenuation, true));
    }
  }

  if row.alias.trim().eq_ignore_ascii_case(name.trim()) {
    let base = if is_hard_identifier { 0.95 } else { 0.85 };
    return Some((base * attenuation, false));
  }

  None
}

async fn merge_embedding_candidates<C: ConnectionTrait>(
  db: &C,
  embedder: &dyn Embedder,
  name: &str,
  entity_type_id: &str,
  candidates: &mut HashMap<Uuid, Candidate>,
) -> Result<(), AppError> {
  let query_vector = embedder.embed(name).await?;
  let hits = embedding_store::search(db, "entity", embedder.model_name(), &query_vector, EMBEDDING_COSINE_THRESHOLD)
    .await?;

  for hit in hits {
    // Only entities of the requested type are eligible; a stale embedding
    // for a now-merged or wrong-typed entity is silently skipped.
    let Some(candidate_entity) = entity::Entity::find_by_id(hit.target_id)
      .filter(entity::Column::EntityTypeId.eq(entity_type_id))
      .filter(entity::Column::MergedInto.is_null())
      .one(db)
      .await
      .map_err(AppError::new)?
    else {
      continue;
    };

    let slot = candidates.entry(candidate_entity.id).or_insert_with(|| Candidate {
      entity_id: candidate_entity.id,
      alias_score: 0.0,
      has_exact_alias_hit: false,
      embedding_score: 0.0,
      context_score: 0.0,
    });
    slot.embedding_score = hit.score;
  }

  Ok(())
}

async fn context_score<C: ConnectionTrait>(
  db: &C,
  candidate_entity_id: Uuid,
  channel_id: &str,
  co_mentioned_names: &[String],
) -> Result<f64, AppError> {
  let candidate_mentions = episode_entity_mention::Entity::find()
    .filter(episode_entity_mention::Column::EntityId.eq(candidate_entity_id))
    .all(db)
    .await
    .map_err(AppError::new)?;

  let channel_recency = candidate_mentions.iter().any(|m| m.channel_id == channel_id);

  let overlap = if co_mentioned_names.is_empty() || candidate_mentions.is_empty() {
    0.0
  } else {
    let episode_ids: Vec<String> = candidate_mentions.iter().map(|m| m.episode_id.clone()).collect();
    let co_mentions = episode_entity_mention::Entity::find()
      .filter(episode_entity_mention::Column::EpisodeId.is_in(episode_ids))
      .find_also_related(entity::Entity)
      .all(db)
      .await
      .map_err(AppError::new)?;

    let co_names: std::collections::HashSet<String> = co_mentions
      .into_iter()
      .filter_map(|(_, e)| e.map(|e| e.canonical_name.to_lowercase()))
      .collect();

    let matched = co_mentioned_names
      .iter()
      .filter(|n| co_names.contains(&n.to_lowercase()))
      .count();
    matched as f64 / co_mentioned_names.len() as f64
  };

  Ok(0.3 * overlap + 0.2 * f64::from(u8::from(channel_recency)))
}

async fn create_entity<C: ConnectionTrait>(db: &C, name: &str, entity_type_id: &str) -> Result<Uuid, AppError> {
  if !types::is_known_entity_type(entity_type_id) {
    return Err(AppError::validation(anyhow::anyhow!(
      "unknown entity type: {entity_type_id}"
    )));
  }

  let now = chrono::Utc::now().into();
  let entity_id = Uuid::now_v7();
  let entity_active = entity::ActiveModel {
    id: Set(entity_id),
    canonical_name: Set(name.to_owned()),
    entity_type_id: Set(entity_type_id.to_owned()),
    summary: Set(None),
    origin: Set("extraction".to_owned()),
    confidence: Set(1.0),
    merged_into: Set(None),
    created_at: Set(now),
    updated_at: Set(now),
  };
  entity_active.insert(db).await.map_err(AppError::new)?;

  let alias_active = alias::ActiveModel {
    id: Set(Uuid::now_v7()),
    entity_id: Set(entity_id),
    alias: Set(name.to_owned()),
    alias_type: Set(AliasType::Name.as_str().to_owned()),
    normalized: Set(alias_normalizer::normalize(name, AliasType::Name)),
    is_shared: Set(false),
    created_at: Set(now),
  };
  alias_active.insert(db).await.map_err(AppError::new)?;

  Ok(entity_id)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn candidate(alias_score: f64, exact: bool, embedding_score: f64, context_score: f64) -> Candidate {
    Candidate {
      entity_id: Uuid::now_v7(),
      alias_score,
      has_exact_alias_hit: exact,
      embedding_score,
      context_score,
    }
  }

  #[test]
  fn no_candidates_creates_new() {
    assert_eq!(decide(&[]), Cascade::CreateNew);
  }

  #[test]
  fn high_total_picks_regardless_of_exactness() {
    let c = candidate(0.0, false, 1.0, 1.0);
    assert!(c.total() >= HIGH_CONFIDENCE_THRESHOLD);
    assert_eq!(decide(&[c.clone()]), Cascade::Pick(c.entity_id));
  }

  #[test]
  fn sole_exact_hit_is_picked() {
    let c = candidate(1.00, true, 0.0, 0.0);
    assert_eq!(decide(&[c.clone()]), Cascade::Pick(c.entity_id));
  }

  #[test]
  fn two_entities_tied_on_the_same_exact_alias_are_ambiguous() {
    // Two people who both hold a name alias "Tyler": same alias_score,
    // same exactness, no embedding or context signal to break the tie.
    let a = candidate(1.00, true, 0.0, 0.0);
    let b = candidate(1.00, true, 0.0, 0.0);
    match decide(&[a.clone(), b.clone()]) {
      Cascade::Ambiguous { top, .. } => assert!(top == a.entity_id || top == b.entity_id),
      other => panic!("expected Ambiguous, got {other:?}"),
    }
  }

  #[test]
  fn tied_hard_identifier_matches_are_ambiguous() {
    // Mom and Dad, both 0.95 * 0.7 shared-phone hits, no exact flag.
    let mom = candidate(0.665, false, 0.0, 0.2);
    let dad = candidate(0.665, false, 0.0, 0.2);
    match decide(&[mom.clone(), dad.clone()]) {
      Cascade::Ambiguous { top, confidence } => {
        assert!(top == mom.entity_id || top == dad.entity_id);
        assert!((confidence - mom.total()).abs() < 1e-9);
      }
      other => panic!("expected Ambiguous, got {other:?}"),
    }
  }

  #[test]
  fn clear_winner_by_gap_is_picked() {
    let winner = candidate(0.85, false, 0.0, 0.0);
    let loser = candidate(0.40, false, 0.0, 0.0);
    assert_eq!(decide(&[winner.clone(), loser]), Cascade::Pick(winner.entity_id));
  }

  #[test]
  fn sole_weak_candidate_above_floor_is_picked() {
    let c = candidate(0.70, false, 0.0, 0.0);
    assert_eq!(decide(&[c.clone()]), Cascade::Pick(c.entity_id));
  }

  #[test]
  fn single_candidate_above_floor_among_several_below_is_picked() {
    // Three candidates, gap between the top two is too small to win on its
    // own (0.06 < 0.15), but only the top clears the floor at all.
    let top = candidate(0.72, false, 0.0, 0.0);
    let second = candidate(0.60, false, 0.0, 0.0);
    let third = candidate(0.10, false, 0.0, 0.0);
    assert_eq!(decide(&[top.clone(), second, third]), Cascade::Pick(top.entity_id));
  }
}

async fn insert_ambiguous_merge_candidate<C: ConnectionTrait>(
  db: &C,
  new_entity_id: Uuid,
  candidate_entity_id: Uuid,
  confidence: f64,
) -> Result<(), AppError> {
  let (a, b) = if new_entity_id < candidate_entity_id {
    (new_entity_id, candidate_entity_id)
  } else {
    (candidate_entity_id, new_entity_id)
  };

  let now = chrono::Utc::now().into();
  let active = merge_candidate::ActiveModel {
    id: Set(Uuid::now_v7()),
    entity_a_id: Set(a),
    entity_b_id: Set(b),
    confidence: Set(confidence as f32),
    auto_eligible: Set(false),
    reason: Set("ambiguous_resolution".to_owned()),
    matching_facts: Set(serde_json::json!([])),
    context: Set(serde_json::json!({"source": "entity_resolver"})),
    status: Set("pending".to_owned()),
    created_at: Set(now),
    updated_at: Set(now),
  };

  // A later collision-detector pass may independently propose the same
  // pair at a different confidence; leave any existing row alone here.
  use sea_orm::sea_query::OnConflict;
  merge_candidate::Entity::insert(active)
    .on_conflict(
      OnConflict::columns([merge_candidate::Column::EntityAId, merge_candidate::Column::EntityBId])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(db)
    .await
    .map_err(AppError::new)?;

  Ok(())
}
