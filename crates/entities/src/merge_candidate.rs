use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A proposed merge between two entities, surfaced by identity sharing or
/// the collision detector. Pair-keyed by `(min(a,b), max(a,b))` so the same
/// proposal from either direction lands on the same row (see
/// `entity_a_id`/`entity_b_id` invariants: `entity_a_id < entity_b_id`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "merge_candidate")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub entity_a_id: Uuid,
  pub entity_b_id: Uuid,
  pub confidence: f32,
  pub auto_eligible: bool,
  pub reason: String,
  pub matching_facts: Json,
  pub context: Json,
  pub status: String,
  pub created_at: DateTimeWithTimeZone,
  pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
