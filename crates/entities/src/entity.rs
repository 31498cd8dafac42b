use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A node in the knowledge graph. `merged_into` points at the surviving
/// entity once this row has been folded into another — a tombstone, never
/// deleted, so historical mentions keep resolving.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub canonical_name: String,
  pub entity_type_id: String,
  pub summary: Option<String>,
  pub origin: String,
  pub confidence: f32,
  pub merged_into: Option<Uuid>,
  pub created_at: DateTimeWithTimeZone,
  pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::alias::Entity")]
  Alias,
  #[sea_orm(has_many = "super::episode_entity_mention::Entity")]
  EpisodeEntityMention,
}

impl Related<super::alias::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Alias.def()
  }
}

impl Related<super::episode_entity_mention::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::EpisodeEntityMention.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
