use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An edge in the knowledge graph. Target is XOR: exactly one of
/// `target_entity_id` / `target_literal` is set, never both, never neither.
/// `valid_at`/`invalid_at` are ISO-8601 partial dates (`YYYY`, `YYYY-MM`, or
/// `YYYY-MM-DD`) stored as text so precision is never fabricated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "relationship")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub source_entity_id: Uuid,
  pub target_entity_id: Option<Uuid>,
  pub target_literal: Option<String>,
  pub relation_type: String,
  pub fact: String,
  pub valid_at: Option<String>,
  pub invalid_at: Option<String>,
  pub confidence: f32,
  pub created_at: DateTimeWithTimeZone,
  pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::episode_relationship_mention::Entity")]
  EpisodeRelationshipMention,
}

impl Related<super::episode_relationship_mention::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::EpisodeRelationshipMention.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
