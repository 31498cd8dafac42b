use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only provenance log: one row per edge resolution or identity
/// promotion event within an episode. `relationship_id` is `NULL` for
/// identity promotions, since those never produce an edge. Unlike the
/// `relationship` row it points at, `extracted_fact` keeps the verbatim
/// phrasing of *this* observation — the same fact re-asserted in a later
/// episode reuses the edge but logs its own mention row here.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "episode_relationship_mention")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub episode_id: String,
  pub relationship_id: Option<Uuid>,
  pub extracted_fact: String,
  pub asserted_by_entity_id: Option<Uuid>,
  pub source_type: String,
  pub target_literal: Option<String>,
  pub alias_id: Option<Uuid>,
  pub confidence: f32,
  pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::relationship::Entity",
    from = "Column::RelationshipId",
    to = "super::relationship::Column::Id"
  )]
  Relationship,
  #[sea_orm(
    belongs_to = "super::entity::Entity",
    from = "Column::AssertedByEntityId",
    to = "super::entity::Column::Id"
  )]
  AssertedBy,
  #[sea_orm(
    belongs_to = "super::alias::Entity",
    from = "Column::AliasId",
    to = "super::alias::Column::Id"
  )]
  Alias,
}

impl Related<super::relationship::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Relationship.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
