use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-on-first-sight provenance: which episodes mentioned which
/// resolved entity. Also the idempotency check — re-running the same
/// episode id is detected by a prior row here, not by re-running the LLM.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "episode_entity_mention")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub episode_id: String,
  pub channel_id: String,
  pub entity_id: Uuid,
  pub mention_count: i32,
  pub created_at: DateTimeWithTimeZone,
  pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::entity::Entity",
    from = "Column::EntityId",
    to = "super::entity::Column::Id"
  )]
  Entity,
}

impl Related<super::entity::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Entity.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
