use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An identity fact attached to an entity: an email, phone, handle,
/// username, nickname, or bare name. Never an edge — see the identity
/// promoter. `is_shared` flips true once two or more distinct entities
/// carry the same `normalized` value (a shared household phone, a shared
/// team inbox).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alias")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub entity_id: Uuid,
  pub alias: String,
  pub alias_type: String,
  pub normalized: String,
  pub is_shared: bool,
  pub created_at: DateTimeWithTimeZone,
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
