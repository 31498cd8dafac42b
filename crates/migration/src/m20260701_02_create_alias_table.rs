use sea_orm_migration::{
  prelude::*,
  schema::{boolean, string, timestamp_with_time_zone, uuid},
};

use crate::m20260701_01_create_entity_table::Entity as EntityTable;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Alias::Table)
          .if_not_exists()
          .col(uuid(Alias::Id).primary_key())
          .col(uuid(Alias::EntityId).not_null())
          .col(string(Alias::Alias).not_null())
          .col(string(Alias::AliasType).not_null())
          .col(string(Alias::Normalized).not_null())
          .col(boolean(Alias::IsShared).not_null().default(false))
          .col(timestamp_with_time_zone(Alias::CreatedAt).not_null().default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_alias_entity")
              .from(Alias::Table, Alias::EntityId)
              .to(EntityTable::Table, EntityTable::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .if_not_exists()
          .name("idx_alias_entity_normalized_type")
          .table(Alias::Table)
          .col(Alias::EntityId)
          .col(Alias::Normalized)
          .col(Alias::AliasType)
          .unique()
          .to_owned(),
      )
      .await?;

    // Every alias lookup in the resolver keys off (normalized, alias_type).
    manager
      .create_index(
        Index::create()
          .if_not_exists()
          .name("idx_alias_normalized_type")
          .table(Alias::Table)
          .col(Alias::Normalized)
          .col(Alias::AliasType)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Alias::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum Alias {
  Table,
  Id,
  EntityId,
  Alias,
  AliasType,
  Normalized,
  IsShared,
  CreatedAt,
}
