use sea_orm_migration::{
  prelude::*,
  schema::{float, string, text_null, timestamp_with_time_zone, uuid, uuid_null},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Entity::Table)
          .if_not_exists()
          .col(uuid(Entity::Id).primary_key())
          .col(string(Entity::CanonicalName).not_null())
          .col(string(Entity::EntityTypeId).not_null())
          .col(text_null(Entity::Summary))
          .col(string(Entity::Origin).not_null())
          .col(float(Entity::Confidence).not_null())
          .col(uuid_null(Entity::MergedInto))
          .col(timestamp_with_time_zone(Entity::CreatedAt).not_null().default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone(Entity::UpdatedAt).not_null().default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_entity_merged_into")
              .from(Entity::Table, Entity::MergedInto)
              .to(Entity::Table, Entity::Id),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .if_not_exists()
          .name("idx_entity_not_merged")
          .table(Entity::Table)
          .col(Entity::EntityTypeId)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Entity::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum Entity {
  Table,
  Id,
  CanonicalName,
  EntityTypeId,
  Summary,
  Origin,
  Confidence,
  MergedInto,
  CreatedAt,
  UpdatedAt,
}
