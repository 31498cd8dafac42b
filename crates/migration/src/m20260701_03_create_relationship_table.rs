use sea_orm_migration::{
  prelude::*,
  sea_orm::Statement,
  schema::{float, string, string_null, timestamp_with_time_zone, uuid, uuid_null},
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
          .table(Relationship::Table)
          .if_not_exists()
          .col(uuid(Relationship::Id).primary_key())
          .col(uuid(Relationship::SourceEntityId).not_null())
          .col(uuid_null(Relationship::TargetEntityId))
          .col(string_null(Relationship::TargetLiteral))
          .col(string(Relationship::RelationType).not_null())
          .col(string(Relationship::Fact).not_null())
          .col(string_null(Relationship::ValidAt))
          .col(string_null(Relationship::InvalidAt))
          .col(float(Relationship::Confidence).not_null())
          .col(timestamp_with_time_zone(Relationship::CreatedAt).not_null().default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone(Relationship::UpdatedAt).not_null().default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_relationship_source")
              .from(Relationship::Table, Relationship::SourceEntityId)
              .to(EntityTable::Table, EntityTable::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_relationship_target")
              .from(Relationship::Table, Relationship::TargetEntityId)
              .to(EntityTable::Table, EntityTable::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    let conn = manager.get_connection();
    let backend = manager.get_database_backend();

    // Exactly one of target_entity_id / target_literal is set — never both, never neither.
    conn
      .execute_raw(Statement::from_string(
        backend,
        "ALTER TABLE relationship ADD CONSTRAINT chk_relationship_target_xor \
         CHECK ((target_entity_id IS NOT NULL) <> (target_literal IS NOT NULL));",
      ))
      .await?;

    // Dedup key with NULL == NULL semantics: COALESCE collapses the "no target
    // entity" / "no literal target" / "no valid_at" cases onto one shared
    // sentinel so two otherwise-identical edges never land twice.
    conn
      .execute_raw(Statement::from_string(
        backend,
        "CREATE UNIQUE INDEX idx_relationship_dedup ON relationship ( \
           source_entity_id, \
           COALESCE(target_entity_id, '00000000-0000-0000-0000-000000000000'::uuid), \
           COALESCE(target_literal, ''), \
           relation_type, \
           COALESCE(valid_at, '') \
         );",
      ))
      .await?;

    manager
      .create_index(
        Index::create()
          .if_not_exists()
          .name("idx_relationship_live_by_source_type")
          .table(Relationship::Table)
          .col(Relationship::SourceEntityId)
          .col(Relationship::RelationType)
          .col(Relationship::InvalidAt)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Relationship::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum Relationship {
  Table,
  Id,
  SourceEntityId,
  TargetEntityId,
  TargetLiteral,
  RelationType,
  Fact,
  ValidAt,
  InvalidAt,
  Confidence,
  CreatedAt,
  UpdatedAt,
}
