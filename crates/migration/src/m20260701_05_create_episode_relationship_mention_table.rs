use sea_orm_migration::{
  prelude::*,
  schema::{float, string, string_null, timestamp_with_time_zone, uuid, uuid_null},
};

use crate::m20260701_01_create_entity_table::Entity as EntityTable;
use crate::m20260701_02_create_alias_table::Alias as AliasTable;
use crate::m20260701_03_create_relationship_table::Relationship as RelationshipTable;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(EpisodeRelationshipMention::Table)
          .if_not_exists()
          .col(uuid(EpisodeRelationshipMention::Id).primary_key())
          .col(string(EpisodeRelationshipMention::EpisodeId).not_null())
          .col(uuid_null(EpisodeRelationshipMention::RelationshipId))
          .col(string(EpisodeRelationshipMention::ExtractedFact).not_null())
          .col(uuid_null(EpisodeRelationshipMention::AssertedByEntityId))
          .col(string(EpisodeRelationshipMention::SourceType).not_null())
          .col(string_null(EpisodeRelationshipMention::TargetLiteral))
          .col(uuid_null(EpisodeRelationshipMention::AliasId))
          .col(float(EpisodeRelationshipMention::Confidence).not_null())
          .col(
            timestamp_with_time_zone(EpisodeRelationshipMention::CreatedAt)
              .not_null()
              .default(Expr::current_timestamp()),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_episode_relationship_mention_relationship")
              .from(
                EpisodeRelationshipMention::Table,
                EpisodeRelationshipMention::RelationshipId,
              )
              .to(RelationshipTable::Table, RelationshipTable::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_episode_relationship_mention_asserted_by")
              .from(
                EpisodeRelationshipMention::Table,
                EpisodeRelationshipMention::AssertedByEntityId,
              )
              .to(EntityTable::Table, EntityTable::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_episode_relationship_mention_alias")
              .from(EpisodeRelationshipMention::Table, EpisodeRelationshipMention::AliasId)
              .to(AliasTable::Table, AliasTable::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .if_not_exists()
          .name("idx_episode_relationship_mention_episode")
          .table(EpisodeRelationshipMention::Table)
          .col(EpisodeRelationshipMention::EpisodeId)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(EpisodeRelationshipMention::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum EpisodeRelationshipMention {
  Table,
  Id,
  EpisodeId,
  RelationshipId,
  ExtractedFact,
  AssertedByEntityId,
  SourceType,
  TargetLiteral,
  AliasId,
  Confidence,
  CreatedAt,
}
